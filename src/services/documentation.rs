use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the FPV leaderboard backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::registration::register,
        crate::routes::registration::get_user,
        crate::routes::results::submit_result,
        crate::routes::leaderboard::get_leaderboard,
        crate::routes::catalog::get_catalog,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::registration::RegisterRequest,
            crate::dto::registration::RegistrationResponse,
            crate::dto::registration::UserSummary,
            crate::dto::submission::SubmitRequest,
            crate::dto::submission::SubmissionResponse,
            crate::dto::submission::SubmissionOutcome,
            crate::dto::submission::ResultSummary,
            crate::dto::leaderboard::LeaderboardResponse,
            crate::dto::leaderboard::LeaderboardEntry,
            crate::dto::catalog::CatalogResponse,
            crate::dto::catalog::CatalogOption,
            crate::dao::models::Simulator,
            crate::dao::models::Track,
            crate::dao::models::FlightMode,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "members", description = "Club member registration"),
        (name = "results", description = "Personal best submission"),
        (name = "leaderboard", description = "Ranked boards and option catalog"),
    )
)]
pub struct ApiDoc;
