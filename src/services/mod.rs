/// Option sets offered to the transport.
pub mod catalog_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Plain-text leaderboard formatting.
pub mod leaderboard_render;
/// Ranked board retrieval.
pub mod leaderboard_service;
/// Member registration and lookup.
pub mod registration_service;
/// Personal best submission and evidence release.
pub mod result_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
