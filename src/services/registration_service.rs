use tracing::info;

use crate::{
    dao::models::{Identity, UserEntity},
    dto::{
        registration::{RegisterRequest, RegistrationResponse, UserSummary},
        validation::{message_of, parse_birth_date},
    },
    error::ServiceError,
    state::SharedState,
};

/// Create or overwrite a club member and confirm the stored details.
pub async fn register(
    state: &SharedState,
    request: RegisterRequest,
) -> Result<RegistrationResponse, ServiceError> {
    let birth_date = parse_birth_date(&request.birth_date)
        .map_err(|err| ServiceError::InvalidInput(message_of(&err)))?;

    let user = UserEntity {
        identity: request.identity,
        last_name: request.last_name.trim().to_owned(),
        first_name: request.first_name.trim().to_owned(),
        group: request.group.trim().to_owned(),
        birth_date,
    };

    let store = state.require_result_store().await?;
    let user = store.upsert_user(user).await?;
    info!(identity = user.identity, group = %user.group, "member registered");

    let summary = UserSummary::from(&user);
    let reply = format!(
        "You are registered!\nLast name: {}\nFirst name: {}\nGroup: {}\nBirth date: {}",
        summary.last_name, summary.first_name, summary.group, summary.birth_date
    );
    Ok(RegistrationResponse {
        user: summary,
        reply,
    })
}

/// Look up a registered member.
pub async fn get_user(state: &SharedState, identity: Identity) -> Result<UserSummary, ServiceError> {
    let store = state.require_result_store().await?;
    store
        .find_user(identity)
        .await?
        .map(|user| UserSummary::from(&user))
        .ok_or_else(|| ServiceError::NotFound(format!("member {identity} is not registered")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{evidence::FsEvidenceStore, result_store::memory::MemoryResultStore},
        state::AppState,
    };

    async fn state_with_memory() -> (SharedState, MemoryResultStore) {
        let state = AppState::new(AppConfig::default(), Arc::new(FsEvidenceStore::new("evidence")));
        let store = MemoryResultStore::new();
        state.set_result_store(Arc::new(store.clone())).await;
        (state, store)
    }

    fn request(birth_date: &str) -> RegisterRequest {
        RegisterRequest {
            identity: 42,
            last_name: " Ivanov ".into(),
            first_name: "Ivan".into(),
            group: "7B".into(),
            birth_date: birth_date.into(),
        }
    }

    #[tokio::test]
    async fn register_trims_and_confirms() {
        let (state, _store) = state_with_memory().await;
        let response = register(&state, request("12.04.2008")).await.unwrap();
        assert_eq!(response.user.last_name, "Ivanov");
        assert!(response.reply.contains("Birth date: 12.04.2008"));

        let found = get_user(&state, 42).await.unwrap();
        assert_eq!(found.group, "7B");
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let (state, _store) = state_with_memory().await;
        let first = register(&state, request("12.04.2008")).await.unwrap();
        let second = register(&state, request("12.04.2008")).await.unwrap();
        assert_eq!(first.reply, second.reply);
        assert_eq!(get_user(&state, 42).await.unwrap().last_name, "Ivanov");
    }

    #[tokio::test]
    async fn malformed_birth_date_is_invalid_input() {
        let (state, _store) = state_with_memory().await;
        let err = register(&state, request("2008-04-12")).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(message) if message.contains("DD.MM.YYYY")));
        assert!(matches!(get_user(&state, 42).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn degraded_state_refuses_registration() {
        let state = AppState::new(AppConfig::default(), Arc::new(FsEvidenceStore::new("evidence")));
        assert!(matches!(
            register(&state, request("12.04.2008")).await,
            Err(ServiceError::Degraded)
        ));
    }
}
