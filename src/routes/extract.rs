//! Extractors whose rejections answer with the JSON [`ErrorBody`](crate::error::ErrorBody).

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use axum_valid::{Valid, ValidRejection};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body checked by its `validator` rules.
pub struct ValidJson<T>(pub T);

/// Query string checked by its `validator` rules.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Json(value)) = Valid::<Json<T>>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Valid(Query(value)) = Valid::<Query<T>>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl<E: std::fmt::Display> From<ValidRejection<E>> for AppError {
    fn from(rejection: ValidRejection<E>) -> Self {
        match rejection {
            ValidRejection::Valid(errors) => {
                AppError::BadRequest(format!("validation failed: {errors}"))
            }
            ValidRejection::Inner(inner) => AppError::BadRequest(inner.to_string()),
        }
    }
}
