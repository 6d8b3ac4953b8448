use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ForbiddenOperation(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error(transparent)]
    ValidationError(#[from] garde::Report),
    #[error("Not authenticated")]
    UnauthenticatedError,
    #[error("transaction could not be executed")]
    TransactionError(#[source] sqlx::Error),
    #[error("database operation failed")]
    SpecificOperationError(#[source] sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error(transparent)]
    KeyValueStoreError(#[from] redis::RedisError),
    #[error(transparent)]
    ConvertToUuidError(#[from] uuid::Error),
    #[error("{0}")]
    ConversionEntityError(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, detail) = match self {
            AppError::EntityNotFound(m) => (StatusCode::NOT_FOUND, m),
            AppError::Conflict(m) => (StatusCode::BAD_REQUEST, m),
            AppError::ForbiddenOperation(m) => (StatusCode::FORBIDDEN, m),
            AppError::UnprocessableEntity(m) => (StatusCode::UNPROCESSABLE_ENTITY, m),
            e @ AppError::ValidationError(_) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            e @ AppError::UnauthenticatedError => (StatusCode::UNAUTHORIZED, e.to_string()),
            e @ (AppError::TransactionError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::KeyValueStoreError(_)
            | AppError::ConvertToUuidError(_)
            | AppError::ConversionEntityError(_)) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Unexpected error happened"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status_code, Json(ErrorBody { detail })).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn detail_of(res: Response) -> String {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["detail"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn conflict_is_reported_as_bad_request_with_message() {
        let res = AppError::Conflict("Event is already full".into()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail_of(res).await, "Event is already full");
    }

    #[tokio::test]
    async fn not_found_and_forbidden_keep_their_messages() {
        let res = AppError::EntityNotFound("Event not found".into()).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(detail_of(res).await, "Event not found");

        let res = AppError::ForbiddenOperation("nope".into()).into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let res = AppError::NoRowsAffectedError("secret table".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail_of(res).await, "Internal server error");
    }
}
