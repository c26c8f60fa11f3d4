use std::collections::BTreeMap;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Per-field validation messages, keyed by request field name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a `Validation` error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation {
                message: "invalid input".into(),
                fields: self,
            })
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields: FieldErrors::default(),
        }
    }

    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::default();
        fields.add(field, message);
        AppError::Validation {
            message: "invalid input".into(),
            fields,
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AppError::Authentication(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation { message, fields } if fields.is_empty() => {
                json!({ "error": message })
            }
            AppError::Validation { message, fields } => {
                json!({ "error": message, "fields": fields })
            }
            AppError::Authentication(msg) | AppError::NotFound(msg) => json!({ "error": msg }),
            AppError::Internal(e) => {
                // Don't leak details
                error!(error = ?e, "internal error");
                json!({ "error": "internal server error" })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Column carrying a unique constraint that a write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Token,
    ProjectId,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for {0:?}")]
    Duplicate(UniqueField),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                let field = match db_err.constraint() {
                    Some("users_email_key") => Some(UniqueField::Email),
                    Some("credentials_token_key") => Some(UniqueField::Token),
                    Some("projects_pkey") => Some(UniqueField::ProjectId),
                    _ => None,
                };
                if let Some(field) = field {
                    return StoreError::Duplicate(field);
                }
            }
        }
        StoreError::Other(e.into())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Internal(e.into())
    }
}

/// `Json<T>` whose rejections are reported as 400 validation errors.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(AppError::invalid(rejection.body_text())),
        }
    }
}
