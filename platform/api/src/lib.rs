//! Error payloads shared by the GraphQL surface.

use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions, Value};
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("bad request: {message}")]
    InvalidInput {
        message: String,
        /// `(field, message)` pairs surfaced under `extensions.fields`.
        fields: Vec<(String, String)>,
    },
    /// The message is user-facing; the cause stays in the logs.
    #[error("{message}")]
    Failed {
        message: String,
        cause: Arc<anyhow::Error>,
    },
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidInput { .. } => "INVALID_INPUT",
            ApiError::Failed { .. } => "FAILED",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn invalid_fields<I, F, M>(fields: I) -> Self
    where
        I: IntoIterator<Item = (F, M)>,
        F: Into<String>,
        M: Into<String>,
    {
        Self::InvalidInput {
            message: "validation failed".into(),
            fields: fields
                .into_iter()
                .map(|(field, message)| (field.into(), message.into()))
                .collect(),
        }
    }

    pub fn failed(message: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::Failed {
            message: message.into(),
            cause: Arc::new(cause),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        match self {
            ApiError::Internal(cause) | ApiError::Failed { cause, .. } => {
                tracing::error!(code = self.code(), error = %cause, "request failed");
            }
            _ => {}
        }
        let mut err = Error::new(self.to_string()).extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::InvalidInput { fields, .. } = self {
            if !fields.is_empty() {
                let map = fields
                    .iter()
                    .map(|(field, message)| {
                        (async_graphql::Name::new(field), Value::from(message.as_str()))
                    })
                    .collect();
                err = err.extend_with(|_err, e| {
                    e.set("fields", Value::Object(map));
                });
            }
        }
        err
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extension(err: &Error, key: &str) -> Option<Value> {
        err.extensions.as_ref().and_then(|map| map.get(key)).cloned()
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = internal_error(anyhow::anyhow!("boom"));
        assert_eq!(err.message, "internal server error");
        assert_eq!(extension(&err, "code"), Some(Value::from("INTERNAL")));
    }

    #[test]
    fn validation_fields_are_exposed() {
        let err = ApiError::invalid_fields([("email", "Invalid email format")]).extend();
        assert_eq!(err.message, "bad request: validation failed");
        assert_eq!(extension(&err, "code"), Some(Value::from("INVALID_INPUT")));
        let Some(Value::Object(fields)) = extension(&err, "fields") else {
            panic!("missing fields extension");
        };
        assert_eq!(
            fields.get("email"),
            Some(&Value::from("Invalid email format"))
        );
    }

    #[test]
    fn failures_keep_their_message() {
        let err = ApiError::failed("Failed to update deal stage", anyhow::anyhow!("disk full"))
            .extend();
        assert_eq!(err.message, "Failed to update deal stage");
        assert_eq!(extension(&err, "code"), Some(Value::from("FAILED")));
    }
}
