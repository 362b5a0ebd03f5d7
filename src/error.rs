//! Error handler for jwtauth.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::token::VerificationError;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a session operation or a request can fail.
#[derive(Debug, Error)]
pub enum Error {
    #[error("error when creating JWT")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("missing `token` cookie")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] VerificationError),

    #[error("token expired")]
    ExpiredToken,

    #[error("time-to-live must be a positive number of seconds, got {0}")]
    InvalidTtl(i64),

    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),
}

impl Error {
    /// Whether the caller simply is not authenticated.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Error::MissingToken | Error::InvalidToken(_) | Error::ExpiredToken
        )
    }

    /// Short label used on metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Signing(_) => "signing_error",
            Error::MissingToken => "missing_token",
            Error::InvalidToken(_) => "invalid_token",
            Error::ExpiredToken => "expired_token",
            Error::InvalidTtl(_) => "invalid_ttl",
            Error::Validation(_) => "validation",
            Error::Axum(_) => "parsing_form",
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(
        self,
    ) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/problem+json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            Error::Validation(validation_errors) => {
                response.errors(validation_errors)
            },

            Error::Axum(err) => response
                .title("Server error during data parsing.")
                .details(&err.body_text()),

            Error::Signing(err) => {
                tracing::error!(error = %err, "server returned 500 status");

                ResponseError::default()
            },

            // Never tell which check failed.
            err if err.is_unauthorized() => response
                .title("Not authenticated.")
                .details("Missing, invalid or expired session.")
                .status(StatusCode::UNAUTHORIZED),

            _ => response,
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/problem+json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_status() {
        for err in [
            Error::MissingToken,
            Error::ExpiredToken,
            Error::InvalidToken(VerificationError::InvalidSignature),
        ] {
            assert!(err.is_unauthorized());
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_invalid_ttl_status() {
        let err = Error::InvalidTtl(0);
        assert!(!err.is_unauthorized());
        assert_eq!(err.kind(), "invalid_ttl");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_signing_status() {
        let err = Error::Signing(jsonwebtoken::errors::ErrorKind::InvalidKeyFormat.into());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
