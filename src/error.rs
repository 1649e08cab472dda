use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value as JsonValue};

use crate::procedures::ProcedureKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Connection error: {0}")]
    Connection(String),

    /// Reserved: no procedure looks a single record up by id.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown procedure: {0}")]
    UnknownProcedure(String),

    #[error("Procedure {procedure} is a {kind} and cannot be called with {method}")]
    MethodNotSupported {
        procedure: String,
        kind: ProcedureKind,
        method: String,
    },

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ConstraintViolation(_) => StatusCode::CONFLICT,
            Error::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::NotFound(_) | Error::UnknownProcedure(_) => StatusCode::NOT_FOUND,
            Error::MethodNotSupported { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Error::Config(_) | Error::Database(_) | Error::Migrate(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable code carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "BAD_REQUEST",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            Error::Connection(_) => "CONNECTION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::UnknownProcedure(_) => "PROCEDURE_NOT_FOUND",
            Error::MethodNotSupported { .. } => "METHOD_NOT_SUPPORTED",
            Error::Config(_) | Error::Database(_) | Error::Migrate(_) | Error::Internal(_) => {
                "INTERNAL_SERVER_ERROR"
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            Error::BadRequest(msg) => msg.clone(),
            Error::Validation(_) => "Input validation failed".to_string(),
            Error::ConstraintViolation(msg) => msg.clone(),
            Error::Connection(_) => "The data store is currently unreachable".to_string(),
            Error::NotFound(msg) => msg.clone(),
            Error::UnknownProcedure(name) => format!("No procedure named '{}'", name),
            Error::MethodNotSupported { .. } => self.to_string(),
            _ => "An unexpected error occurred".to_string(),
        }
    }

    fn field_messages(&self) -> Option<BTreeMap<String, Vec<String>>> {
        let Error::Validation(errors) = self else {
            return None;
        };
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Some(fields)
    }

    /// The `error` object of the wire envelope.
    pub fn to_json(&self) -> JsonValue {
        let mut body = json!({
            "code": self.code(),
            "message": self.public_message(),
        });
        if let Some(fields) = self.field_messages() {
            body["fields"] = json!(fields);
        }
        body
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match &self {
            Error::Connection(detail) => tracing::warn!(error = %detail, "store unreachable"),
            _ if status.is_server_error() => tracing::error!(error = ?self, "request failed"),
            _ => {}
        }

        let body = Json(json!({ "error": self.to_json() }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                let constraint = db.constraint().unwrap_or("unique constraint").to_string();
                Error::ConstraintViolation(format!("Duplicate value violates {}", constraint))
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Error::Connection(err.to_string()),
            sqlx::Error::Database(ref db)
                if db.code().as_deref().is_some_and(is_connection_sqlstate) =>
            {
                Error::Connection(err.to_string())
            }
            other => Error::Database(other),
        }
    }
}

/// Class 08 (connection exception) plus the 57P0x server shutdown codes.
fn is_connection_sqlstate(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}
