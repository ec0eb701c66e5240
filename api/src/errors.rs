use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub(crate) enum AppError {
    Validation(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    Database(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Database(msg) => write!(f, "database error: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            Self::Validation(msg)
            | Self::Unauthorized(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg) => msg.as_str(),
            Self::Database(msg) => {
                log::error!("Database error: {msg}");
                "database error"
            }
        };
        HttpResponse::build(status).json(ErrorBody {
            success: false,
            code: status.as_u16(),
            message,
        })
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        let msg = if let Some(db_err) = err.as_db_error() {
            format!(
                "{}: {} (code: {})",
                db_err.severity(),
                db_err.message(),
                db_err.code().code()
            )
        } else {
            err.to_string()
        };
        Self::Database(msg)
    }
}

impl From<deadpool_postgres::PoolError> for AppError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(format!("Validation failed: {err}"))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    code: u16,
    message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn database_errors_hide_details() {
        let resp = AppError::Database("relation \"malls\" does not exist".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "database error");
        assert_eq!(json["success"], false);
    }

    #[actix_web::test]
    async fn validation_errors_keep_message() {
        let resp = AppError::Validation("limit must be between 1 and 100".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 400);
        assert_eq!(json["message"], "limit must be between 1 and 100");
    }
}
