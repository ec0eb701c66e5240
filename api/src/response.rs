use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub code: u16,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(payload: T) -> HttpResponse {
        Self::with_status(StatusCode::OK, "success", payload)
    }

    pub fn created(payload: T) -> HttpResponse {
        Self::with_status(StatusCode::CREATED, "created", payload)
    }

    fn with_status(status: StatusCode, message: &'static str, payload: T) -> HttpResponse {
        HttpResponse::build(status).json(Self {
            success: true,
            code: status.as_u16(),
            message,
            payload: Some(payload),
        })
    }
}
