use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use greenhouse_gateway::ControlError;
use serde_json::json;

/// 查询接口错误响应
///
/// 错误体统一为 {"detail": <message>}
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(json!({
            "detail": message,
        }));

        (status, body).into_response()
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::UnknownActuator(_) => ApiError::NotFound(err.to_string()),
            ControlError::InvalidValue(_) => ApiError::BadRequest(err.to_string()),
            ControlError::Route { .. } => ApiError::BadGateway(err.to_string()),
        }
    }
}
