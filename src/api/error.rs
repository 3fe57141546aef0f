use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::error::{ApiError, AppError, MediaError};
use crate::models::ErrorBody;

/// 路由层统一错误，响应体固定为 `{ "error": ... }`
#[derive(Debug)]
pub enum RouteError {
    BadRequest(String),
    BadGateway(String),
    Internal(String),
    /// 沿用上游或请求体解析给出的状态码
    WithStatus(StatusCode, String),
}

impl RouteError {
    fn status(&self) -> StatusCode {
        match self {
            RouteError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RouteError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            RouteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            RouteError::WithStatus(status, _) => *status,
        }
    }

    /// 上游返回 4xx 时原样透传状态码，其余按常规映射
    pub fn from_upstream(e: AppError) -> Self {
        match e {
            AppError::Api(ApiError::BadResponse { status, message, .. }) => {
                match StatusCode::from_u16(status) {
                    Ok(code) if code.is_client_error() => RouteError::WithStatus(code, message),
                    _ => RouteError::BadGateway(message),
                }
            }
            other => other.into(),
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            RouteError::BadRequest(msg) => msg,
            RouteError::WithStatus(_, msg) if status.is_client_error() => {
                tracing::warn!("⚠️ 请求被拒绝 ({}): {}", status.as_u16(), msg);
                msg
            }
            RouteError::WithStatus(_, msg) | RouteError::BadGateway(msg) | RouteError::Internal(msg) => {
                tracing::error!("❌ 请求处理失败 ({}): {}", status.as_u16(), msg);
                msg
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<AppError> for RouteError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Api(ApiError::MissingCredential { name }) => {
                RouteError::Internal(format!("Missing {name}"))
            }
            AppError::Api(ApiError::BadResponse { message, .. }) => RouteError::BadGateway(message),
            AppError::Api(other) => RouteError::BadGateway(other.to_string()),
            AppError::Media(MediaError::InvalidDataUrl) => {
                RouteError::BadRequest(MediaError::InvalidDataUrl.to_string())
            }
            AppError::Media(other) => RouteError::Internal(other.to_string()),
            other => RouteError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for RouteError {
    fn from(e: JsonRejection) -> Self {
        RouteError::WithStatus(e.status(), e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let missing: RouteError = AppError::missing_credential("OPENAI_API_KEY").into();
        assert!(matches!(&missing, RouteError::Internal(msg) if msg == "Missing OPENAI_API_KEY"));

        let upstream: RouteError = AppError::bad_response("/images:annotate", 403, "Vision error 403: denied").into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);

        let invalid: RouteError = AppError::from(MediaError::InvalidDataUrl).into();
        assert!(matches!(&invalid, RouteError::BadRequest(msg) if msg == "Invalid data URL"));
    }

    #[test]
    fn test_upstream_client_errors_keep_their_status() {
        let rejected = RouteError::from_upstream(AppError::bad_response("/images/generations", 429, "Rate limit"));
        assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);

        let server = RouteError::from_upstream(AppError::bad_response("/images/generations", 503, "Overloaded"));
        assert!(matches!(&server, RouteError::BadGateway(msg) if msg == "Overloaded"));

        let missing = RouteError::from_upstream(AppError::missing_credential("OPENAI_API_KEY"));
        assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
