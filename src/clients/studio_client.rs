/// 生成服务 HTTP 客户端
///
/// 封装 `/api/flyer-full`、`/api/verify-ocr`、`/api/export-formats` 三个接口
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::clients::provider::{ExportProvider, GenerationProvider, VerificationProvider};
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{
    ErrorBody, ExportPayload, ExportRequest, GenerationPayload, GenerationRequest, ProviderReply,
    VerifyPayload, VerifyRequest,
};

pub const FLYER_FULL_PATH: &str = "/api/flyer-full";
pub const VERIFY_OCR_PATH: &str = "/api/verify-ocr";
pub const EXPORT_FORMATS_PATH: &str = "/api/export-formats";

/// 生成服务客户端
#[derive(Clone, Debug)]
pub struct StudioClient {
    http: reqwest::Client,
    base_url: String,
}

impl StudioClient {
    /// 按配置创建
    pub fn new(config: &Config) -> AppResult<Self> {
        Self::with_base_url(
            &config.studio_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// 指定服务地址创建
    pub fn with_base_url(base_url: &str, timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::api_request_failed(base_url, e))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 发送 JSON 请求并解析响应
    ///
    /// 非 2xx 状态码或 `{ "error": ... }` 负载都视为失败。
    async fn post_json<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(path, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(path, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            warn!("{} 返回错误状态 {}: {}", path, status.as_u16(), message);
            return Err(AppError::bad_response(path, status.as_u16(), message));
        }

        let reply: ProviderReply<T> =
            serde_json::from_str(&text).map_err(|source| ApiError::JsonParseFailed {
                endpoint: path.to_string(),
                source,
            })?;
        reply.into_result(path, status.as_u16())
    }
}

#[async_trait]
impl GenerationProvider for StudioClient {
    async fn generate(&self, request: &GenerationRequest) -> AppResult<Vec<String>> {
        let payload: GenerationPayload = self.post_json(FLYER_FULL_PATH, request).await?;
        Ok(payload.images)
    }
}

#[async_trait]
impl VerificationProvider for StudioClient {
    async fn verify(&self, request: &VerifyRequest) -> AppResult<VerifyPayload> {
        self.post_json(VERIFY_OCR_PATH, request).await
    }
}

#[async_trait]
impl ExportProvider for StudioClient {
    async fn export(&self, image_data_url: &str) -> AppResult<ExportPayload> {
        let request = ExportRequest {
            image_data_url: image_data_url.to_string(),
        };
        self.post_json(EXPORT_FORMATS_PATH, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlyerBrief, MissingField, Mode};

    fn client_for(server: &mockito::ServerGuard) -> StudioClient {
        StudioClient::with_base_url(&server.url(), Duration::from_secs(5)).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            brief: FlyerBrief::default(),
            vibe: "techno neon underground".to_string(),
            mode: Mode::Premium,
        }
    }

    #[tokio::test]
    async fn test_generate_returns_images() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", FLYER_FULL_PATH)
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "title": "Techno Night",
                "mode": "premium"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"images":["data:image/png;base64,AAA","data:image/png;base64,BBB"]}"#)
            .create_async()
            .await;

        let images = client_for(&server).generate(&request()).await.unwrap();
        assert_eq!(images.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_carries_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", FLYER_FULL_PATH)
            .with_status(502)
            .with_body(r#"{"error":"No images returned from API"}"#)
            .create_async()
            .await;

        let err = client_for(&server).generate(&request()).await.unwrap_err();
        match err {
            AppError::Api(ApiError::BadResponse { status, message, .. }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "No images returned from API");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_verify_parses_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", VERIFY_OCR_PATH)
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "imageDataUrl": "data:image/png;base64,AAA",
                "expected": { "venue": "Warehouse 13" }
            })))
            .with_status(200)
            .with_body(r#"{"text":"SAMEDI 28 MARS","isValid":false,"missing":["lieu"]}"#)
            .create_async()
            .await;

        let payload = client_for(&server)
            .verify(&VerifyRequest {
                image_data_url: "data:image/png;base64,AAA".to_string(),
                expected: FlyerBrief::default().expected_fields(),
            })
            .await
            .unwrap();
        assert!(!payload.is_valid);
        assert_eq!(payload.missing, vec![MissingField::Venue]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", EXPORT_FORMATS_PATH)
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = client_for(&server)
            .export("data:image/png;base64,AAA")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::JsonParseFailed { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_request_error() {
        let client =
            StudioClient::with_base_url("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = client.generate(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::RequestFailed { .. })));
    }
}
