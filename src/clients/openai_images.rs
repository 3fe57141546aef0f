/// OpenAI 图片生成客户端
///
/// 只用到 `POST /images/generations`，返回 base64 PNG
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};

const GENERATIONS_PATH: &str = "/images/generations";

/// 图片生成参数
#[derive(Debug, Clone, Serialize)]
pub struct ImageGenerationParams<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub n: usize,
    pub size: &'a str,
    pub quality: &'a str,
    pub output_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

/// OpenAI 图片客户端
#[derive(Clone, Debug)]
pub struct OpenAiImagesClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
}

impl OpenAiImagesClient {
    /// 按配置创建；未配置 API key 时返回 `None`
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        let Some(api_key) = config.openai_api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::api_request_failed(&config.openai_api_base_url, e))?;
        Ok(Some(Self {
            http,
            api_key,
            api_base_url: config.openai_api_base_url.trim_end_matches('/').to_string(),
            model: config.image_model.clone(),
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// 生成图片，返回 base64 编码的 PNG 列表
    pub async fn generate(&self, params: &ImageGenerationParams<'_>) -> AppResult<Vec<String>> {
        let url = format!("{}{}", self.api_base_url, GENERATIONS_PATH);
        info!(
            "🎨 调用图片生成接口: 模型 {} | 数量 {} | 质量 {}",
            params.model, params.n, params.quality
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(params)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(GENERATIONS_PATH, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(GENERATIONS_PATH, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAiErrorResponse>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(AppError::bad_response(GENERATIONS_PATH, status.as_u16(), message));
        }

        let parsed: ImagesResponse =
            serde_json::from_str(&text).map_err(|source| ApiError::JsonParseFailed {
                endpoint: GENERATIONS_PATH.to_string(),
                source,
            })?;

        let images: Vec<String> = parsed.data.into_iter().filter_map(|d| d.b64_json).collect();
        debug!("图片生成接口返回 {} 张图片", images.len());
        Ok(images)
    }
}
