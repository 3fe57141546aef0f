/// Google Vision 文字识别客户端
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};

const ANNOTATE_PATH: &str = "/images:annotate";

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

impl AnnotateResponse {
    /// 优先取整页文字，其次取第一条文字标注
    fn into_text(self) -> String {
        let Some(first) = self.responses.into_iter().next() else {
            return String::new();
        };
        match first.full_text_annotation {
            Some(full) if !full.text.is_empty() => full.text,
            _ => first
                .text_annotations
                .into_iter()
                .next()
                .map(|a| a.description)
                .unwrap_or_default(),
        }
    }
}

/// Vision 客户端
#[derive(Clone, Debug)]
pub struct VisionClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
}

impl VisionClient {
    /// 按配置创建；未配置 API key 时返回 `None`
    pub fn from_config(config: &Config) -> AppResult<Option<Self>> {
        let Some(api_key) = config.vision_api_key.clone() else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::api_request_failed(&config.vision_api_base_url, e))?;
        Ok(Some(Self {
            http,
            api_key,
            api_base_url: config.vision_api_base_url.trim_end_matches('/').to_string(),
        }))
    }

    /// 识别图片中的文字
    ///
    /// # 参数
    /// - `content`: base64 编码的图片内容
    pub async fn detect_text(&self, content: &str) -> AppResult<String> {
        let url = format!("{}{}", self.api_base_url, ANNOTATE_PATH);
        let body = json!({
            "requests": [{
                "image": { "content": content },
                "features": [{ "type": "DOCUMENT_TEXT_DETECTION" }],
                "imageContext": { "languageHints": ["fr"] }
            }]
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(ANNOTATE_PATH, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(ANNOTATE_PATH, e))?;

        if !status.is_success() {
            return Err(AppError::bad_response(
                ANNOTATE_PATH,
                status.as_u16(),
                format!("Vision error {}: {}", status.as_u16(), text),
            ));
        }

        let parsed: AnnotateResponse =
            serde_json::from_str(&text).map_err(|source| ApiError::JsonParseFailed {
                endpoint: ANNOTATE_PATH.to_string(),
                source,
            })?;
        let recognized = parsed.into_text();
        debug!("Vision 识别出 {} 个字符", recognized.chars().count());
        Ok(recognized)
    }
}
