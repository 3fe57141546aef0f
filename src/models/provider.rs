//! 与外部服务交互的请求 / 响应结构
//!
//! 响应统一解码为 [`ProviderReply`]：要么是成功负载，要么是 `{ "error": ... }`。

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::brief::{FlyerBrief, Mode};
use crate::models::verification::{ExpectedFields, MissingField};

/// 生成请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(flatten)]
    pub brief: FlyerBrief,
    #[serde(default)]
    pub vibe: String,
    #[serde(default)]
    pub mode: Mode,
}

/// 生成成功负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPayload {
    pub images: Vec<String>,
}

/// OCR 校验请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub image_data_url: String,
    pub expected: ExpectedFields,
}

/// OCR 校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPayload {
    pub text: String,
    pub is_valid: bool,
    pub missing: Vec<MissingField>,
}

/// 导出请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub image_data_url: String,
}

/// 导出结果：Instagram 帖子 (1080x1350) 与快拍 (1080x1920)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub post_data_url: String,
    pub story_data_url: String,
}

/// 错误响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// 服务响应：成功负载或错误负载
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ProviderReply<T> {
    Success(T),
    Failure(ErrorBody),
}

impl<T> ProviderReply<T> {
    /// 转换为 Result，错误负载视为服务端错误
    pub fn into_result(self, endpoint: &str, status: u16) -> AppResult<T> {
        match self {
            ProviderReply::Success(payload) => Ok(payload),
            ProviderReply::Failure(body) => Err(AppError::bad_response(endpoint, status, body.error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_is_flat() {
        let request = GenerationRequest {
            brief: FlyerBrief::default(),
            vibe: "acid".to_string(),
            mode: Mode::Premium,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["title"], "Techno Night");
        assert_eq!(json["vibe"], "acid");
        assert_eq!(json["mode"], "premium");
    }

    #[test]
    fn test_reply_discriminates_error_payload() {
        let reply: ProviderReply<GenerationPayload> =
            serde_json::from_str(r#"{"error":"No images returned from API"}"#).unwrap();
        let err = reply.into_result("/api/flyer-full", 200).unwrap_err();
        assert!(err.to_string().contains("No images returned from API"));

        let reply: ProviderReply<VerifyPayload> =
            serde_json::from_str(r#"{"text":"x","isValid":false,"missing":["heure"]}"#).unwrap();
        let payload = reply.into_result("/api/verify-ocr", 200).unwrap();
        assert_eq!(payload.missing, vec![MissingField::Time]);
    }
}
