use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppResult, MediaError};

static DATA_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/\w+;base64,(.+)$").expect("data URL pattern is valid"));

/// 取出 `data:image/<fmt>;base64,` 之后的 base64 内容
pub fn extract_base64(data_url: &str) -> AppResult<&str> {
    DATA_URL_RE
        .captures(data_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| MediaError::InvalidDataUrl.into())
}

/// 解码 data URL 为原始字节
pub fn decode_data_url(data_url: &str) -> AppResult<Vec<u8>> {
    let encoded = extract_base64(data_url)?;
    Ok(STANDARD.decode(encoded)?)
}

/// 将 base64 PNG 包装成 data URL
pub fn png_data_url_from_base64(encoded: &str) -> String {
    format!("data:image/png;base64,{}", encoded)
}

/// 将 PNG 字节编码成 data URL
pub fn png_data_url(bytes: &[u8]) -> String {
    png_data_url_from_base64(&STANDARD.encode(bytes))
}
