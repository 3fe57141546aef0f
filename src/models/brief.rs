use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::verification::ExpectedFields;
use crate::services::sanitize::sanitize_text;

/// 海报文案（用户输入的 8 个字段）
///
/// 反序列化时缺省字段为空字符串。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlyerBrief {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub cta: String,
}

impl Default for FlyerBrief {
    fn default() -> Self {
        Self {
            title: "Techno Night".to_string(),
            subtitle: "Beats industriels, strobe et ligne d'acid jusqu'à l'aurore.".to_string(),
            date: "Samedi 28 mars".to_string(),
            time: "23h00 - 06h00".to_string(),
            venue: "Warehouse 13".to_string(),
            city: "Paris".to_string(),
            price: "28 € • prévente".to_string(),
            cta: "Réserver".to_string(),
        }
    }
}

impl FlyerBrief {
    /// 所有字段解码 HTML 实体并去掉首尾空白
    pub fn sanitized(&self) -> Self {
        Self {
            title: sanitize_text(&self.title),
            subtitle: sanitize_text(&self.subtitle),
            date: sanitize_text(&self.date),
            time: sanitize_text(&self.time),
            venue: sanitize_text(&self.venue),
            city: sanitize_text(&self.city),
            price: sanitize_text(&self.price),
            cta: sanitize_text(&self.cta),
        }
    }

    /// OCR 校验时期望出现在图片上的文字
    pub fn expected_fields(&self) -> ExpectedFields {
        ExpectedFields {
            title: Some(self.title.clone()),
            date: self.date.clone(),
            time: Some(self.time.clone()),
            venue: self.venue.clone(),
            city: Some(self.city.clone()),
            price: Some(self.price.clone()),
            cta: Some(self.cta.clone()),
        }
    }
}

/// 默认风格描述
pub const DEFAULT_VIBE: &str = "techno neon underground";

/// 生成模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Fast,
    Premium,
}

impl Mode {
    /// 对应图片生成接口的 quality 参数
    pub fn quality(self) -> &'static str {
        match self {
            Mode::Fast => "medium",
            Mode::Premium => "high",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Fast => f.write_str("fast"),
            Mode::Premium => f.write_str("premium"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Mode::Fast),
            "premium" => Ok(Mode::Premium),
            other => Err(format!("未知的生成模式: {} (可选 fast / premium)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_decodes_and_trims_every_field() {
        let brief = FlyerBrief {
            title: "  Rock &amp; Roll ".to_string(),
            cta: "L&#39;entrée\n".to_string(),
            ..FlyerBrief::default()
        };
        let clean = brief.sanitized();
        assert_eq!(clean.title, "Rock & Roll");
        assert_eq!(clean.cta, "L'entrée");
        assert_eq!(clean.venue, "Warehouse 13");
    }

    #[test]
    fn test_mode_quality_and_parse() {
        assert_eq!(Mode::Fast.quality(), "medium");
        assert_eq!(Mode::Premium.quality(), "high");
        assert_eq!("PREMIUM".parse::<Mode>().unwrap(), Mode::Premium);
        assert!("turbo".parse::<Mode>().is_err());
        assert_eq!(serde_json::to_string(&Mode::Fast).unwrap(), "\"fast\"");
    }
}
