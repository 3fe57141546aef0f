use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::warn;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 工作流配置 ---
    /// 生成服务（studio server）地址
    pub studio_base_url: String,
    /// 每周最多生成次数
    pub max_generations_per_week: u32,
    /// 配额按哪个时区的周一 00:00 重置
    pub quota_timezone: Tz,
    /// 配额持久化文件
    pub quota_store_path: PathBuf,
    /// 保留的历史批次数量
    pub history_depth: usize,
    /// 每批生成的图片数量
    pub images_per_batch: usize,
    /// 是否启用 OCR 校验
    pub ocr_enabled: bool,
    /// HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 导出文件目录
    pub output_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- 服务端配置 ---
    /// 监听地址
    pub bind_addr: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base_url: String,
    pub image_model: String,
    pub vision_api_key: Option<String>,
    pub vision_api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            studio_base_url: "http://127.0.0.1:3000".to_string(),
            max_generations_per_week: 30,
            quota_timezone: chrono_tz::Europe::Paris,
            quota_store_path: PathBuf::from("flyer_quota.json"),
            history_depth: 10,
            images_per_batch: 4,
            ocr_enabled: true,
            request_timeout_secs: 120,
            output_dir: PathBuf::from("output"),
            verbose_logging: false,
            bind_addr: "127.0.0.1:3000".to_string(),
            openai_api_key: None,
            openai_api_base_url: "https://api.openai.com/v1".to_string(),
            image_model: "gpt-image-1.5".to_string(),
            vision_api_key: None,
            vision_api_base_url: "https://vision.googleapis.com/v1".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载，未设置的项使用默认值
    pub fn from_env() -> Self {
        Self::from_env_with(Self::default())
    }

    /// 先读取 TOML 配置文件（可选），再用环境变量覆盖
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        let config = Self::from_env_with(base);
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
            path: path.display().to_string(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.display().to_string(),
            source,
        })?;
        Ok(config)
    }

    /// 以 `base` 为底，用环境变量覆盖
    pub fn from_env_with(base: Self) -> Self {
        Self {
            studio_base_url: env_string("STUDIO_BASE_URL").unwrap_or(base.studio_base_url),
            max_generations_per_week: env_or("MAX_GENERATIONS_PER_WEEK", base.max_generations_per_week),
            quota_timezone: env_or("QUOTA_TIMEZONE", base.quota_timezone),
            quota_store_path: env_string("QUOTA_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(base.quota_store_path),
            history_depth: env_or("HISTORY_DEPTH", base.history_depth),
            images_per_batch: env_or("IMAGES_PER_BATCH", base.images_per_batch),
            ocr_enabled: env_or("OCR_ENABLED", base.ocr_enabled),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", base.request_timeout_secs),
            output_dir: env_string("OUTPUT_DIR").map(PathBuf::from).unwrap_or(base.output_dir),
            verbose_logging: env_or("VERBOSE_LOGGING", base.verbose_logging),
            bind_addr: env_string("BIND_ADDR").unwrap_or(base.bind_addr),
            openai_api_key: env_string("OPENAI_API_KEY").or(base.openai_api_key),
            openai_api_base_url: env_string("OPENAI_API_BASE_URL").unwrap_or(base.openai_api_base_url),
            image_model: env_string("IMAGE_MODEL").unwrap_or(base.image_model),
            vision_api_key: env_string("GOOGLE_VISION_API_KEY").or(base.vision_api_key),
            vision_api_base_url: env_string("VISION_API_BASE_URL").unwrap_or(base.vision_api_base_url),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        if self.history_depth == 0 {
            return Err(AppError::invalid_config("history_depth", "必须大于 0"));
        }
        if self.images_per_batch == 0 {
            return Err(AppError::invalid_config("images_per_batch", "必须大于 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::invalid_config("request_timeout_secs", "必须大于 0"));
        }
        reqwest::Url::parse(&self.studio_base_url)
            .map_err(|e| AppError::invalid_config("studio_base_url", e.to_string()))?;
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env_string(name) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("环境变量 {} 的值 '{}' 无法解析，使用默认值", name, raw);
                default
            }
        },
        None => default,
    }
}
