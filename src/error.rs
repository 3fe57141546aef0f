use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 外部服务调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 配额存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 图片处理错误
    #[error("图片处理错误: {0}")]
    Media(#[from] MediaError),
    /// 业务逻辑错误
    #[error("业务错误: {0}")]
    Business(#[from] BusinessError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 外部服务调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务返回非成功状态码或错误负载
    #[error("API返回错误响应 ({endpoint}): status={status}, message={message}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 服务返回空结果
    #[error("API返回空结果: {endpoint}")]
    EmptyResponse { endpoint: String },
    /// JSON 解析失败
    #[error("JSON解析失败 ({endpoint}): {source}")]
    JsonParseFailed {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    /// 缺少访问凭证
    #[error("Missing {name}")]
    MissingCredential { name: String },
}

/// 配额存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取失败
    #[error("读取存储失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入失败
    #[error("写入存储失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 文件内容损坏
    #[error("存储内容损坏 ({path}): {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 图片处理错误
#[derive(Debug, Error)]
pub enum MediaError {
    /// 非法的 data URL
    #[error("Invalid data URL")]
    InvalidDataUrl,
    /// base64 解码失败
    #[error("base64解码失败: {0}")]
    Base64(#[from] base64::DecodeError),
    /// 图片解码 / 编码失败
    #[error("图片编解码失败: {0}")]
    Image(#[from] image::ImageError),
}

/// 业务逻辑错误
#[derive(Debug, Error)]
pub enum BusinessError {
    /// 本周生成次数已用完
    #[error("本周生成次数已用完 (上限: {limit})")]
    QuotaExceeded { limit: u32 },
    /// 已有生成任务在进行中
    #[error("已有生成任务在进行中")]
    SubmissionInFlight,
    /// 生成服务返回的图片数量不符合约定
    #[error("生成服务返回了 {actual} 张图片，预期 {expected} 张")]
    UnexpectedImageCount { expected: usize, actual: usize },
    /// 生成服务返回了空图片
    #[error("生成服务返回的第 {index} 张图片为空")]
    EmptyImage { index: usize },
    /// 批次不存在
    #[error("批次不存在: {batch_id}")]
    BatchNotFound { batch_id: String },
    /// 当前没有可导出的已选图片
    #[error("当前没有选中的图片")]
    NothingSelected,
    /// 图片索引超出范围
    #[error("索引 {index} 超出范围 [0, {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置值非法
    #[error("配置项 {field} 非法: {reason}")]
    InvalidValue { field: String, reason: String },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========
// anyhow 已经为所有实现了 std::error::Error 的类型提供了自动转换

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            endpoint: String::new(),
            source: err,
        })
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Media(MediaError::Image(err))
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::Media(MediaError::Base64(err))
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建错误响应
    pub fn bad_response(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        AppError::Api(ApiError::BadResponse {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        })
    }

    /// 创建缺少凭证错误
    pub fn missing_credential(name: impl Into<String>) -> Self {
        AppError::Api(ApiError::MissingCredential { name: name.into() })
    }

    /// 创建配置值非法错误
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// 是否为配额用尽
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppError::Business(BusinessError::QuotaExceeded { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credential_message_names_variable() {
        let err = AppError::missing_credential("OPENAI_API_KEY");
        assert_eq!(err.to_string(), "API错误: Missing OPENAI_API_KEY");
    }

    #[test]
    fn test_quota_exceeded_detection() {
        let err: AppError = BusinessError::QuotaExceeded { limit: 30 }.into();
        assert!(err.is_quota_exceeded());
        assert!(!AppError::Other("x".into()).is_quota_exceeded());
    }
}
