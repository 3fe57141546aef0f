//! 外部服务能力抽象
//!
//! 工作流只依赖这几个 trait，测试里可以换成内存实现。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{ExportPayload, GenerationRequest, VerifyPayload, VerifyRequest};

/// 海报生成服务
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// 返回按顺序排列的图片 data URL
    async fn generate(&self, request: &GenerationRequest) -> AppResult<Vec<String>>;
}

/// OCR 校验服务
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    async fn verify(&self, request: &VerifyRequest) -> AppResult<VerifyPayload>;
}

/// 尺寸导出服务
#[async_trait]
pub trait ExportProvider: Send + Sync {
    async fn export(&self, image_data_url: &str) -> AppResult<ExportPayload>;
}

/// 工作流使用的三个服务
#[derive(Clone)]
pub struct Providers {
    pub generator: Arc<dyn GenerationProvider>,
    pub verifier: Arc<dyn VerificationProvider>,
    pub exporter: Arc<dyn ExportProvider>,
}

impl Providers {
    /// 三个能力由同一个客户端提供
    pub fn from_client<C>(client: Arc<C>) -> Self
    where
        C: GenerationProvider + VerificationProvider + ExportProvider + 'static,
    {
        Self {
            generator: client.clone(),
            verifier: client.clone(),
            exporter: client,
        }
    }
}
