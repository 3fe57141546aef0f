use std::sync::Arc;

use crate::clients::{OpenAiImagesClient, VisionClient};
use crate::config::Config;
use crate::error::AppResult;

/// 路由共享状态
///
/// 未配置的上游服务为 `None`，对应路由返回 "Missing ..."。
#[derive(Clone)]
pub struct AppState {
    pub openai: Option<Arc<OpenAiImagesClient>>,
    pub vision: Option<Arc<VisionClient>>,
    pub images_per_batch: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            openai: OpenAiImagesClient::from_config(config)?.map(Arc::new),
            vision: VisionClient::from_config(config)?.map(Arc::new),
            images_per_batch: config.images_per_batch,
        })
    }
}
