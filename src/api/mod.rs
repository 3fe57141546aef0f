//! 海报工作室 HTTP 服务
//!
//! 三个 JSON 接口加一个健康检查：
//!
//! - `POST /api/flyer-full`：调用图片生成接口，返回 PNG data URL 列表
//! - `POST /api/verify-ocr`：OCR 识别并检查关键字段
//! - `POST /api/export-formats`：裁切为帖子 / 快拍尺寸
//! - `GET /health`
//!
//! 所有错误响应都是 `{ "error": ... }`。请求体上限为 [`MAX_BODY_BYTES`]，
//! 足够容纳 1024×1536 PNG 的 data URL。

pub mod error;
pub mod routes;
pub mod state;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::clients::studio_client::{EXPORT_FORMATS_PATH, FLYER_FULL_PATH, VERIFY_OCR_PATH};
use crate::config::Config;

pub use error::RouteError;
pub use state::AppState;

/// 请求体上限 (25 MiB)
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route(FLYER_FULL_PATH, post(routes::flyer_full::flyer_full))
        .route(VERIFY_OCR_PATH, post(routes::verify_ocr::verify_ocr))
        .route(EXPORT_FORMATS_PATH, post(routes::export_formats::export_formats))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// 启动服务，直到进程退出
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config).context("初始化上游客户端失败")?;
    if state.openai.is_none() {
        tracing::warn!("⚠️ 未配置 OPENAI_API_KEY，/api/flyer-full 将返回 500");
    }
    if state.vision.is_none() {
        tracing::warn!("⚠️ 未配置 GOOGLE_VISION_API_KEY，/api/verify-ocr 将返回 500");
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("无法监听地址 {}", config.bind_addr))?;
    info!("🚀 海报工作室服务已启动: http://{}", config.bind_addr);

    axum::serve(listener, router(state))
        .await
        .context("HTTP 服务异常退出")?;
    Ok(())
}
