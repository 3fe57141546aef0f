//! 命令行入口对应的应用层
//!
//! - `serve`：启动海报工作室 HTTP 服务
//! - `generate`：向工作室提交一次生成，逐张打印校验进度，可选导出
//! - `quota`：查看本周剩余生成次数

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::DateTime;
use chrono_tz::Tz;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::api;
use crate::clients::{Providers, StudioClient};
use crate::config::Config;
use crate::infrastructure::{Clock, JsonFileStore, SystemClock};
use crate::models::{BatchEvent, ExportPayload, FlyerBrief, GenerationBatch, Mode};
use crate::orchestrator::{BatchOrchestrator, OrchestratorSettings};
use crate::services::data_url::decode_data_url;
use crate::services::QuotaTracker;
use crate::utils::logging::{badge_text, log_startup, print_batch_summary};

/// 一次生成的参数
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub brief: FlyerBrief,
    pub vibe: String,
    pub mode: Mode,
    /// 是否把第一张图导出为帖子 / 快拍尺寸
    pub export: bool,
}

/// 配额查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaReport {
    pub remaining: u32,
    pub limit: u32,
    pub week_start: DateTime<Tz>,
}

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 启动 HTTP 服务
    pub async fn serve(&self) -> Result<()> {
        log_startup("serve", &self.config);
        api::serve(&self.config).await
    }

    /// 提交一次生成并等待校验结束
    pub async fn generate(&self, options: GenerateOptions) -> Result<GenerationBatch> {
        log_startup("generate", &self.config);

        let orchestrator = self.build_orchestrator()?;
        let progress = spawn_progress_logger(&orchestrator);

        let result = self.run_generation(&orchestrator, &options).await;

        // 编排器释放后事件通道关闭，进度任务随之结束
        drop(orchestrator);
        let _ = progress.await;

        result
    }

    /// 读取本周配额
    pub fn quota_report(&self) -> QuotaReport {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(JsonFileStore::new(self.config.quota_store_path.clone()));
        let tracker = QuotaTracker::from_config(&self.config, store, clock);

        QuotaReport {
            remaining: tracker.remaining(),
            limit: tracker.limit(),
            week_start: tracker.current_week_start(),
        }
    }

    async fn run_generation(
        &self,
        orchestrator: &BatchOrchestrator,
        options: &GenerateOptions,
    ) -> Result<GenerationBatch> {
        let batch = orchestrator
            .submit(&options.brief, &options.vibe, options.mode)
            .await
            .context("生成失败")?;

        print_batch_summary(&batch, orchestrator.remaining(), orchestrator.quota_limit());

        if options.export {
            let payload = orchestrator.export_selected().await.context("导出失败")?;
            let (post, story) = self.write_exports(&payload)?;
            info!("💾 已导出: {} | {}", post.display(), story.display());
        }

        Ok(batch)
    }

    fn build_orchestrator(&self) -> Result<BatchOrchestrator> {
        let client = Arc::new(StudioClient::new(&self.config).context("创建工作室客户端失败")?);
        let store = Arc::new(JsonFileStore::new(self.config.quota_store_path.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let quota = QuotaTracker::from_config(&self.config, store, clock.clone());

        Ok(BatchOrchestrator::new(
            Providers::from_client(client),
            quota,
            clock,
            OrchestratorSettings::from_config(&self.config),
        ))
    }

    /// 写出 post.png / story.png
    fn write_exports(&self, payload: &ExportPayload) -> Result<(PathBuf, PathBuf)> {
        let dir = &self.config.output_dir;
        fs::create_dir_all(dir).with_context(|| format!("无法创建输出目录 {}", dir.display()))?;

        let post_path = dir.join("post.png");
        let story_path = dir.join("story.png");
        for (path, data_url) in [
            (&post_path, &payload.post_data_url),
            (&story_path, &payload.story_data_url),
        ] {
            let bytes = decode_data_url(data_url)?;
            fs::write(path, bytes).with_context(|| format!("写入 {} 失败", path.display()))?;
        }

        Ok((post_path, story_path))
    }
}

fn spawn_progress_logger(orchestrator: &BatchOrchestrator) -> tokio::task::JoinHandle<()> {
    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!("⚠️ 跳过了 {} 条进度事件", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &BatchEvent) {
    match event {
        BatchEvent::Pending { batch_id } => info!("⏳ 批次 {} 已创建，等待生成服务...", batch_id),
        BatchEvent::Resolved { images, .. } => info!("🖼️ 收到 {} 张图片，开始校验", images),
        BatchEvent::SlotUpdated { index, status, .. } => {
            info!("  图片 {}: {}", index + 1, badge_text(status))
        }
        BatchEvent::Failed { message, .. } => warn!("❌ 生成失败: {}", message),
        BatchEvent::HistoryCleared => {}
    }
}
