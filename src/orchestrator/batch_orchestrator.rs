//! 批次编排器 - 编排层
//!
//! ## 职责
//!
//! 把一次"生成"请求从头跑到尾：
//!
//! 1. **前置检查**：同一时间只允许一个生成任务；本周配额必须还有剩余
//! 2. **占位批次**：先放出带占位图的待定批次并选中第一张
//! 3. **调用生成服务**：图片数量必须正好等于 `images_per_batch`，且每张都不能为空
//! 4. **登记结果**：计入配额、写入历史、广播事件
//! 5. **逐张校验**：委托 [`VerifyFlow`] 顺序校验，结果按批次 id + 下标写回
//!
//! ## 状态约定
//!
//! - 共享状态放在 `std::sync::Mutex` 里，锁从不跨 `.await` 持有
//! - 生成失败时丢弃待定批次，不计配额，也不会挤掉历史中的旧批次
//! - 外部发起的 [`BatchOrchestrator::verify_batch`] 与提交共用同一个进行中标记，
//!   任何时刻最多只有一个 OCR 请求

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clients::Providers;
use crate::config::Config;
use crate::error::{AppError, AppResult, BusinessError};
use crate::infrastructure::Clock;
use crate::models::{
    BatchEvent, ExpectedFields, ExportPayload, FlyerBrief, GenerationBatch, GenerationRequest, Mode,
    Selection, VerificationStatus,
};
use crate::orchestrator::history::BatchHistory;
use crate::services::{sanitize_text, QuotaState, QuotaTracker};
use crate::workflow::{VerifyFlow, VerifySummary};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 编排器参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub images_per_batch: usize,
    pub ocr_enabled: bool,
    pub history_depth: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            images_per_batch: 4,
            ocr_enabled: true,
            history_depth: 10,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            images_per_batch: config.images_per_batch,
            ocr_enabled: config.ocr_enabled,
            history_depth: config.history_depth,
        }
    }
}

/// 工作区状态：历史、待定批次与当前选中
struct WorkspaceState {
    history: BatchHistory,
    pending: Option<GenerationBatch>,
    selection: Option<Selection>,
}

impl WorkspaceState {
    fn find(&self, batch_id: &str) -> Option<&GenerationBatch> {
        self.history
            .get(batch_id)
            .or_else(|| self.pending.as_ref().filter(|b| b.id == batch_id))
    }

    fn clear_selection_of(&mut self, batch_id: &str) {
        if self.selection.as_ref().is_some_and(|s| s.batch_id == batch_id) {
            self.selection = None;
        }
    }
}

/// 生成中标记，离开作用域时自动释放
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// 批次编排器
pub struct BatchOrchestrator {
    providers: Providers,
    quota: Mutex<QuotaTracker>,
    state: Mutex<WorkspaceState>,
    in_flight: AtomicBool,
    events: broadcast::Sender<BatchEvent>,
    settings: OrchestratorSettings,
    clock: Arc<dyn Clock>,
}

impl BatchOrchestrator {
    pub fn new(
        providers: Providers,
        quota: QuotaTracker,
        clock: Arc<dyn Clock>,
        settings: OrchestratorSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            providers,
            quota: Mutex::new(quota),
            state: Mutex::new(WorkspaceState {
                history: BatchHistory::new(settings.history_depth),
                pending: None,
                selection: None,
            }),
            in_flight: AtomicBool::new(false),
            events,
            settings,
            clock,
        }
    }

    /// 订阅批次事件
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    /// 提交一次生成
    ///
    /// 成功时返回校验结束后的批次快照。
    pub async fn submit(&self, brief: &FlyerBrief, vibe: &str, mode: Mode) -> AppResult<GenerationBatch> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(BusinessError::SubmissionInFlight)?;

        let (remaining, limit) = {
            let mut quota = self.lock_quota();
            quota.load();
            (quota.remaining(), quota.limit())
        };
        if remaining == 0 {
            warn!("⚠️ 本周生成次数已用完 ({}/{})", limit, limit);
            return Err(BusinessError::QuotaExceeded { limit }.into());
        }

        let brief = brief.sanitized();
        let vibe = sanitize_text(vibe);
        let initial = self.initial_status();
        let batch_id = Uuid::new_v4().to_string();
        let mut batch = GenerationBatch::pending(
            batch_id.clone(),
            self.clock.now().timestamp_millis(),
            vibe.clone(),
            self.settings.images_per_batch,
            initial.clone(),
        );

        {
            let mut state = self.lock_state();
            state.pending = Some(batch.clone());
            state.selection = Some(Selection {
                batch_id: batch_id.clone(),
                index: 0,
            });
        }
        self.emit(BatchEvent::Pending {
            batch_id: batch_id.clone(),
        });
        info!("🎨 开始生成批次 {} (模式: {}, 剩余配额: {})", batch_id, mode, remaining);

        let request = GenerationRequest {
            brief: brief.clone(),
            vibe,
            mode,
        };
        let images = match self.generate_images(&request).await {
            Ok(images) => images,
            Err(e) => {
                self.abort_pending(&batch_id, &e);
                return Err(e);
            }
        };

        let quota_state = self.lock_quota().increment();
        batch.resolve(images, initial);

        let evicted = {
            let mut state = self.lock_state();
            state.pending = None;
            let evicted = state.history.push_front(batch.clone());
            for old in &evicted {
                state.clear_selection_of(&old.id);
            }
            evicted
        };
        for old in &evicted {
            debug!("历史已满，移除最旧的批次 {}", old.id);
        }
        self.emit(BatchEvent::Resolved {
            batch_id: batch_id.clone(),
            images: batch.images.len(),
        });
        info!(
            "✅ 批次 {} 生成完成: {} 张图片 (本周已用 {}/{})",
            batch_id,
            batch.images.len(),
            quota_state.count,
            limit
        );

        if let Err(e) = self.run_verification(&batch_id, &brief.expected_fields()).await {
            warn!("⚠️ 批次 {} 未能校验: {}", batch_id, e);
        }

        Ok(self.batch(&batch_id).unwrap_or(batch))
    }

    /// 重新校验历史中的批次
    ///
    /// 有生成任务在进行时返回 `SubmissionInFlight`。
    pub async fn verify_batch(&self, batch_id: &str, expected: &ExpectedFields) -> AppResult<VerifySummary> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(BusinessError::SubmissionInFlight)?;
        self.run_verification(batch_id, expected).await
    }

    /// 顺序校验批次中的图片
    ///
    /// 关闭 OCR 时只把所有槽位置为 `Idle`，不发任何请求。
    async fn run_verification(&self, batch_id: &str, expected: &ExpectedFields) -> AppResult<VerifySummary> {
        let batch = self.batch(batch_id).ok_or_else(|| BusinessError::BatchNotFound {
            batch_id: batch_id.to_string(),
        })?;

        if !self.settings.ocr_enabled {
            for index in 0..batch.verification.len() {
                self.update_slot(batch_id, index, VerificationStatus::Idle);
            }
            return Ok(VerifySummary::default());
        }

        let tasks = VerifyFlow::tasks_for(&batch);
        let flow = VerifyFlow::new(self.providers.verifier.clone());
        let summary = flow
            .run(tasks, expected, |index, status| {
                self.update_slot(batch_id, index, status);
            })
            .await;
        Ok(summary)
    }

    /// 写回某张图片的校验状态
    ///
    /// 批次已不在历史中、下标越界或槽位已是终态时返回 false。
    pub fn update_slot(&self, batch_id: &str, index: usize, status: VerificationStatus) -> bool {
        let updated = {
            let mut state = self.lock_state();
            match state.history.get_mut(batch_id) {
                Some(batch) => batch.set_status(index, status.clone()),
                None => false,
            }
        };

        if updated {
            self.emit(BatchEvent::SlotUpdated {
                batch_id: batch_id.to_string(),
                index,
                status,
            });
        } else {
            debug!("忽略批次 {} 第 {} 张的状态更新", batch_id, index);
        }
        updated
    }

    /// 选中某个批次中的一张图片
    pub fn select(&self, batch_id: &str, index: usize) -> AppResult<()> {
        let mut state = self.lock_state();
        let batch = state.find(batch_id).ok_or_else(|| BusinessError::BatchNotFound {
            batch_id: batch_id.to_string(),
        })?;
        let len = batch.images.len();
        if index >= len {
            return Err(BusinessError::IndexOutOfRange { index, len }.into());
        }
        state.selection = Some(Selection {
            batch_id: batch_id.to_string(),
            index,
        });
        Ok(())
    }

    /// 清空历史和当前选中
    pub fn clear_history(&self) {
        {
            let mut state = self.lock_state();
            state.history.clear();
            state.selection = None;
        }
        self.emit(BatchEvent::HistoryCleared);
        info!("🧹 历史已清空");
    }

    /// 正在生成中的占位批次
    pub fn pending(&self) -> Option<GenerationBatch> {
        self.lock_state().pending.clone()
    }

    /// 历史批次（新的在前）
    pub fn history(&self) -> Vec<GenerationBatch> {
        self.lock_state().history.to_vec()
    }

    pub fn batch(&self, batch_id: &str) -> Option<GenerationBatch> {
        self.lock_state().find(batch_id).cloned()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.lock_state().selection.clone()
    }

    /// 导出当前选中的图片
    pub async fn export_selected(&self) -> AppResult<ExportPayload> {
        let image = {
            let state = self.lock_state();
            state
                .selection
                .as_ref()
                .and_then(|s| state.find(&s.batch_id).and_then(|b| b.image(s.index)))
                .map(str::to_string)
                .ok_or(BusinessError::NothingSelected)?
        };
        self.export_data_url(&image).await
    }

    /// 导出指定批次中的一张图片
    pub async fn export_image(&self, batch_id: &str, index: usize) -> AppResult<ExportPayload> {
        let image = {
            let state = self.lock_state();
            let batch = state.find(batch_id).ok_or_else(|| BusinessError::BatchNotFound {
                batch_id: batch_id.to_string(),
            })?;
            let len = batch.images.len();
            if index >= len {
                return Err(BusinessError::IndexOutOfRange { index, len }.into());
            }
            batch
                .image(index)
                .map(str::to_string)
                .ok_or(BusinessError::NothingSelected)?
        };
        self.export_data_url(&image).await
    }

    /// 本周剩余次数（跨周时先重置）
    pub fn remaining(&self) -> u32 {
        let mut quota = self.lock_quota();
        quota.load();
        quota.remaining()
    }

    pub fn quota_state(&self) -> QuotaState {
        self.lock_quota().state()
    }

    pub fn quota_limit(&self) -> u32 {
        self.lock_quota().limit()
    }

    async fn generate_images(&self, request: &GenerationRequest) -> AppResult<Vec<String>> {
        let images = self.providers.generator.generate(request).await?;
        let expected = self.settings.images_per_batch;
        if images.len() != expected {
            return Err(BusinessError::UnexpectedImageCount {
                expected,
                actual: images.len(),
            }
            .into());
        }
        if let Some(index) = images.iter().position(|image| image.trim().is_empty()) {
            return Err(BusinessError::EmptyImage { index }.into());
        }
        Ok(images)
    }

    async fn export_data_url(&self, image: &str) -> AppResult<ExportPayload> {
        info!("📐 导出帖子与快拍尺寸...");
        let payload = self.providers.exporter.export(image).await?;
        info!("✓ 导出完成");
        Ok(payload)
    }

    fn abort_pending(&self, batch_id: &str, error: &AppError) {
        {
            let mut state = self.lock_state();
            if state.pending.as_ref().is_some_and(|b| b.id == batch_id) {
                state.pending = None;
            }
            state.clear_selection_of(batch_id);
        }
        warn!("❌ 批次 {} 生成失败: {}", batch_id, error);
        self.emit(BatchEvent::Failed {
            batch_id: batch_id.to_string(),
            message: error.to_string(),
        });
    }

    fn initial_status(&self) -> VerificationStatus {
        if self.settings.ocr_enabled {
            VerificationStatus::Checking
        } else {
            VerificationStatus::Idle
        }
    }

    fn emit(&self, event: BatchEvent) {
        // 没有订阅者时 send 会返回错误，忽略即可
        let _ = self.events.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, WorkspaceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_quota(&self) -> MutexGuard<'_, QuotaTracker> {
        self.quota.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ExportProvider, GenerationProvider, VerificationProvider};
    use crate::infrastructure::{FixedClock, MemoryStore};
    use crate::models::{VerifyPayload, VerifyRequest};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;

    struct FakeStudio {
        image_count: usize,
        generate_calls: AtomicUsize,
        verify_calls: AtomicUsize,
    }

    impl FakeStudio {
        fn new(image_count: usize) -> Arc<Self> {
            Arc::new(Self {
                image_count,
                generate_calls: AtomicUsize::new(0),
                verify_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl GenerationProvider for FakeStudio {
        async fn generate(&self, _request: &GenerationRequest) -> AppResult<Vec<String>> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            Ok((0..self.image_count)
                .map(|i| format!("data:image/png;base64,img{i}"))
                .collect())
        }
    }

    #[async_trait]
    impl VerificationProvider for FakeStudio {
        async fn verify(&self, _request: &VerifyRequest) -> AppResult<VerifyPayload> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            Ok(VerifyPayload {
                text: "ok".to_string(),
                is_valid: true,
                missing: Vec::new(),
            })
        }
    }

    #[async_trait]
    impl ExportProvider for FakeStudio {
        async fn export(&self, image_data_url: &str) -> AppResult<ExportPayload> {
            Ok(ExportPayload {
                post_data_url: format!("post:{image_data_url}"),
                story_data_url: format!("story:{image_data_url}"),
            })
        }
    }

    fn orchestrator(studio: Arc<FakeStudio>, limit: u32, settings: OrchestratorSettings) -> BatchOrchestrator {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 25, 12, 0, 0).unwrap()));
        let quota = QuotaTracker::new(Arc::new(MemoryStore::new()), clock.clone(), chrono_tz::Europe::Paris, limit);
        BatchOrchestrator::new(Providers::from_client(studio), quota, clock, settings)
    }

    #[tokio::test]
    async fn test_submit_registers_and_verifies_batch() {
        let studio = FakeStudio::new(4);
        let orch = orchestrator(studio.clone(), 30, OrchestratorSettings::default());

        let batch = orch
            .submit(&FlyerBrief::default(), "acid", Mode::Fast)
            .await
            .unwrap();

        assert_eq!(batch.images.len(), 4);
        assert!(batch.verification.iter().all(VerificationStatus::is_ok));
        assert_eq!(orch.history().len(), 1);
        assert!(orch.pending().is_none());
        assert_eq!(orch.remaining(), 29);
        assert_eq!(
            orch.selection(),
            Some(Selection {
                batch_id: batch.id.clone(),
                index: 0
            })
        );
        assert_eq!(studio.verify_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_wrong_image_count_is_not_charged() {
        let studio = FakeStudio::new(3);
        let orch = orchestrator(studio, 30, OrchestratorSettings::default());

        let err = orch
            .submit(&FlyerBrief::default(), "", Mode::Fast)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Business(BusinessError::UnexpectedImageCount { expected: 4, actual: 3 })
        ));
        assert_eq!(orch.remaining(), 30);
        assert!(orch.history().is_empty());
        assert!(orch.pending().is_none());
        assert!(orch.selection().is_none());
    }

    #[tokio::test]
    async fn test_export_selected_uses_selected_image() {
        let studio = FakeStudio::new(4);
        let orch = orchestrator(studio, 30, OrchestratorSettings::default());
        let batch = orch
            .submit(&FlyerBrief::default(), "", Mode::Fast)
            .await
            .unwrap();

        orch.select(&batch.id, 2).unwrap();
        let payload = orch.export_selected().await.unwrap();
        assert_eq!(payload.post_data_url, "post:data:image/png;base64,img2");

        assert!(orch.select(&batch.id, 4).is_err());
        orch.clear_history();
        assert!(matches!(
            orch.export_selected().await.unwrap_err(),
            AppError::Business(BusinessError::NothingSelected)
        ));
    }

    #[tokio::test]
    async fn test_update_slot_ignores_removed_batch() {
        let studio = FakeStudio::new(4);
        let orch = orchestrator(studio, 30, OrchestratorSettings::default());
        let batch = orch
            .submit(&FlyerBrief::default(), "", Mode::Fast)
            .await
            .unwrap();

        orch.clear_history();
        assert!(!orch.update_slot(&batch.id, 0, VerificationStatus::Idle));
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlightGuard::acquire(&flag).unwrap();
            assert!(InFlightGuard::acquire(&flag).is_none());
        }
        assert!(InFlightGuard::acquire(&flag).is_some());
    }
}
