//! 图片校验流程 - 流程层
//!
//! 核心职责：把一个批次的图片按下标顺序逐张送去 OCR 校验
//!
//! - 一次只发一个请求，上一张结束才开始下一张
//! - 单张失败只记为该张的 `Error`，不影响后面的图片
//! - 每张的结果通过回调交给调用方写回状态

use std::sync::Arc;

use tracing::{info, warn};

use crate::clients::VerificationProvider;
use crate::models::{ExpectedFields, GenerationBatch, VerificationStatus, VerifyRequest};

/// 单张图片的校验任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyTask {
    /// 图片在批次中的下标
    pub index: usize,
    pub image: String,
}

/// 校验统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerifySummary {
    pub ok: usize,
    pub bad: usize,
    pub error: usize,
}

impl VerifySummary {
    fn record(&mut self, status: &VerificationStatus) {
        match status {
            VerificationStatus::Ok { .. } => self.ok += 1,
            VerificationStatus::Bad { .. } => self.bad += 1,
            VerificationStatus::Error { .. } => self.error += 1,
            VerificationStatus::Idle | VerificationStatus::Checking => {}
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.bad + self.error
    }
}

/// 图片校验流程
pub struct VerifyFlow {
    verifier: Arc<dyn VerificationProvider>,
}

impl VerifyFlow {
    pub fn new(verifier: Arc<dyn VerificationProvider>) -> Self {
        Self { verifier }
    }

    /// 为批次中尚未得出结论且已有图片的槽位生成任务
    pub fn tasks_for(batch: &GenerationBatch) -> Vec<VerifyTask> {
        batch
            .images
            .iter()
            .zip(&batch.verification)
            .enumerate()
            .filter(|(_, (image, status))| !image.is_empty() && !status.is_terminal())
            .map(|(index, (image, _))| VerifyTask {
                index,
                image: image.clone(),
            })
            .collect()
    }

    /// 依次校验所有任务
    ///
    /// 每张图片的结果都会立即交给 `on_result`。
    pub async fn run<F>(
        &self,
        tasks: Vec<VerifyTask>,
        expected: &ExpectedFields,
        mut on_result: F,
    ) -> VerifySummary
    where
        F: FnMut(usize, VerificationStatus) + Send,
    {
        let mut summary = VerifySummary::default();
        let total = tasks.len();

        for (position, task) in tasks.into_iter().enumerate() {
            info!("🔍 OCR 校验第 {}/{} 张 (图片 #{})", position + 1, total, task.index + 1);
            let status = self.verify_one(&task, expected).await;
            summary.record(&status);
            on_result(task.index, status);
        }

        info!(
            "✓ OCR 校验完成: 通过 {} | 待核对 {} | 出错 {}",
            summary.ok, summary.bad, summary.error
        );
        summary
    }

    /// 校验单张图片，任何失败都转成 `Error` 状态
    pub async fn verify_one(&self, task: &VerifyTask, expected: &ExpectedFields) -> VerificationStatus {
        let request = VerifyRequest {
            image_data_url: task.image.clone(),
            expected: expected.clone(),
        };

        match self.verifier.verify(&request).await {
            Ok(payload) if payload.is_valid => VerificationStatus::Ok {
                text: payload.text,
                missing: payload.missing,
            },
            Ok(payload) => VerificationStatus::Bad {
                text: payload.text,
                missing: payload.missing,
            },
            Err(e) => {
                warn!("⚠️ 图片 #{} OCR 校验失败: {}", task.index + 1, e);
                VerificationStatus::Error {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use crate::models::{FlyerBrief, MissingField, VerifyPayload};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 记录调用顺序与并发数的假校验服务
    #[derive(Default)]
    struct ScriptedVerifier {
        fail_on: Vec<String>,
        calls: Mutex<Vec<String>>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    #[async_trait]
    impl VerificationProvider for ScriptedVerifier {
        async fn verify(&self, request: &VerifyRequest) -> AppResult<VerifyPayload> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.calls.lock().unwrap().push(request.image_data_url.clone());
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.fail_on.contains(&request.image_data_url) {
                return Err(AppError::bad_response("/api/verify-ocr", 500, "OCR failed"));
            }
            let missing = if request.image_data_url.ends_with("bad") {
                vec![MissingField::Price]
            } else {
                Vec::new()
            };
            Ok(VerifyPayload {
                text: "SAMEDI 28 MARS".to_string(),
                is_valid: missing.is_empty(),
                missing,
            })
        }
    }

    fn resolved_batch(images: &[&str]) -> GenerationBatch {
        let mut batch = GenerationBatch::pending("b1", 0, "", images.len(), VerificationStatus::Checking);
        batch.resolve(
            images.iter().map(|s| s.to_string()).collect(),
            VerificationStatus::Checking,
        );
        batch
    }

    #[tokio::test]
    async fn test_failure_on_one_image_is_isolated() {
        let verifier = Arc::new(ScriptedVerifier {
            fail_on: vec!["img-2".to_string()],
            ..Default::default()
        });
        let flow = VerifyFlow::new(verifier.clone());
        let mut batch = resolved_batch(&["img-0", "img-1-bad", "img-2", "img-3"]);
        let expected = FlyerBrief::default().expected_fields();

        let tasks = VerifyFlow::tasks_for(&batch);
        let summary = flow
            .run(tasks, &expected, |index, status| {
                batch.set_status(index, status);
            })
            .await;

        assert_eq!(summary, VerifySummary { ok: 2, bad: 1, error: 1 });
        assert!(batch.verification[0].is_ok());
        assert!(matches!(batch.verification[1], VerificationStatus::Bad { .. }));
        assert!(batch.verification[2].is_error());
        assert!(batch.verification[3].is_ok());
    }

    #[tokio::test]
    async fn test_runs_strictly_in_index_order_one_at_a_time() {
        let verifier = Arc::new(ScriptedVerifier::default());
        let flow = VerifyFlow::new(verifier.clone());
        let batch = resolved_batch(&["a", "b", "c", "d"]);

        let mut seen = Vec::new();
        flow.run(
            VerifyFlow::tasks_for(&batch),
            &ExpectedFields::default(),
            |index, _| seen.push(index),
        )
        .await;

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(*verifier.calls.lock().unwrap(), vec!["a", "b", "c", "d"]);
        assert_eq!(verifier.max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_task_list_makes_no_calls() {
        let verifier = Arc::new(ScriptedVerifier::default());
        let flow = VerifyFlow::new(verifier.clone());

        let summary = tokio_test::block_on(flow.run(Vec::new(), &ExpectedFields::default(), |_, _| {}));

        assert_eq!(summary.total(), 0);
        assert!(verifier.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tasks_skip_terminal_and_placeholder_slots() {
        let mut batch = resolved_batch(&["a", "b", "c"]);
        batch.set_status(1, VerificationStatus::Error { error: "x".into() });
        batch.images[2].clear();

        let tasks = VerifyFlow::tasks_for(&batch);
        assert_eq!(
            tasks,
            vec![VerifyTask {
                index: 0,
                image: "a".to_string()
            }]
        );
    }
}
