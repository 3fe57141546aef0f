use serde::{Deserialize, Serialize};

use crate::models::verification::VerificationStatus;

/// 一次生成请求产生的图片批次
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationBatch {
    pub id: String,
    /// 创建时间（Unix 毫秒）
    pub created_at: i64,
    pub vibe: String,
    /// 图片 data URL；生成完成前为空字符串占位
    pub images: Vec<String>,
    /// 与 `images` 按下标一一对应
    pub verification: Vec<VerificationStatus>,
}

impl GenerationBatch {
    /// 创建带占位图的待定批次
    pub fn pending(
        id: impl Into<String>,
        created_at: i64,
        vibe: impl Into<String>,
        slots: usize,
        initial: VerificationStatus,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            vibe: vibe.into(),
            images: vec![String::new(); slots],
            verification: vec![initial; slots],
        }
    }

    /// 是否仍有占位图
    pub fn is_pending(&self) -> bool {
        self.images.iter().any(|img| img.is_empty())
    }

    /// 用真实图片替换占位
    pub fn resolve(&mut self, images: Vec<String>, initial: VerificationStatus) {
        self.verification = vec![initial; images.len()];
        self.images = images;
    }

    /// 更新某张图片的校验状态
    ///
    /// 下标越界或该槽位已是终态时返回 false。
    pub fn set_status(&mut self, index: usize, status: VerificationStatus) -> bool {
        match self.verification.get_mut(index) {
            Some(slot) if !slot.is_terminal() => {
                *slot = status;
                true
            }
            _ => false,
        }
    }

    pub fn image(&self, index: usize) -> Option<&str> {
        self.images
            .get(index)
            .map(String::as_str)
            .filter(|img| !img.is_empty())
    }
}

/// 当前选中的图片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub batch_id: String,
    pub index: usize,
}

/// 批次状态变化事件（供界面订阅）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// 已创建占位批次，正在等待生成服务
    Pending { batch_id: String },
    /// 图片已返回，占位被替换
    Resolved { batch_id: String, images: usize },
    /// 某张图片校验完成
    SlotUpdated {
        batch_id: String,
        index: usize,
        status: VerificationStatus,
    },
    /// 生成失败，批次被丢弃
    Failed { batch_id: String, message: String },
    /// 历史已清空
    HistoryCleared,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_batch_has_placeholder_slots() {
        let batch = GenerationBatch::pending("b1", 0, "vibe", 4, VerificationStatus::Checking);
        assert_eq!(batch.images, vec![""; 4]);
        assert!(batch.is_pending());
        assert_eq!(batch.image(0), None);
    }

    #[test]
    fn test_terminal_slot_is_never_overwritten() {
        let mut batch = GenerationBatch::pending("b1", 0, "", 2, VerificationStatus::Checking);
        batch.resolve(vec!["a".into(), "b".into()], VerificationStatus::Checking);

        assert!(batch.set_status(0, VerificationStatus::Error { error: "boom".into() }));
        assert!(!batch.set_status(0, VerificationStatus::Checking));
        assert!(!batch.set_status(5, VerificationStatus::Idle));
        assert!(batch.verification[0].is_error());
    }
}
