use std::collections::VecDeque;

use crate::models::GenerationBatch;

/// 最近生成的批次（新的在前，超出上限时丢弃最旧的）
#[derive(Debug, Clone)]
pub struct BatchHistory {
    depth: usize,
    batches: VecDeque<GenerationBatch>,
}

impl BatchHistory {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            depth,
            batches: VecDeque::with_capacity(depth),
        }
    }

    /// 插入到最前面，返回被挤出去的批次
    pub fn push_front(&mut self, batch: GenerationBatch) -> Vec<GenerationBatch> {
        self.batches.push_front(batch);
        let mut evicted = Vec::new();
        while self.batches.len() > self.depth {
            if let Some(oldest) = self.batches.pop_back() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    pub fn get(&self, batch_id: &str) -> Option<&GenerationBatch> {
        self.batches.iter().find(|b| b.id == batch_id)
    }

    pub fn get_mut(&mut self, batch_id: &str) -> Option<&mut GenerationBatch> {
        self.batches.iter_mut().find(|b| b.id == batch_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationBatch> {
        self.batches.iter()
    }

    pub fn latest(&self) -> Option<&GenerationBatch> {
        self.batches.front()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }

    pub fn to_vec(&self) -> Vec<GenerationBatch> {
        self.batches.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VerificationStatus;

    fn batch(id: &str) -> GenerationBatch {
        GenerationBatch::pending(id, 0, "", 4, VerificationStatus::Idle)
    }

    #[test]
    fn test_eleventh_batch_evicts_oldest() {
        let mut history = BatchHistory::new(10);
        for i in 0..10 {
            assert!(history.push_front(batch(&format!("b{i}"))).is_empty());
        }

        let evicted = history.push_front(batch("b10"));
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "b0");
        assert_eq!(history.len(), 10);
        assert_eq!(history.latest().map(|b| b.id.as_str()), Some("b10"));
        let ids: Vec<_> = history.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids.last().map(String::as_str), Some("b1"));
    }

    #[test]
    fn test_single_slot_history_keeps_latest_only() {
        let mut history = BatchHistory::new(1);
        history.push_front(batch("first"));
        history.push_front(batch("second"));
        assert_eq!(history.len(), 1);
        assert!(history.get("first").is_none());
        assert!(history.get("second").is_some());
    }

    #[test]
    fn test_clear() {
        let mut history = BatchHistory::new(3);
        history.push_front(batch("a"));
        history.clear();
        assert!(history.is_empty());
    }
}
