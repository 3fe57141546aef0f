//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_orchestrator` - 批次编排器
//! - 单任务保护（同一时间只有一个生成请求）
//! - 配额检查与计数
//! - 待定批次 / 历史 / 选中状态
//! - 事件广播
//!
//! ### `history` - 历史批次
//! - 新批次插在最前，超出上限丢弃最旧的
//!
//! ## 层次关系
//!
//! ```text
//! batch_orchestrator (处理一次生成)
//!     ↓
//! workflow::VerifyFlow (逐张校验)
//!     ↓
//! clients (生成 / 校验 / 导出服务)
//! ```

pub mod batch_orchestrator;
pub mod history;

pub use batch_orchestrator::{BatchOrchestrator, OrchestratorSettings};
pub use history::BatchHistory;
