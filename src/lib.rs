//! # Flyer Studio
//!
//! 夜店活动海报生成工作室：按文案生成多张海报，逐张 OCR 校验关键信息，
//! 并导出社交媒体尺寸。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 键值存储与时间来源，只暴露能力
//! - `KeyValueStore` - 配额持久化（内存 / JSON 文件）
//! - `Clock` - 当前时间（系统时钟 / 固定时钟）
//!
//! ### ② 业务能力层（Services / Clients）
//! - `services/` - 纯逻辑：配额、文字清洗、OCR 匹配、提示词、尺寸导出
//! - `clients/` - 外部服务：工作室服务端、OpenAI 图片、Google Vision
//!
//! ### ③ 流程层（Workflow）
//! - `VerifyFlow` - 按下标顺序逐张校验一个批次
//!
//! ### ④ 编排层（Orchestration）
//! - `BatchOrchestrator` - 单任务保护、配额、待定批次、历史、事件
//!
//! ### 服务端（API）
//! - `api/` - `/api/flyer-full`、`/api/verify-ocr`、`/api/export-formats`
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::{App, GenerateOptions, QuotaReport};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{
    BatchEvent, ExpectedFields, FlyerBrief, GenerationBatch, MissingField, Mode, Selection,
    VerificationStatus,
};
pub use orchestrator::{BatchOrchestrator, OrchestratorSettings};
pub use services::QuotaTracker;
pub use workflow::{VerifyFlow, VerifySummary};
