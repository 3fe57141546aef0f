//! 基础设施层
//!
//! 持有持久化与时间来源，只暴露能力

pub mod clock;
pub mod kv_store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use kv_store::{JsonFileStore, KeyValueStore, MemoryStore};
