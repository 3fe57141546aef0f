pub mod verify_flow;

pub use verify_flow::{VerifyFlow, VerifySummary, VerifyTask};
