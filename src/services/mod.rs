pub mod data_url;
pub mod export;
pub mod prompt;
pub mod quota;
pub mod sanitize;
pub mod text_match;

pub use quota::{week_start_at, QuotaState, QuotaTracker};
pub use sanitize::sanitize_text;
pub use text_match::{contains_loose, missing_fields};
