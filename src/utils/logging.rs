/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{GenerationBatch, VerificationStatus};

/// 初始化日志
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，默认 info。
/// 重复调用不会报错（测试中可多次调用）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - {}", mode);
    info!(
        "📊 每周上限: {} | 每批图片: {} | OCR: {}",
        config.max_generations_per_week,
        config.images_per_batch,
        if config.ocr_enabled { "开启" } else { "关闭" }
    );
    info!("{}", "=".repeat(60));
}

/// 打印批次汇总
pub fn print_batch_summary(batch: &GenerationBatch, remaining: u32, limit: u32) {
    info!("\n{}", "=".repeat(60));
    info!("📦 批次 {} 完成", batch.id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "-".repeat(60));
    for (index, status) in batch.verification.iter().enumerate() {
        info!("  图片 {}: {}", index + 1, badge_text(status));
    }
    info!("{}", "-".repeat(60));
    info!("📉 本周剩余生成次数: {}/{}", remaining, limit);
    info!("{}", "=".repeat(60));
}

/// 单张图片的状态徽标文字
pub fn badge_text(status: &VerificationStatus) -> String {
    match status {
        VerificationStatus::Idle => "未校验".to_string(),
        VerificationStatus::Checking => "校验中…".to_string(),
        VerificationStatus::Ok { .. } => "✅ 已校验".to_string(),
        VerificationStatus::Bad { missing, .. } if missing.is_empty() => "❌ 待核对".to_string(),
        VerificationStatus::Bad { missing, .. } => {
            let names: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
            format!("❌ 待核对 ({})", names.join(", "))
        }
        VerificationStatus::Error { error } => format!("⚠️ OCR 错误: {}", error),
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MissingField;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("prévente", 3), "pré...");
        assert_eq!(truncate_text("court", 10), "court");
    }

    #[test]
    fn test_badge_lists_missing_fields() {
        let status = VerificationStatus::Bad {
            text: String::new(),
            missing: vec![MissingField::Date, MissingField::Venue],
        };
        assert_eq!(badge_text(&status), "❌ 待核对 (date, lieu)");
    }
}
