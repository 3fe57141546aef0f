//! OCR 文字匹配规则
//!
//! 判断识别出的文字里是否包含期望的字段：忽略大小写、忽略重音、
//! 合并连续空白后做子串包含；再退一步比较去掉所有空白后的子串。
//! 不做模糊匹配，"Samedi 28 mars" 不会匹配 "Sam. 28 mars"。

use unicode_normalization::UnicodeNormalization;

use crate::models::{ExpectedFields, MissingField};

/// 组合附加符号区间 U+0300..=U+036F
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// 小写、去重音、合并空白
pub fn normalize(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 宽松包含：空的 needle 总是匹配
pub fn contains_loose(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let h = normalize(haystack);
    let n = normalize(needle);
    if h.contains(&n) {
        return true;
    }
    let h_compact: String = h.chars().filter(|c| !c.is_whitespace()).collect();
    let n_compact: String = n.chars().filter(|c| !c.is_whitespace()).collect();
    h_compact.contains(&n_compact)
}

/// 找出识别文字中缺失的字段
///
/// 日期和场地必查；时间、价格、CTA 只在提供了非空值时检查。
/// 标题字体常被艺术化处理，不参与校验；城市也不参与。
pub fn missing_fields(text: &str, expected: &ExpectedFields) -> Vec<MissingField> {
    let mut missing = Vec::new();

    if !contains_loose(text, &expected.date) {
        missing.push(MissingField::Date);
    }
    if !contains_loose(text, &expected.venue) {
        missing.push(MissingField::Venue);
    }

    let optional = [
        (&expected.time, MissingField::Time),
        (&expected.price, MissingField::Price),
        (&expected.cta, MissingField::Cta),
    ];
    for (value, field) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            if !contains_loose(text, value) {
                missing.push(field);
            }
        }
    }

    missing
}
