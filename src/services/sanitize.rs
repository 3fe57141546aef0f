//! 输入清洗
//!
//! 浏览器表单可能带回 HTML 实体（`&apos;`、`&#39;` 等），发给生成服务前还原。

const ENTITIES: &[(&str, char)] = &[
    ("&apos;", '\''),
    ("&#39;", '\''),
    ("&quot;", '"'),
    ("&#34;", '"'),
    ("&amp;", '&'),
    ("&#38;", '&'),
    ("&lt;", '<'),
    ("&#60;", '<'),
    ("&gt;", '>'),
    ("&#62;", '>'),
];

/// 还原常见 HTML 实体
///
/// 按表中顺序逐个替换，`&amp;lt;` 会被还原成 `<`。
pub fn decode_entities(value: &str) -> String {
    let mut decoded = value.to_string();
    for (entity, ch) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, &ch.to_string());
        }
    }
    decoded
}

/// 还原实体并去掉首尾空白
pub fn sanitize_text(value: &str) -> String {
    decode_entities(value).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_named_and_numeric_entities() {
        assert_eq!(decode_entities("L&apos;Usine &#39;24"), "L'Usine '24");
        assert_eq!(decode_entities("&quot;Live&#34;"), "\"Live\"");
        assert_eq!(decode_entities("&lt;3 &#62;"), "<3 >");
    }

    #[test]
    fn test_amp_is_decoded_before_lt() {
        assert_eq!(decode_entities("&amp;lt;"), "<");
    }

    #[test]
    fn test_sanitize_trims() {
        assert_eq!(sanitize_text("  Warehouse 13 \n"), "Warehouse 13");
        assert_eq!(sanitize_text(""), "");
    }
}
