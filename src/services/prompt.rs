//! 海报生成提示词

use crate::models::GenerationRequest;

/// 未填写风格时的默认风格
pub const FALLBACK_VIBE: &str = "nightclub event poster";

/// 构建需要逐字渲染的文字块，空字段不出现
fn text_block(request: &GenerationRequest) -> String {
    let brief = &request.brief;
    let lines: [(&str, &str, bool); 8] = [
        ("TITLE", brief.title.as_str(), true),
        ("SUBTITLE", brief.subtitle.as_str(), false),
        ("DATE", brief.date.as_str(), true),
        ("TIME", brief.time.as_str(), false),
        ("VENUE", brief.venue.as_str(), true),
        ("CITY", brief.city.as_str(), false),
        ("PRICE", brief.price.as_str(), false),
        ("CTA", brief.cta.as_str(), false),
    ];

    lines
        .iter()
        .filter(|(_, value, always)| *always || !value.is_empty())
        .map(|(label, value, _)| format!("{}: \"{}\"", label, value))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 构建完整的海报提示词
pub fn build_poster_prompt(request: &GenerationRequest, variations: usize) -> String {
    let vibe = match request.vibe.trim() {
        "" => FALLBACK_VIBE,
        vibe => vibe,
    };

    [
        "Create a FULL nightlife event flyer poster (final artwork) in French.".to_string(),
        "Style must follow the user's vibe as the primary art direction.".to_string(),
        format!("User vibe / style: {}.", vibe),
        format!(
            "Generate {} DISTINCT design variations (composition, colors, motifs, typography style) while respecting the user's vibe.",
            variations
        ),
        "Each image must be a SINGLE poster (no collage, no grid, no multi-panel). One design per image.".to_string(),
        "Strictly forbid multi-tile or split layouts: no 2-up, 3-up, 4-up, montage, photo grid or repeated mini posters.".to_string(),
        "Full-bleed single composition only; one focal layout per image.".to_string(),
        format!(
            "Ensure the {} variations differ clearly from each other: change color palette, layout, focal subject/illustration, and typography treatment between images.",
            variations
        ),
        "Avoid producing near-duplicates; make each variation visibly unique at a glance.".to_string(),
        "Each image must be a SINGLE poster (no collage, no grid, no multi-panel). One design per image.".to_string(),
        "Use bold typography and clear hierarchy (title biggest).".to_string(),
        "VERY IMPORTANT: Render the following text EXACTLY as provided. Do not alter numbers, accents, or casing.".to_string(),
        "Do not add any extra words beyond the provided text.".to_string(),
        "High readability and strong contrast. No typos.".to_string(),
        "Keep date/time/venue/price/cta in a clean readable font block for OCR.".to_string(),
        "All critical text must stay inside a centered 4:5 safe area (it will be cropped to Instagram post 4:5).".to_string(),
        "TEXT TO RENDER (exact):".to_string(),
        text_block(request),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FlyerBrief, Mode};

    fn request(vibe: &str, brief: FlyerBrief) -> GenerationRequest {
        GenerationRequest {
            brief,
            vibe: vibe.to_string(),
            mode: Mode::Fast,
        }
    }

    #[test]
    fn test_prompt_lists_exact_text() {
        let prompt = build_poster_prompt(&request("acid rave", FlyerBrief::default()), 4);
        assert!(prompt.contains("User vibe / style: acid rave."));
        assert!(prompt.contains("Generate 4 DISTINCT"));
        assert!(prompt.contains("DATE: \"Samedi 28 mars\""));
        assert!(prompt.ends_with("CTA: \"Réserver\""));
    }

    #[test]
    fn test_prompt_asks_for_distinct_variations() {
        let prompt = build_poster_prompt(&request("acid rave", FlyerBrief::default()), 4);
        assert!(prompt.contains(
            "Ensure the 4 variations differ clearly from each other: change color palette, layout, focal subject/illustration, and typography treatment between images."
        ));
        assert!(prompt.contains("Avoid producing near-duplicates; make each variation visibly unique at a glance."));
        assert_eq!(prompt.matches("Each image must be a SINGLE poster").count(), 2);
    }

    #[test]
    fn test_empty_optional_fields_are_skipped() {
        let brief = FlyerBrief {
            subtitle: String::new(),
            price: String::new(),
            ..FlyerBrief::default()
        };
        let prompt = build_poster_prompt(&request("  ", brief), 4);
        assert!(prompt.contains(FALLBACK_VIBE));
        assert!(!prompt.contains("SUBTITLE:"));
        assert!(!prompt.contains("PRICE:"));
        assert!(prompt.contains("VENUE: \"Warehouse 13\""));
    }
}
