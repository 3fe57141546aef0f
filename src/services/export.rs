//! 社交媒体尺寸导出
//!
//! 居中裁切填满目标尺寸，输出 PNG。

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::error::AppResult;
use crate::models::ExportPayload;
use crate::services::data_url::{decode_data_url, png_data_url};

/// 导出尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Instagram 帖子 4:5
pub const POST_FORMAT: ExportFormat = ExportFormat {
    name: "post",
    width: 1080,
    height: 1350,
};

/// Instagram 快拍 9:16
pub const STORY_FORMAT: ExportFormat = ExportFormat {
    name: "story",
    width: 1080,
    height: 1920,
};

/// 裁切缩放到指定尺寸并编码为 PNG
pub fn render_format(source: &DynamicImage, format: ExportFormat) -> AppResult<Vec<u8>> {
    let resized = source.resize_to_fill(format.width, format.height, FilterType::Lanczos3);
    let mut buffer = Cursor::new(Vec::new());
    resized.write_to(&mut buffer, ImageFormat::Png)?;
    debug!(
        "导出 {} ({}x{}): {} 字节",
        format.name,
        format.width,
        format.height,
        buffer.get_ref().len()
    );
    Ok(buffer.into_inner())
}

/// 从 data URL 生成帖子与快拍两种尺寸
pub fn export_formats(image_data_url: &str) -> AppResult<ExportPayload> {
    let bytes = decode_data_url(image_data_url)?;
    let source = image::load_from_memory(&bytes)?;

    let post = render_format(&source, POST_FORMAT)?;
    let story = render_format(&source, STORY_FORMAT)?;

    Ok(ExportPayload {
        post_data_url: png_data_url(&post),
        story_data_url: png_data_url(&story),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    fn sample_data_url(width: u32, height: u32) -> String {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 30, 120, 255]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        png_data_url(buffer.get_ref())
    }

    #[test]
    fn test_exports_both_sizes() {
        let payload = export_formats(&sample_data_url(64, 96)).unwrap();

        let post = image::load_from_memory(&decode_data_url(&payload.post_data_url).unwrap()).unwrap();
        let story = image::load_from_memory(&decode_data_url(&payload.story_data_url).unwrap()).unwrap();
        assert_eq!(post.dimensions(), (1080, 1350));
        assert_eq!(story.dimensions(), (1080, 1920));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(export_formats("not a data url").is_err());
        assert!(export_formats("data:image/png;base64,aGVsbG8=").is_err());
    }
}
