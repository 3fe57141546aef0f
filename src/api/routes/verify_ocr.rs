use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::{debug, info};

use crate::api::error::RouteError;
use crate::api::state::AppState;
use crate::error::AppError;
use crate::models::{VerifyPayload, VerifyRequest};
use crate::services::data_url::extract_base64;
use crate::services::text_match::missing_fields;
use crate::utils::truncate_text;

pub async fn verify_ocr(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyPayload>, RouteError> {
    let client = state
        .vision
        .as_ref()
        .ok_or_else(|| AppError::missing_credential("GOOGLE_VISION_API_KEY"))?;
    let Json(request) = payload?;

    let content = extract_base64(&request.image_data_url)?;
    let text = client.detect_text(content).await?;
    debug!("OCR 文字: {}", truncate_text(&text, 80));
    let missing = missing_fields(&text, &request.expected);

    info!("✓ verify-ocr 完成，缺失字段 {} 个", missing.len());
    Ok(Json(VerifyPayload {
        is_valid: missing.is_empty(),
        text,
        missing,
    }))
}
