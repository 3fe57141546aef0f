use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::api::error::RouteError;
use crate::api::state::AppState;
use crate::clients::ImageGenerationParams;
use crate::error::AppError;
use crate::models::{GenerationPayload, GenerationRequest};
use crate::services::data_url::png_data_url_from_base64;
use crate::services::prompt::build_poster_prompt;

const IMAGE_SIZE: &str = "1024x1536";
const OUTPUT_FORMAT: &str = "png";

pub async fn flyer_full(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationPayload>, RouteError> {
    let client = state
        .openai
        .as_ref()
        .ok_or_else(|| AppError::missing_credential("OPENAI_API_KEY"))?;
    let Json(request) = payload?;

    let prompt = build_poster_prompt(&request, state.images_per_batch);
    let params = ImageGenerationParams {
        model: client.model(),
        prompt: &prompt,
        n: state.images_per_batch,
        size: IMAGE_SIZE,
        quality: request.mode.quality(),
        output_format: OUTPUT_FORMAT,
    };

    let encoded = client.generate(&params).await.map_err(RouteError::from_upstream)?;
    if encoded.is_empty() {
        return Err(RouteError::BadGateway("No images returned from API".to_string()));
    }

    info!("✓ flyer-full 返回 {} 张图片", encoded.len());
    let images = encoded.iter().map(|b64| png_data_url_from_base64(b64)).collect();
    Ok(Json(GenerationPayload { images }))
}
