pub mod export_formats;
pub mod flyer_full;
pub mod verify_ocr;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
