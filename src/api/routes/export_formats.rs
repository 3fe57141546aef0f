use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::api::error::RouteError;
use crate::models::{ExportPayload, ExportRequest};
use crate::services::export::export_formats as render_export_formats;

/// 缩放是 CPU 密集操作，放到阻塞线程池执行
pub async fn export_formats(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Json<ExportPayload>, RouteError> {
    let Json(request) = payload?;

    let exported = tokio::task::spawn_blocking(move || render_export_formats(&request.image_data_url))
        .await
        .map_err(|e| RouteError::Internal(format!("Export failed: {e}")))??;

    Ok(Json(exported))
}
