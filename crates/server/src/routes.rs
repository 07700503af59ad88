//! HTTP handlers
//!
//! Three JSON/multipart endpoints: tab listing and row preview for the
//! sheet picker UI, and the batch generate endpoint that streams back a
//! zip archive. Rendering is CPU-bound, so generate hands the actual
//! work to a blocking task.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::sheets::SheetsClient;

pub struct AppState {
    pub sheets: SheetsClient,
}

pub async fn health() -> &'static str {
    "OK: Certificate backend running"
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabsRequest {
    #[serde(default)]
    sheet_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    #[serde(default)]
    sheet_id: Option<String>,
    #[serde(default)]
    range: Option<String>,
}

pub async fn sheet_tabs(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TabsRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let sheet_id = request.sheet_id.as_deref().map(str::trim).unwrap_or("");
    if sheet_id.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "sheetId required".to_string()));
    }

    let tabs = state.sheets.list_tabs(sheet_id).await.map_err(|e| {
        tracing::error!(error = %e, "tab listing failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;
    Ok(Json(serde_json::json!({ "tabs": tabs })))
}

pub async fn sheet_preview(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<batch::Preview>, (StatusCode, String)> {
    let sheet_id = request.sheet_id.as_deref().map(str::trim).unwrap_or("");
    let range = request.range.as_deref().map(str::trim).unwrap_or("");
    if sheet_id.is_empty() || range.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "sheetId and range required".to_string(),
        ));
    }

    let values = state
        .sheets
        .fetch_values(sheet_id, range)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "sheet preview fetch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e)
        })?;
    Ok(Json(batch::Preview::from_values(&values)))
}

/// Multipart form in, zip archive out. The form carries the template
/// upload, an optional font file, and the layout fields as plain text.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, (StatusCode, String)> {
    let mut template: Option<(Vec<u8>, String)> = None;
    let mut font_file: Option<Vec<u8>> = None;
    let mut fields: HashMap<String, String> = HashMap::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "template" => {
                // content_type must be read before bytes() consumes the field
                let content_type = field.content_type().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("failed to read template upload: {e}"),
                    )
                })?;
                template = Some((data.to_vec(), content_type));
            }
            "fontFile" => {
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("failed to read font upload: {e}"),
                    )
                })?;
                if !data.is_empty() {
                    font_file = Some(data.to_vec());
                }
            }
            _ => {
                let value = field.text().await.unwrap_or_default();
                fields.insert(name.clone(), value);
            }
        }
    }

    let Some((template_data, template_type)) = template else {
        return Err((
            StatusCode::BAD_REQUEST,
            "template file is required".to_string(),
        ));
    };

    let get = |key: &str| fields.get(key).map(String::as_str).unwrap_or("");

    let sheet_id = get("sheetId").trim().to_string();
    let range = get("range").trim().to_string();
    if sheet_id.is_empty() || range.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "sheetId and range required".to_string(),
        ));
    }

    let options = batch::RenderOptions {
        output_format: batch::OutputFormat::from_param(get("outputFormat")),
        mode: batch::Mode::from_param(get("mode")),
        page_index: num_or(get("pageIndex"), 0),
        x_rel: clamp01(num_or(get("xRel"), 0.5)),
        y_rel: clamp01(num_or(get("yRel"), 0.5)),
        color: non_empty_or(get("color"), "#000000"),
        font_size: num_or(get("fontSize"), 48.0),
        font_family: non_empty_or(get("fontFamily"), "sans-serif"),
        font_weight: num_or(get("fontWeight"), 700),
        letter_spacing: num_or(get("letterSpacing"), 0.0),
        filename_prefix: non_empty_or(get("filenamePrefix"), "CERT_"),
    };
    let name_column = get("nameColumn").trim().to_string();

    let values = state
        .sheets
        .fetch_values(&sheet_id, &range)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "sheet fetch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e)
        })?;
    let (_, rows) = batch::rows_to_objects(&values);

    let archive = tokio::task::spawn_blocking(move || {
        batch::render_archive(
            &template_data,
            &template_type,
            &rows,
            &name_column,
            &options,
            font_file.as_deref(),
        )
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "render task failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "render task failed".to_string(),
        )
    })?
    .map_err(|e| match e {
        batch::BatchError::ConfigError(message) => (StatusCode::BAD_REQUEST, message),
        other => {
            tracing::error!(error = %other, "batch render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    })?;

    Response::builder()
        .header("Content-Type", "application/zip")
        .header(
            "Content-Disposition",
            "attachment; filename=\"certificates.zip\"",
        )
        .body(Body::from(archive))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("response build failed: {e}"),
            )
        })
}

fn num_or<T: FromStr>(value: &str, default: T) -> T {
    value.trim().parse().unwrap_or(default)
}

fn non_empty_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}
