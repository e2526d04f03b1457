use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::archive;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::history::{FileSlot, HistoryFilters, SortOrder};
use crate::error::AppError;
use crate::models::STATUS_ERROR;
use crate::routes::companies::content_disposition;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct ListParams {
    pub company_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub sort_order: Option<String>,
}

pub async fn list(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Status values outside the known pair are ignored rather than rejected,
    // matching the permissive filter behavior of the SPA.
    let status = params
        .status
        .filter(|s| matches!(s.as_str(), "success" | "error"));

    let filters = HistoryFilters {
        company_id: params.company_id,
        user_id: params.user_id,
        status,
        date_from: params.date_from,
        date_to: params.date_to,
        sort_order: params.sort_order.as_deref().map(SortOrder::parse),
    };

    let history = db::history::list(&state.pool, &filters).await?;

    Ok(Json(json!({
        "history": history,
        "total": history.len(),
    })))
}

pub async fn download_file(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Path((id, file_type)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    let slot = FileSlot::parse(&file_type)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid file type: {file_type}")))?;

    let (data, filename) = db::history::fetch_file(&state.pool, id, slot)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, slot.content_type().to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&filename)),
        ],
        data,
    ))
}

pub async fn download_zip(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let bundle = db::history::fetch_bundle(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("History record not found".to_string()))?;

    if bundle.status == STATUS_ERROR {
        return Err(AppError::BadRequest(
            "Failed runs have no downloadable artifacts".to_string(),
        ));
    }

    if bundle.files.is_empty() {
        return Err(AppError::NotFound(
            "No downloadable files for this record".to_string(),
        ));
    }

    let zip_name = archive::zip_name_from(&bundle.files[0].0);
    let data = archive::build_zip(&bundle.files).map_err(AppError::Internal)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&zip_name)),
        ],
        data,
    ))
}
