use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::Company;
use crate::state::SharedState;
use crate::upload;

#[derive(Deserialize)]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
    pub match_patterns: Option<Vec<String>>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let companies = db::companies::list(&state.pool).await?;

    Ok(Json(json!({
        "companies": companies,
        "total": companies.len(),
    })))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    auth.require_admin()?;

    let company = db::companies::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    Ok(Json(company))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    if req.name.is_none()
        && req.display_name.is_none()
        && req.is_active.is_none()
        && req.match_patterns.is_none()
    {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    if req.name.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(AppError::BadRequest("Company name must not be blank".to_string()));
    }
    if req
        .display_name
        .as_deref()
        .is_some_and(|s| s.trim().is_empty())
    {
        return Err(AppError::BadRequest("Display name must not be blank".to_string()));
    }

    db::companies::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    let company = db::companies::update(
        &state.pool,
        id,
        &db::companies::CompanyUpdate {
            name: req.name.as_deref(),
            display_name: req.display_name.as_deref(),
            is_active: req.is_active,
            match_patterns: req.match_patterns.as_deref(),
        },
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "company.updated",
        "company",
        Some(id),
        None,
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "company": company,
    })))
}

pub async fn upload_template(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    auth.require_admin()?;

    let parsed = upload::parse_multipart(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let file = parsed
        .file("file")
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    if !file.is_xlsx() {
        return Err(AppError::BadRequest(
            "Only Excel (.xlsx) templates can be uploaded".to_string(),
        ));
    }

    db::companies::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    let company = db::companies::store_template(
        &state.pool,
        id,
        &file.data,
        &file.filename,
        auth.user_id,
    )
    .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "company.template_uploaded",
        "company",
        Some(id),
        Some(json!({ "filename": file.filename })),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Template uploaded",
        "filename": company.template_filename,
        "updated_at": company.template_updated_at,
    })))
}

pub async fn download_template(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    auth.require_admin()?;

    db::companies::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    let (data, filename) = db::companies::fetch_template(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, upload::XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&filename),
            ),
        ],
        data,
    ))
}

/// RFC 5987 encoding so non-ASCII filenames survive the header.
pub fn content_disposition(filename: &str) -> String {
    let encoded: String = filename
        .bytes()
        .flat_map(|b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_') {
                vec![b as char]
            } else {
                format!("%{b:02X}").chars().collect()
            }
        })
        .collect();
    format!("attachment; filename*=UTF-8''{encoded}")
}
