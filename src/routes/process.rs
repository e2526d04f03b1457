use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::history::NewHistoryRecord;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Company, STATUS_ERROR, STATUS_SUCCESS};
use crate::process::engine::{EngineRequest, NamedFile};
use crate::process::{self, DocKind, SlotState};
use crate::state::SharedState;
use crate::upload::{self, MultipartUpload, UploadedFile};

fn parse_slots(parsed: &MultipartUpload) -> Result<Vec<SlotState>, AppError> {
    match parsed.field("slots") {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| AppError::BadRequest(format!("Invalid slots payload: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn slot_filenames(slots: &[SlotState]) -> Vec<&str> {
    slots
        .iter()
        .filter_map(|s| s.filename.as_deref())
        .collect()
}

async fn detection_response(
    state: &SharedState,
    company: &Company,
    slots: Vec<SlotState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pre_check = process::pre_check(&slots);
    let needs_template = !db::companies::has_template(&state.pool, company.id).await?;

    Ok(Json(json!({
        "success": true,
        "company": company,
        "slots": slots,
        "pre_check": pre_check,
        "needs_template": needs_template,
    })))
}

/// Classify a batch of uploaded PDFs: which company they belong to and which
/// document slot each one fills.
pub async fn detect(
    _auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let parsed = upload::parse_multipart(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    if parsed.files.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()));
    }

    let existing = parse_slots(&parsed)?;

    let companies = db::companies::list_active(&state.pool).await?;

    let new_names: Vec<&str> = parsed.files.iter().map(|f| f.filename.as_str()).collect();
    let mut all_names = slot_filenames(&existing);
    all_names.extend(new_names.iter().copied());

    let company = process::detect_company(&companies, &all_names)?.clone();

    let slots = process::assign_slots(&existing, &new_names)?;

    detection_response(&state, &company, slots).await
}

/// Re-upload one document into a named slot.
pub async fn upload_single(
    _auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let parsed = upload::parse_multipart(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let file = parsed
        .file("file")
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let target = parsed
        .field("target_kind")
        .and_then(DocKind::parse)
        .ok_or_else(|| AppError::BadRequest("Unknown target document kind".to_string()))?;

    let existing = parse_slots(&parsed)?;

    let companies = db::companies::list_active(&state.pool).await?;

    let mut all_names = slot_filenames(&existing);
    all_names.push(&file.filename);
    let company = process::detect_company(&companies, &all_names)?.clone();

    let slots = process::assign_single_slot(&existing, &file.filename, target)?;

    detection_response(&state, &company, slots).await
}

/// First-run template upload from the processing screen.
pub async fn upload_template(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let parsed = upload::parse_multipart(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let file = parsed
        .file("file")
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let company_id = parsed
        .field("company_id")
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::BadRequest("company_id is required".to_string()))?;

    if !file.is_xlsx() {
        return Err(AppError::BadRequest(
            "Only Excel (.xlsx) templates can be uploaded".to_string(),
        ));
    }

    let company = db::companies::find_by_id(&state.pool, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    if !process::template_matches_company(&company, &file.filename) {
        return Err(AppError::BadRequest(format!(
            "Template filename does not mention {}",
            company.display_name
        )));
    }

    db::companies::store_template(&state.pool, company.id, &file.data, &file.filename, auth.user_id)
        .await?;

    audit::log_event(
        &state.pool,
        Some(auth.user_id),
        "company.template_uploaded",
        "company",
        Some(company.id),
        Some(json!({ "filename": file.filename, "via": "process" })),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Template uploaded",
        "filename": file.filename,
    })))
}

fn required_pdf<'a>(
    parsed: &'a MultipartUpload,
    field: &str,
) -> Result<&'a UploadedFile, AppError> {
    parsed
        .file(field)
        .ok_or_else(|| AppError::BadRequest(format!("Missing file field: {field}")))
}

fn named(file: &UploadedFile) -> NamedFile {
    NamedFile {
        filename: file.filename.clone(),
        data: file.data.clone(),
    }
}

/// Run the converter over the four input PDFs and record the outcome. Both
/// success and failure leave a history row; only the response status differs.
pub async fn execute(
    auth: AuthUser,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let parsed = upload::parse_multipart(&headers, body)
        .await
        .map_err(AppError::BadRequest)?;

    let company_id = parsed
        .field("company_id")
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| AppError::BadRequest("company_id is required".to_string()))?;

    let estimate = required_pdf(&parsed, "pdf_estimate")?;
    let invoice = required_pdf(&parsed, "pdf_invoice")?;
    let order_confirmation = required_pdf(&parsed, "pdf_order_confirmation")?;
    let delivery = required_pdf(&parsed, "pdf_delivery")?;

    let company = db::companies::find_by_id(&state.pool, company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company not found".to_string()))?;

    let (template, _) = db::companies::fetch_template(&state.pool, company.id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("No template uploaded for this company".to_string())
        })?;

    let request = EngineRequest {
        company_name: company.name.clone(),
        template,
        estimate: named(estimate),
        invoice: named(invoice),
        order_confirmation: named(order_confirmation),
        delivery: named(delivery),
    };

    let started = Instant::now();
    let result = state.engine.generate(&request).await;
    let processing_time = started.elapsed().as_secs() as i32;

    let today = Utc::now().date_naive();
    let input_pdfs: [Option<(&str, &[u8])>; 4] = [
        Some((estimate.filename.as_str(), estimate.data.as_slice())),
        Some((invoice.filename.as_str(), invoice.data.as_slice())),
        Some((
            order_confirmation.filename.as_str(),
            order_confirmation.data.as_slice(),
        )),
        Some((delivery.filename.as_str(), delivery.data.as_slice())),
    ];

    match result {
        Ok(output) => {
            let year_month = Utc::now().format("%y%m").to_string();
            let excel_filename =
                format!("{} order-inspection_{year_month}.xlsx", company.display_name);
            let order_pdf_filename = format!("order_{year_month}.pdf");
            let inspection_pdf_filename = format!("inspection_{year_month}.pdf");

            let process_id = db::history::insert(
                &state.pool,
                &NewHistoryRecord {
                    user_id: auth.user_id,
                    company_id: company.id,
                    process_date: today,
                    input_pdfs,
                    excel: Some((&excel_filename, &output.workbook)),
                    order_pdf: Some((&order_pdf_filename, &output.order_pdf)),
                    inspection_pdf: Some((&inspection_pdf_filename, &output.inspection_pdf)),
                    processing_time,
                    status: STATUS_SUCCESS,
                    error_message: None,
                    error_code: None,
                    error_detail: None,
                },
            )
            .await?;

            audit::log_event(
                &state.pool,
                Some(auth.user_id),
                "process.executed",
                "processed_file",
                Some(process_id),
                Some(json!({ "company_id": company.id, "status": STATUS_SUCCESS })),
            )
            .await;

            Ok(Json(json!({
                "success": true,
                "process_id": process_id,
                "company_name": company.name,
                "year_month": year_month,
                "excel_filename": excel_filename,
                "order_pdf_filename": order_pdf_filename,
                "inspection_pdf_filename": inspection_pdf_filename,
            })))
        }
        Err(err) => {
            let process_id = db::history::insert(
                &state.pool,
                &NewHistoryRecord {
                    user_id: auth.user_id,
                    company_id: company.id,
                    process_date: today,
                    input_pdfs,
                    excel: None,
                    order_pdf: None,
                    inspection_pdf: None,
                    processing_time,
                    status: STATUS_ERROR,
                    error_message: Some(&err.message),
                    error_code: Some(&err.code),
                    error_detail: err.detail.as_deref(),
                },
            )
            .await?;

            audit::log_event(
                &state.pool,
                Some(auth.user_id),
                "process.executed",
                "processed_file",
                Some(process_id),
                Some(json!({ "company_id": company.id, "status": STATUS_ERROR })),
            )
            .await;

            Err(AppError::BadRequest(format!(
                "Processing failed: {}",
                err.message
            )))
        }
    }
}
