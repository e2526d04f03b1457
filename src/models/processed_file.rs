use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_ERROR: &str = "error";

/// A processing-history row as returned by the listing endpoint: joined with
/// the submitting user's email and the company name, blob columns excluded.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub process_date: NaiveDate,
    pub excel_filename: Option<String>,
    pub order_pdf_filename: Option<String>,
    pub inspection_pdf_filename: Option<String>,
    pub input_pdf_1_filename: Option<String>,
    pub input_pdf_2_filename: Option<String>,
    pub input_pdf_3_filename: Option<String>,
    pub input_pdf_4_filename: Option<String>,
    pub processing_time: Option<i32>,
    pub status: String,
    pub error_message: Option<String>,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
}
