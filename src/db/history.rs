use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::HistoryRecord;

const LIST_COLUMNS: &str = "p.id, p.user_id, u.email AS user_email, p.company_id, \
     c.name AS company_name, p.process_date, p.excel_filename, p.order_pdf_filename, \
     p.inspection_pdf_filename, p.input_pdf_1_filename, p.input_pdf_2_filename, \
     p.input_pdf_3_filename, p.input_pdf_4_filename, p.processing_time, p.status, \
     p.error_message, p.error_code, p.error_detail, p.created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Self {
        match s {
            "asc" => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Default)]
pub struct HistoryFilters {
    pub company_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub sort_order: Option<SortOrder>,
}

pub async fn list(
    pool: &PgPool,
    filters: &HistoryFilters,
) -> Result<Vec<HistoryRecord>, sqlx::Error> {
    let order = filters.sort_order.unwrap_or(SortOrder::Desc).as_sql();

    sqlx::query_as::<_, HistoryRecord>(&format!(
        "SELECT {LIST_COLUMNS}
         FROM processed_files p
         JOIN users u ON u.id = p.user_id
         JOIN companies c ON c.id = p.company_id
         WHERE ($1::uuid IS NULL OR p.company_id = $1)
           AND ($2::uuid IS NULL OR p.user_id = $2)
           AND ($3::text IS NULL OR p.status = $3)
           AND ($4::date IS NULL OR p.process_date >= $4)
           AND ($5::date IS NULL OR p.process_date <= $5)
         ORDER BY p.created_at {order}"
    ))
    .bind(filters.company_id)
    .bind(filters.user_id)
    .bind(filters.status.as_deref())
    .bind(filters.date_from)
    .bind(filters.date_to)
    .fetch_all(pool)
    .await
}

/// Artifact slots addressable by the download endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSlot {
    Excel,
    OrderPdf,
    InspectionPdf,
    InputPdf1,
    InputPdf2,
    InputPdf3,
    InputPdf4,
}

impl FileSlot {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "excel" => Some(FileSlot::Excel),
            "order_pdf" => Some(FileSlot::OrderPdf),
            "inspection_pdf" => Some(FileSlot::InspectionPdf),
            "input_pdf_1" => Some(FileSlot::InputPdf1),
            "input_pdf_2" => Some(FileSlot::InputPdf2),
            "input_pdf_3" => Some(FileSlot::InputPdf3),
            "input_pdf_4" => Some(FileSlot::InputPdf4),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            FileSlot::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            _ => "application/pdf",
        }
    }

    fn columns(self) -> (&'static str, &'static str) {
        match self {
            FileSlot::Excel => ("excel_file", "excel_filename"),
            FileSlot::OrderPdf => ("order_pdf", "order_pdf_filename"),
            FileSlot::InspectionPdf => ("inspection_pdf", "inspection_pdf_filename"),
            FileSlot::InputPdf1 => ("input_pdf_1", "input_pdf_1_filename"),
            FileSlot::InputPdf2 => ("input_pdf_2", "input_pdf_2_filename"),
            FileSlot::InputPdf3 => ("input_pdf_3", "input_pdf_3_filename"),
            FileSlot::InputPdf4 => ("input_pdf_4", "input_pdf_4_filename"),
        }
    }
}

/// One artifact blob plus its filename, or None when the record or the slot
/// is empty.
pub async fn fetch_file(
    pool: &PgPool,
    id: Uuid,
    slot: FileSlot,
) -> Result<Option<(Vec<u8>, String)>, sqlx::Error> {
    let (data_col, name_col) = slot.columns();

    let row: Option<(Option<Vec<u8>>, Option<String>)> = sqlx::query_as(&format!(
        "SELECT {data_col}, {name_col} FROM processed_files WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((Some(data), Some(filename))) => Some((data, filename)),
        _ => None,
    })
}

pub struct BundleFiles {
    pub status: String,
    pub files: Vec<(String, Vec<u8>)>,
}

/// The three output artifacts of a run, for the ZIP download. Error rows come
/// back with their status and an empty file list so the caller can refuse.
pub async fn fetch_bundle(pool: &PgPool, id: Uuid) -> Result<Option<BundleFiles>, sqlx::Error> {
    type Row = (
        String,
        Option<Vec<u8>>,
        Option<String>,
        Option<Vec<u8>>,
        Option<String>,
        Option<Vec<u8>>,
        Option<String>,
    );

    let row: Option<Row> = sqlx::query_as(
        "SELECT status, excel_file, excel_filename, order_pdf, order_pdf_filename,
                inspection_pdf, inspection_pdf_filename
         FROM processed_files WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    let Some((status, excel, excel_name, order, order_name, inspection, inspection_name)) = row
    else {
        return Ok(None);
    };

    let mut files = Vec::new();
    for (data, name) in [
        (excel, excel_name),
        (order, order_name),
        (inspection, inspection_name),
    ] {
        if let (Some(data), Some(name)) = (data, name) {
            files.push((name, data));
        }
    }

    Ok(Some(BundleFiles { status, files }))
}

pub struct NewHistoryRecord<'a> {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub process_date: NaiveDate,
    pub input_pdfs: [Option<(&'a str, &'a [u8])>; 4],
    pub excel: Option<(&'a str, &'a [u8])>,
    pub order_pdf: Option<(&'a str, &'a [u8])>,
    pub inspection_pdf: Option<(&'a str, &'a [u8])>,
    pub processing_time: i32,
    pub status: &'a str,
    pub error_message: Option<&'a str>,
    pub error_code: Option<&'a str>,
    pub error_detail: Option<&'a str>,
}

pub async fn insert(pool: &PgPool, rec: &NewHistoryRecord<'_>) -> Result<Uuid, sqlx::Error> {
    let (id,): (Uuid,) = sqlx::query_as(
        "INSERT INTO processed_files (
             user_id, company_id, process_date,
             input_pdf_1, input_pdf_1_filename, input_pdf_2, input_pdf_2_filename,
             input_pdf_3, input_pdf_3_filename, input_pdf_4, input_pdf_4_filename,
             excel_file, excel_filename, order_pdf, order_pdf_filename,
             inspection_pdf, inspection_pdf_filename,
             processing_time, status, error_message, error_code, error_detail
         ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                   $16, $17, $18, $19, $20, $21, $22)
         RETURNING id",
    )
    .bind(rec.user_id)
    .bind(rec.company_id)
    .bind(rec.process_date)
    .bind(rec.input_pdfs[0].map(|(_, d)| d))
    .bind(rec.input_pdfs[0].map(|(n, _)| n))
    .bind(rec.input_pdfs[1].map(|(_, d)| d))
    .bind(rec.input_pdfs[1].map(|(n, _)| n))
    .bind(rec.input_pdfs[2].map(|(_, d)| d))
    .bind(rec.input_pdfs[2].map(|(n, _)| n))
    .bind(rec.input_pdfs[3].map(|(_, d)| d))
    .bind(rec.input_pdfs[3].map(|(n, _)| n))
    .bind(rec.excel.map(|(_, d)| d))
    .bind(rec.excel.map(|(n, _)| n))
    .bind(rec.order_pdf.map(|(_, d)| d))
    .bind(rec.order_pdf.map(|(n, _)| n))
    .bind(rec.inspection_pdf.map(|(_, d)| d))
    .bind(rec.inspection_pdf.map(|(n, _)| n))
    .bind(rec.processing_time)
    .bind(rec.status)
    .bind(rec.error_message)
    .bind(rec.error_code)
    .bind(rec.error_detail)
    .fetch_one(pool)
    .await?;

    Ok(id)
}
