use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Company;

// Every SELECT names its columns: the template bytea never rides along with
// list or detail reads.
const COMPANY_COLUMNS: &str = "id, name, display_name, is_active, match_patterns, \
     template_filename, template_updated_at, template_updated_by, created_at";

pub async fn list(pool: &PgPool) -> Result<Vec<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE is_active = TRUE ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub struct CompanyUpdate<'a> {
    pub name: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub is_active: Option<bool>,
    pub match_patterns: Option<&'a [String]>,
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    changes: &CompanyUpdate<'_>,
) -> Result<Company, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "UPDATE companies SET
             name = COALESCE($2, name),
             display_name = COALESCE($3, display_name),
             is_active = COALESCE($4, is_active),
             match_patterns = COALESCE($5, match_patterns)
         WHERE id = $1 RETURNING {COMPANY_COLUMNS}"
    ))
    .bind(id)
    .bind(changes.name)
    .bind(changes.display_name)
    .bind(changes.is_active)
    .bind(changes.match_patterns)
    .fetch_one(pool)
    .await
}

pub async fn store_template(
    pool: &PgPool,
    id: Uuid,
    data: &[u8],
    filename: &str,
    uploaded_by: Uuid,
) -> Result<Company, sqlx::Error> {
    sqlx::query_as::<_, Company>(&format!(
        "UPDATE companies SET
             template_excel = $2,
             template_filename = $3,
             template_updated_at = $4,
             template_updated_by = $5
         WHERE id = $1 RETURNING {COMPANY_COLUMNS}"
    ))
    .bind(id)
    .bind(data)
    .bind(filename)
    .bind(Utc::now())
    .bind(uploaded_by)
    .fetch_one(pool)
    .await
}

/// The stored workbook, or None when the company has no template yet.
pub async fn fetch_template(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<(Vec<u8>, String)>, sqlx::Error> {
    let row: Option<(Option<Vec<u8>>, Option<String>)> = sqlx::query_as(
        "SELECT template_excel, template_filename FROM companies WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some((Some(data), Some(filename))) => Some((data, filename)),
        _ => None,
    })
}

pub async fn has_template(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(bool,)> = sqlx::query_as(
        "SELECT template_excel IS NOT NULL FROM companies WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(b,)| b).unwrap_or(false))
}
