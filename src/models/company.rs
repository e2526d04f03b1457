use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered business partner. `match_patterns` drives filename-based
/// detection of uploaded PDFs; the workbook template lives in a bytea column
/// that list queries never select.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub is_active: bool,
    pub match_patterns: Vec<String>,
    pub template_filename: Option<String>,
    pub template_updated_at: Option<DateTime<Utc>>,
    pub template_updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Company {
    /// Case-insensitive substring match against the detection patterns.
    pub fn matches_filename(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.match_patterns
            .iter()
            .any(|p| !p.is_empty() && lower.contains(&p.to_lowercase()))
    }
}
