pub mod engine;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Company;

/// The four input documents a monthly run needs, one per slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocKind {
    Estimate,
    Invoice,
    OrderConfirmation,
    Delivery,
}

pub const ALL_KINDS: [DocKind; 4] = [
    DocKind::Estimate,
    DocKind::Invoice,
    DocKind::OrderConfirmation,
    DocKind::Delivery,
];

impl DocKind {
    pub fn parse(s: &str) -> Option<DocKind> {
        match s {
            "estimate" => Some(DocKind::Estimate),
            "invoice" => Some(DocKind::Invoice),
            "order_confirmation" => Some(DocKind::OrderConfirmation),
            "delivery" => Some(DocKind::Delivery),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocKind::Estimate => "estimate",
            DocKind::Invoice => "invoice",
            DocKind::OrderConfirmation => "order confirmation",
            DocKind::Delivery => "delivery note",
        }
    }

    /// Classify a filename by keyword. The order-confirmation keywords are
    /// checked before the invoice ones: 請書 is a substring trap for 請求
    /// documents in the partner naming schemes.
    pub fn detect(filename: &str) -> Option<DocKind> {
        let lower = filename.to_lowercase();

        if lower.contains("請書") || lower.contains("order") {
            return Some(DocKind::OrderConfirmation);
        }
        if lower.contains("見積") || lower.contains("estimate") {
            return Some(DocKind::Estimate);
        }
        if lower.contains("請求") || lower.contains("invoice") {
            return Some(DocKind::Invoice);
        }
        if lower.contains("納品") || lower.contains("delivery") {
            return Some(DocKind::Delivery);
        }

        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Empty,
    Uploaded,
}

/// Per-kind upload state. Only filenames travel between detect calls; the
/// client re-sends the actual files on execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotState {
    pub kind: DocKind,
    pub filename: Option<String>,
    pub status: SlotStatus,
}

impl SlotState {
    fn empty(kind: DocKind) -> Self {
        Self {
            kind,
            filename: None,
            status: SlotStatus::Empty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheck {
    pub passed: bool,
    pub errors: Vec<String>,
    pub missing: Vec<DocKind>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DetectError {
    /// Files match more than one company.
    CompanyMismatch,
    /// No active company matches any filename.
    UndetectableCompany,
    /// A filename matched none of the kind keywords.
    UnknownKind(String),
    /// A single-slot upload whose detected kind differs from the target.
    KindMismatch { filename: String, expected: DocKind },
}

impl DetectError {
    pub fn message(&self) -> String {
        match self {
            DetectError::CompanyMismatch => {
                "Uploaded files belong to more than one company".to_string()
            }
            DetectError::UndetectableCompany => {
                "Could not detect a company from the uploaded filenames".to_string()
            }
            DetectError::UnknownKind(name) => {
                format!("Could not detect the document kind of '{name}'")
            }
            DetectError::KindMismatch { filename, expected } => {
                format!("'{filename}' does not look like a {} document", expected.label())
            }
        }
    }
}

impl From<DetectError> for AppError {
    fn from(err: DetectError) -> Self {
        AppError::BadRequest(err.message())
    }
}

/// Detect the owning company across a set of filenames. Every file that
/// matches some company must match the same one.
pub fn detect_company<'a>(
    companies: &'a [Company],
    filenames: &[&str],
) -> Result<&'a Company, DetectError> {
    let mut detected: Option<&Company> = None;

    for filename in filenames {
        let matched = companies
            .iter()
            .filter(|c| c.is_active)
            .find(|c| c.matches_filename(filename));

        if let Some(company) = matched {
            match detected {
                Some(prev) if prev.id != company.id => {
                    return Err(DetectError::CompanyMismatch);
                }
                _ => detected = Some(company),
            }
        }
    }

    detected.ok_or(DetectError::UndetectableCompany)
}

/// Fold newly uploaded filenames into the slot set, classifying each by kind.
pub fn assign_slots(
    existing: &[SlotState],
    filenames: &[&str],
) -> Result<Vec<SlotState>, DetectError> {
    let mut slots: Vec<SlotState> = ALL_KINDS.iter().map(|&k| SlotState::empty(k)).collect();

    for prev in existing {
        if let Some(filename) = &prev.filename {
            if let Some(slot) = slots.iter_mut().find(|s| s.kind == prev.kind) {
                slot.filename = Some(filename.clone());
                slot.status = SlotStatus::Uploaded;
            }
        }
    }

    for filename in filenames {
        let kind = DocKind::detect(filename)
            .ok_or_else(|| DetectError::UnknownKind(filename.to_string()))?;

        let slot = slots
            .iter_mut()
            .find(|s| s.kind == kind)
            .expect("every kind has a slot");
        slot.filename = Some(filename.to_string());
        slot.status = SlotStatus::Uploaded;
    }

    Ok(slots)
}

/// Place one file into a named slot; its detected kind must agree.
pub fn assign_single_slot(
    existing: &[SlotState],
    filename: &str,
    target: DocKind,
) -> Result<Vec<SlotState>, DetectError> {
    match DocKind::detect(filename) {
        Some(kind) if kind == target => {}
        _ => {
            return Err(DetectError::KindMismatch {
                filename: filename.to_string(),
                expected: target,
            });
        }
    }

    let mut slots = assign_slots(existing, &[])?;
    let slot = slots
        .iter_mut()
        .find(|s| s.kind == target)
        .expect("every kind has a slot");
    slot.filename = Some(filename.to_string());
    slot.status = SlotStatus::Uploaded;
    Ok(slots)
}

/// Verify all four slots are filled before a run.
pub fn pre_check(slots: &[SlotState]) -> PreCheck {
    let missing: Vec<DocKind> = ALL_KINDS
        .iter()
        .copied()
        .filter(|kind| {
            !slots
                .iter()
                .any(|s| s.kind == *kind && s.status == SlotStatus::Uploaded)
        })
        .collect();

    let mut errors = Vec::new();
    if !missing.is_empty() {
        let labels: Vec<&str> = missing.iter().map(|k| k.label()).collect();
        errors.push(format!("Missing files: {}", labels.join(", ")));
    }

    PreCheck {
        passed: errors.is_empty(),
        errors,
        missing,
    }
}

/// Template filenames must mention the company they are uploaded for.
pub fn template_matches_company(company: &Company, filename: &str) -> bool {
    let lower = filename.to_lowercase();
    lower.contains(&company.name.to_lowercase())
        || lower.contains(&company.display_name.to_lowercase())
        || company.matches_filename(filename)
}
