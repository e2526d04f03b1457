use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use uuid::Uuid;

/// One uploaded or generated file.
#[derive(Debug, Clone)]
pub struct NamedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Everything a generation run needs: the company workbook template and the
/// four input PDFs.
#[derive(Debug)]
pub struct EngineRequest {
    pub company_name: String,
    pub template: Vec<u8>,
    pub estimate: NamedFile,
    pub invoice: NamedFile,
    pub order_confirmation: NamedFile,
    pub delivery: NamedFile,
}

#[derive(Debug)]
pub struct EngineOutput {
    pub workbook: Vec<u8>,
    pub order_pdf: Vec<u8>,
    pub inspection_pdf: Vec<u8>,
}

#[derive(Debug)]
pub struct EngineError {
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
}

impl EngineError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            detail: None,
        }
    }

    fn with_detail(code: &str, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Document generation seam. The service never parses PDFs or edits
/// workbooks itself; production hands the work to an external converter
/// command, tests substitute a stub.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    async fn generate(&self, req: &EngineRequest) -> Result<EngineOutput, EngineError>;
}

/// Drives the external converter: inputs are staged in a scratch directory,
/// the command is invoked with their paths, and it reports the generated
/// artifact paths as JSON on stdout (`{"error": ...}` on failure).
pub struct CommandEngine {
    command: String,
}

#[derive(Deserialize)]
struct EngineReport {
    error: Option<String>,
    excel_path: Option<PathBuf>,
    order_pdf_path: Option<PathBuf>,
    inspection_pdf_path: Option<PathBuf>,
}

impl CommandEngine {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    async fn run_in(&self, work_dir: &Path, req: &EngineRequest) -> Result<EngineOutput, EngineError> {
        let template_path = work_dir.join("template.xlsx");
        let estimate_path = work_dir.join("estimate.pdf");
        let invoice_path = work_dir.join("invoice.pdf");
        let order_confirmation_path = work_dir.join("order_confirmation.pdf");
        let delivery_path = work_dir.join("delivery.pdf");

        for (path, data) in [
            (&template_path, &req.template),
            (&estimate_path, &req.estimate.data),
            (&invoice_path, &req.invoice.data),
            (&order_confirmation_path, &req.order_confirmation.data),
            (&delivery_path, &req.delivery.data),
        ] {
            tokio::fs::write(path, data).await.map_err(|e| {
                EngineError::new("ENGINE_IO", format!("Failed to stage input file: {e}"))
            })?;
        }

        let output = tokio::process::Command::new(&self.command)
            .arg(&req.company_name)
            .arg(&template_path)
            .arg(&estimate_path)
            .arg(&invoice_path)
            .arg(&order_confirmation_path)
            .arg(&delivery_path)
            .arg(work_dir)
            .output()
            .await
            .map_err(|e| {
                EngineError::new(
                    "ENGINE_SPAWN",
                    format!("Failed to start converter '{}': {e}", self.command),
                )
            })?;

        if !output.status.success() {
            return Err(EngineError::with_detail(
                "ENGINE_FAILED",
                format!("Converter exited with {}", output.status),
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let report: EngineReport = serde_json::from_slice(&output.stdout).map_err(|e| {
            EngineError::with_detail(
                "ENGINE_PROTOCOL",
                format!("Converter produced invalid output: {e}"),
                String::from_utf8_lossy(&output.stdout).into_owned(),
            )
        })?;

        if let Some(error) = report.error {
            return Err(EngineError::new("ENGINE_FAILED", error));
        }

        let (excel_path, order_path, inspection_path) = match (
            report.excel_path,
            report.order_pdf_path,
            report.inspection_pdf_path,
        ) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => {
                return Err(EngineError::new(
                    "ENGINE_PROTOCOL",
                    "Converter reported no artifact paths",
                ));
            }
        };

        let workbook = read_artifact(&excel_path).await?;
        let order_pdf = read_artifact(&order_path).await?;
        let inspection_pdf = read_artifact(&inspection_path).await?;

        Ok(EngineOutput {
            workbook,
            order_pdf,
            inspection_pdf,
        })
    }
}

async fn read_artifact(path: &Path) -> Result<Vec<u8>, EngineError> {
    tokio::fs::read(path).await.map_err(|e| {
        EngineError::new(
            "ENGINE_IO",
            format!("Failed to read generated artifact {}: {e}", path.display()),
        )
    })
}

#[async_trait]
impl DocumentEngine for CommandEngine {
    async fn generate(&self, req: &EngineRequest) -> Result<EngineOutput, EngineError> {
        let work_dir = std::env::temp_dir().join(format!("paperflow-{}", Uuid::now_v7()));
        tokio::fs::create_dir_all(&work_dir).await.map_err(|e| {
            EngineError::new("ENGINE_IO", format!("Failed to create scratch dir: {e}"))
        })?;

        let result = self.run_in(&work_dir, req).await;

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            tracing::warn!("Failed to clean up scratch dir {}: {e}", work_dir.display());
        }

        result
    }
}
