use std::collections::HashMap;

use axum::http::HeaderMap;
use bytes::Bytes;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Template uploads accept `.xlsx` workbooks only.
    pub fn is_xlsx(&self) -> bool {
        self.filename.to_lowercase().ends_with(".xlsx")
            || self.content_type.as_deref() == Some(XLSX_CONTENT_TYPE)
    }
}

#[derive(Debug, Default)]
pub struct MultipartUpload {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartUpload {
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }
}

/// Parse a multipart request body using multer. Parts with a filename land
/// in `files`, the rest are collected as text fields.
pub async fn parse_multipart(headers: &HeaderMap, body: Bytes) -> Result<MultipartUpload, String> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| "Missing multipart boundary".to_string())?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut upload = MultipartUpload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Multipart error: {e}"))?
    {
        let name = field.name().unwrap_or("unknown").to_string();

        if let Some(filename) = field.file_name().map(|s| s.to_string()) {
            let content_type = field.content_type().map(|m| m.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| format!("File read error: {e}"))?;
            upload.files.push(UploadedFile {
                field: name,
                filename,
                content_type,
                data: data.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| format!("Field read error: {e}"))?;
            upload.fields.insert(name, value);
        }
    }

    Ok(upload)
}
