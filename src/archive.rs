use std::io::{Cursor, Write};

use zip::ZipWriter;
use zip::write::FileOptions;

/// Build an in-memory ZIP archive from (filename, bytes) pairs.
pub fn build_zip(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, String> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut cursor);

        let options = FileOptions::<()>::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .unix_permissions(0o644);

        for (name, data) in files {
            zip.start_file(name.as_str(), options)
                .map_err(|e| format!("Failed to start ZIP entry: {e}"))?;
            zip.write_all(data)
                .map_err(|e| format!("Failed to write ZIP entry: {e}"))?;
        }

        zip.finish().map_err(|e| format!("Failed to finish ZIP: {e}"))?;
    }
    Ok(cursor.into_inner())
}

/// `order-inspection_2605.xlsx` -> `order-inspection_2605.zip`
pub fn zip_name_from(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.zip"),
        None => format!("{filename}.zip"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn archive_round_trips_entries() {
        let files = vec![
            ("a.xlsx".to_string(), b"workbook-bytes".to_vec()),
            ("b.pdf".to_string(), b"pdf-bytes".to_vec()),
        ];

        let bytes = build_zip(&files).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut entry = archive.by_name("b.pdf").unwrap();
        let mut out = Vec::new();
        entry.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"pdf-bytes");
    }

    #[test]
    fn zip_name_replaces_extension() {
        assert_eq!(zip_name_from("report_2605.xlsx"), "report_2605.zip");
        assert_eq!(zip_name_from("no-extension"), "no-extension.zip");
    }
}
