//! Upload validation and text extraction

use crate::config::UploadConfig;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("No file selected")]
    MissingFilename,

    #[error("File type not supported: {0}")]
    UnsupportedType(String),

    #[error("File size {size} exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
}

/// Lowercased extension of `filename`, if it has one
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Check name and size against the upload policy, returning the file type
pub fn validate_upload(
    filename: &str,
    size: usize,
    policy: &UploadConfig,
) -> Result<String, ExtractError> {
    if filename.trim().is_empty() {
        return Err(ExtractError::MissingFilename);
    }

    let file_type = file_extension(filename)
        .ok_or_else(|| ExtractError::UnsupportedType(filename.to_string()))?;

    if !policy
        .allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&file_type))
    {
        return Err(ExtractError::UnsupportedType(file_type));
    }

    if size > policy.max_file_size {
        return Err(ExtractError::TooLarge {
            size,
            limit: policy.max_file_size,
        });
    }

    Ok(file_type)
}

/// Decode an uploaded document into text.
///
/// Returns `None` when there is no text to analyze: unreadable formats,
/// PDFs that fail to parse and whitespace-only content all count. Plain text
/// is decoded as UTF-8 with a Latin-1 fallback; PDF text is concatenated page
/// by page. The result is trimmed.
pub fn extract_text(bytes: &[u8], file_type: &str) -> Option<String> {
    let text = match file_type {
        "txt" | "text" | "md" | "csv" | "log" => decode_text(bytes),
        "pdf" => extract_pdf(bytes)?,
        other => {
            warn!(file_type = other, "No text extractor for file type");
            return None;
        }
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            debug!(valid_up_to = e.valid_up_to(), "Upload is not UTF-8, decoding as Latin-1");
            bytes.iter().map(|&b| char::from(b)).collect()
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Option<String> {
    let document = match lopdf::Document::load_mem(bytes) {
        Ok(document) => document,
        Err(e) => {
            warn!(error = %e, "Failed to parse PDF");
            return None;
        }
    };

    let mut text = String::new();
    for page_number in document.get_pages().into_keys() {
        match document.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to extract PDF page text");
                return None;
            }
        }
    }

    debug!(chars = text.chars().count(), "Extracted PDF text");
    Some(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn policy() -> UploadConfig {
        UploadConfig {
            max_file_size: 16,
            allowed_extensions: vec!["txt".to_string()],
        }
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("notes.TXT"), Some("txt".to_string()));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_validate_upload() {
        assert_eq!(validate_upload("a.txt", 10, &policy()), Ok("txt".to_string()));
        assert_eq!(
            validate_upload("", 10, &policy()),
            Err(ExtractError::MissingFilename)
        );
        assert_eq!(
            validate_upload("scan.pdf", 10, &policy()),
            Err(ExtractError::UnsupportedType("pdf".to_string()))
        );
        assert_eq!(
            validate_upload("a.txt", 17, &policy()),
            Err(ExtractError::TooLarge { size: 17, limit: 16 })
        );
    }

    #[test]
    fn test_extract_utf8() {
        let text = extract_text("  Café owner: Zoë  \n".as_bytes(), "txt");
        assert_eq!(text.as_deref(), Some("Café owner: Zoë"));
    }

    #[test]
    fn test_extract_latin1_fallback() {
        // "Café" in Latin-1
        let text = extract_text(&[0x43, 0x61, 0x66, 0xE9], "txt");
        assert_eq!(text.as_deref(), Some("Café"));
    }

    #[test]
    fn test_extract_whitespace_only() {
        assert_eq!(extract_text(b" \n\t ", "txt"), None);
    }

    #[test]
    fn test_extract_unsupported_type() {
        assert_eq!(extract_text(b"PK\x03\x04", "docx"), None);
    }

    /// One-page PDF showing `line` in Courier
    pub(crate) fn pdf_with_text(line: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Document, Object, Stream, dictionary};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_extract_pdf_text() {
        let bytes = pdf_with_text("SSN 123-45-6789");
        let text = extract_text(&bytes, "pdf").unwrap();
        assert!(text.contains("123-45-6789"), "{text:?}");
    }

    #[test]
    fn test_extract_broken_pdf() {
        assert_eq!(extract_text(b"%PDF-1.7 truncated", "pdf"), None);
        assert_eq!(extract_text(b"", "pdf"), None);
    }
}
