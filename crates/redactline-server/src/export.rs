//! Writing redacted documents and audit trails to disk

use chrono::{DateTime, Local};
use redactline_pii::AuditTrail;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File stem of the uploaded name, without any directory components
fn base_name(original_filename: &str) -> String {
    Path::new(original_filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("document")
        .to_string()
}

/// Text of a downloadable redacted document: a short header, a rule, then
/// the redacted body.
pub fn render_redacted_document(
    redacted_text: &str,
    original_filename: &str,
    generated: DateTime<Local>,
) -> String {
    format!(
        "REDACTED DOCUMENT\nGenerated: {}\nOriginal: {}\n{}\n\n{}",
        generated.format("%Y-%m-%d %H:%M:%S"),
        original_filename,
        "-".repeat(50),
        redacted_text
    )
}

/// Download name for a redacted document
pub fn redacted_filename(original_filename: &str) -> String {
    format!("{}_redacted.txt", base_name(original_filename))
}

/// Write `<base>_redacted_<timestamp>.txt` into `output_dir`
pub fn save_redacted_document(
    output_dir: impl AsRef<Path>,
    original_filename: &str,
    redacted_text: &str,
    now: DateTime<Local>,
) -> Result<PathBuf, ExportError> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let path = output_dir.join(format!(
        "{}_redacted_{}.txt",
        base_name(original_filename),
        now.format("%Y%m%d_%H%M%S")
    ));
    fs::write(
        &path,
        render_redacted_document(redacted_text, original_filename, now),
    )?;

    info!(path = %path.display(), "Saved redacted document");
    Ok(path)
}

/// Write `<base>_audit_<timestamp>.json` into `output_dir`
pub fn save_audit_trail(
    output_dir: impl AsRef<Path>,
    original_filename: &str,
    audit_trail: &AuditTrail,
    now: DateTime<Local>,
) -> Result<PathBuf, ExportError> {
    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir)?;

    let path = output_dir.join(format!(
        "{}_audit_{}.json",
        base_name(original_filename),
        now.format("%Y%m%d_%H%M%S")
    ));
    fs::write(&path, serde_json::to_string_pretty(audit_trail)?)?;

    info!(path = %path.display(), "Saved audit trail");
    Ok(path)
}
