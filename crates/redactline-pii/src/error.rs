//! Error types for detector construction

use crate::detector::PIIType;
use thiserror::Error;

/// Errors raised while building a detector from configuration.
///
/// Detection and redaction themselves never fail; only a bad custom rule
/// supplied by the caller is reported.
#[derive(Debug, Error)]
pub enum PiiError {
    #[error("Invalid pattern for {pii_type} rule: {source}")]
    InvalidPattern {
        pii_type: PIIType,
        #[source]
        source: regex::Error,
    },

    #[error("Confidence {confidence} for {pii_type} rule is outside [0, 1]")]
    InvalidConfidence { pii_type: PIIType, confidence: f32 },
}

pub type Result<T> = std::result::Result<T, PiiError>;
