//! Redactline PII Detection and Redaction
//!
//! This crate provides the detection-and-redaction pipeline:
//! - Pattern-based detection of emails, phones, SSNs, cards, ZIP codes,
//!   dates of birth and names, with overlap resolution
//! - Confidence-gated redaction in several styles
//! - An audit trail describing every substitution

pub mod audit;
pub mod detector;
pub mod error;
pub mod redactor;
pub mod risk;

pub use audit::{AuditSummary, AuditTrail, ConfidenceBuckets};
pub use detector::{
    detect, CandidateScan, CustomPattern, Detection, DetectionEngine, DetectionReport, DetectionSummary,
    DetectorConfig, PIIDetector, PIIPatternRule, PIIType, RegexPIIDetector, DEFAULT_RULES,
    HIGH_CONFIDENCE,
};
pub use error::PiiError;
pub use redactor::{
    redact, redact_at, replacement_for, RedactedItem, RedactionOptions, RedactionResult,
    RedactionStyle, RedactionSummary, Span,
};
pub use risk::{assess_risk, RiskAssessment, RiskLevel};
