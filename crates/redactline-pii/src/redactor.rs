//! PII redaction

use crate::audit::{count_by_type, AuditTrail};
use crate::detector::{Detection, PIIType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Fixed placeholder width when length is not preserved
const PLACEHOLDER_WIDTH: usize = 8;

/// How a redacted span is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedactionStyle {
    /// Replace with `█`
    #[default]
    BlackBars,

    /// Replace with `*`
    Asterisks,

    /// Replace with a type tag such as `[SSN_REDACTED]`
    Labels,
}

impl RedactionStyle {
    fn mask_char(&self) -> Option<char> {
        match self {
            RedactionStyle::BlackBars => Some('█'),
            RedactionStyle::Asterisks => Some('*'),
            RedactionStyle::Labels => None,
        }
    }
}

/// Options for one redaction call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedactionOptions {
    pub style: RedactionStyle,

    /// Mask styles repeat the mask character once per original character
    /// instead of emitting a fixed-width placeholder
    pub preserve_length: bool,

    /// Detections below this confidence are left untouched
    pub confidence_threshold: f32,
}

impl Default for RedactionOptions {
    fn default() -> Self {
        Self {
            style: RedactionStyle::BlackBars,
            preserve_length: true,
            confidence_threshold: 0.0,
        }
    }
}

/// Half-open byte range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// One applied substitution
///
/// `position` is the range the caller asked for. `applied` is the range that
/// was actually replaced in the text as left by the splices before it: the
/// caller's range clamped to that text and snapped down to char boundaries.
/// The two differ only for out-of-range, reversed, mid-character or
/// overlapping input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactedItem {
    pub original_text: String,
    #[serde(rename = "type")]
    pub pii_type: PIIType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    pub confidence: f32,
    pub position: Span,
    pub applied: Span,
    pub replacement: String,
}

impl RedactedItem {
    /// Type name for counting: the caller's own name for unrecognised types
    pub fn type_key(&self) -> &str {
        self.type_name
            .as_deref()
            .unwrap_or_else(|| self.pii_type.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionSummary {
    pub total_redactions: usize,
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedactionResult {
    pub redacted_text: String,
    pub redacted_items: Vec<RedactedItem>,
    pub audit_trail: AuditTrail,
    pub summary: RedactionSummary,
}

/// Tag used by [`RedactionStyle::Labels`]
fn type_label(pii_type: PIIType) -> &'static str {
    match pii_type {
        PIIType::Name => "[NAME_REDACTED]",
        PIIType::Email => "[EMAIL_REDACTED]",
        PIIType::Phone => "[PHONE_REDACTED]",
        PIIType::SSN => "[SSN_REDACTED]",
        PIIType::CreditCard => "[CARD_REDACTED]",
        PIIType::ZipCode => "[ZIP_REDACTED]",
        PIIType::DateOfBirth => "[DOB_REDACTED]",
        PIIType::Unknown => "[REDACTED]",
    }
}

/// Replacement text for one detection under `options`
pub fn replacement_for(original_text: &str, pii_type: PIIType, options: &RedactionOptions) -> String {
    match options.style.mask_char() {
        None => type_label(pii_type).to_string(),
        Some(mask) if options.preserve_length => {
            std::iter::repeat_n(mask, original_text.chars().count()).collect()
        }
        Some(mask) => std::iter::repeat_n(mask, PLACEHOLDER_WIDTH).collect(),
    }
}

/// Clamp a caller-supplied range to `text` and snap both ends down to char
/// boundaries, so the splice below can never panic.
fn clamp_span(text: &str, start: usize, end: usize) -> Span {
    let mut start = start.min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }

    let mut end = end.clamp(start, text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    Span { start, end }
}

/// Redact `detections` from `text`, stamping the audit trail with the
/// current time
pub fn redact(text: &str, detections: &[Detection], options: &RedactionOptions) -> RedactionResult {
    redact_at(text, detections, options, Utc::now())
}

/// Redact `detections` from `text` with an explicit audit timestamp.
///
/// Detections below `options.confidence_threshold` are dropped. The rest are
/// spliced in descending start order so earlier offsets stay valid. The
/// detections are trusted: overlapping ranges are not rejected, each splice
/// simply works on the text as left by the previous one.
///
/// With overlapping input the later splice can land inside a multi-byte
/// replacement from the earlier one. Its end then snaps down to a char
/// boundary, so a `█` mask (three bytes) may cover more or fewer characters
/// than the union of the input ranges. `"abcdefghij"` with `[0, 6)` and
/// `[4, 10)` yields twelve bars: the second splice replaces bytes `0..4`
/// (`"abcd"`) with six bars and leaves the six from the first splice
/// behind them. Resolve overlaps first (as the detection engine does) when
/// that matters.
pub fn redact_at(
    text: &str,
    detections: &[Detection],
    options: &RedactionOptions,
    timestamp: DateTime<Utc>,
) -> RedactionResult {
    let mut selected: Vec<&Detection> = detections
        .iter()
        .filter(|d| d.confidence >= options.confidence_threshold)
        .collect();
    selected.sort_by(|a, b| b.start.cmp(&a.start));

    let mut redacted_text = text.to_string();
    let mut redacted_items = Vec::with_capacity(selected.len());

    for detection in selected {
        let replacement = replacement_for(&detection.text, detection.pii_type, options);
        let applied = clamp_span(&redacted_text, detection.start, detection.end);

        redacted_text.replace_range(applied.start..applied.end, &replacement);

        redacted_items.push(RedactedItem {
            original_text: detection.text.clone(),
            pii_type: detection.pii_type,
            type_name: detection.type_name.clone(),
            confidence: detection.confidence,
            position: Span {
                start: detection.start,
                end: detection.end,
            },
            applied,
            replacement,
        });
    }

    debug!(
        candidates = detections.len(),
        redacted = redacted_items.len(),
        style = ?options.style,
        "applied redactions"
    );

    let summary = RedactionSummary {
        total_redactions: redacted_items.len(),
        by_type: count_by_type(&redacted_items),
    };
    let audit_trail = AuditTrail::new(
        timestamp,
        *options,
        text,
        &redacted_text,
        redacted_items.clone(),
    );

    RedactionResult {
        redacted_text,
        redacted_items,
        audit_trail,
        summary,
    }
}
