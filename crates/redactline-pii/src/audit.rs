//! Audit trail for one redaction call

use crate::detector::HIGH_CONFIDENCE;
use crate::redactor::{RedactedItem, RedactionOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence at or above which a redacted item counts as medium
pub const MEDIUM_CONFIDENCE: f32 = 0.5;

/// Redacted item counts per confidence band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceBuckets {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ConfidenceBuckets {
    pub fn from_items(items: &[RedactedItem]) -> Self {
        let mut buckets = Self::default();
        for item in items {
            if item.confidence >= HIGH_CONFIDENCE {
                buckets.high += 1;
            } else if item.confidence >= MEDIUM_CONFIDENCE {
                buckets.medium += 1;
            } else {
                buckets.low += 1;
            }
        }
        buckets
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub total_redactions: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_confidence: ConfidenceBuckets,
}

/// What was redacted, when, and under which options.
///
/// Lengths count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub timestamp: DateTime<Utc>,
    pub redaction_options: RedactionOptions,
    pub original_length: usize,
    pub redacted_length: usize,
    pub redacted_items: Vec<RedactedItem>,
    pub summary: AuditSummary,
}

impl AuditTrail {
    pub fn new(
        timestamp: DateTime<Utc>,
        redaction_options: RedactionOptions,
        original_text: &str,
        redacted_text: &str,
        redacted_items: Vec<RedactedItem>,
    ) -> Self {
        let summary = AuditSummary {
            total_redactions: redacted_items.len(),
            by_type: count_by_type(&redacted_items),
            by_confidence: ConfidenceBuckets::from_items(&redacted_items),
        };

        Self {
            timestamp,
            redaction_options,
            original_length: original_text.chars().count(),
            redacted_length: redacted_text.chars().count(),
            redacted_items,
            summary,
        }
    }
}

/// Counts keyed by [`RedactedItem::type_key`]
pub(crate) fn count_by_type(items: &[RedactedItem]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.type_key().to_string()).or_insert(0) += 1;
    }
    counts
}
