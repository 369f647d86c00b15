//! PII detectors

mod catalog;
mod overlap;
mod regex_detector;

pub use catalog::{DEFAULT_RULES, PIIPatternRule};
pub use overlap::resolve_overlaps;
pub use regex_detector::RegexPIIDetector;

use crate::error::Result;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Confidence at or above which a detection counts as high confidence
pub const HIGH_CONFIDENCE: f32 = 0.8;

/// Types of PII that can be detected
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PIIType {
    /// Email address
    Email,

    /// Phone number
    Phone,

    /// Social Security Number
    #[serde(rename = "ssn")]
    SSN,

    /// Credit card number
    CreditCard,

    /// US ZIP code, optionally ZIP+4
    ZipCode,

    /// Date of birth in MM/DD/YYYY or MM-DD-YYYY form
    DateOfBirth,

    /// Person name (two or three words)
    Name,

    /// Any type this crate does not know about
    #[default]
    #[serde(other)]
    Unknown,
}

impl PIIType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PIIType::Email => "email",
            PIIType::Phone => "phone",
            PIIType::SSN => "ssn",
            PIIType::CreditCard => "credit_card",
            PIIType::ZipCode => "zip_code",
            PIIType::DateOfBirth => "date_of_birth",
            PIIType::Name => "name",
            PIIType::Unknown => "unknown",
        }
    }

    /// Parse a wire name such as `"credit_card"`
    pub fn from_name(name: &str) -> Option<Self> {
        [
            PIIType::Email,
            PIIType::Phone,
            PIIType::SSN,
            PIIType::CreditCard,
            PIIType::ZipCode,
            PIIType::DateOfBirth,
            PIIType::Name,
            PIIType::Unknown,
        ]
        .into_iter()
        .find(|t| t.as_str() == name)
    }
}

impl fmt::Display for PIIType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PII detection result
///
/// `start` and `end` are byte offsets into the scanned text, so
/// `text == &source[start..end]` for every detection the engine returns.
///
/// Deserialization is lenient so callers can hand back edited records:
/// a missing `confidence` is 0, a missing `end` is `start + text.len()`,
/// and a missing or unrecognised `type` becomes [`PIIType::Unknown`]. An
/// unrecognised type string is kept in `type_name` so audit records can
/// report what the caller asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DetectionRecord")]
pub struct Detection {
    /// The detected text
    pub text: String,

    /// Type of PII detected
    #[serde(rename = "type")]
    pub pii_type: PIIType,

    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,

    /// Start position in the text
    pub start: usize,

    /// End position in the text
    pub end: usize,

    /// Caller-supplied type that did not name a known [`PIIType`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
}

impl Detection {
    /// Whether the two half-open ranges share at least one byte
    pub fn overlaps(&self, other: &Detection) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= HIGH_CONFIDENCE
    }

    /// Whether this detection describes a non-empty slice of `source`
    pub fn is_well_formed(&self, source: &str) -> bool {
        self.start < self.end
            && source
                .get(self.start..self.end)
                .is_some_and(|slice| slice == self.text)
    }
}

#[derive(Deserialize)]
struct DetectionRecord {
    #[serde(default)]
    text: String,
    #[serde(default, rename = "type")]
    pii_type: Option<String>,
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    start: usize,
    #[serde(default)]
    end: Option<usize>,
}

impl From<DetectionRecord> for Detection {
    fn from(record: DetectionRecord) -> Self {
        let end = record
            .end
            .unwrap_or_else(|| record.start.saturating_add(record.text.len()));

        let (pii_type, unrecognised) = match record.pii_type {
            None => (PIIType::Unknown, None),
            Some(name) => match PIIType::from_name(&name) {
                Some(pii_type) => (pii_type, None),
                None => (PIIType::Unknown, Some(name)),
            },
        };

        Self {
            text: record.text,
            pii_type,
            confidence: record.confidence,
            start: record.start,
            end,
            type_name: record.type_name.or(unrecognised),
        }
    }
}

/// Aggregate statistics over a detection list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub total_detections: usize,
    pub high_confidence: usize,
    pub by_type: BTreeMap<PIIType, usize>,
}

impl DetectionSummary {
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut by_type = BTreeMap::new();
        for detection in detections {
            *by_type.entry(detection.pii_type).or_insert(0) += 1;
        }

        Self {
            total_detections: detections.len(),
            high_confidence: detections.iter().filter(|d| d.is_high_confidence()).count(),
            by_type,
        }
    }
}

/// Conflict-free detections for one text plus their summary
///
/// `skipped_rules` lists the rule types that ran over their time budget and
/// contributed nothing; when it is non-empty the detections are partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub detections: Vec<Detection>,
    pub summary: DetectionSummary,
    #[serde(default)]
    pub skipped_rules: Vec<PIIType>,
}

impl DetectionReport {
    pub fn is_complete(&self) -> bool {
        self.skipped_rules.is_empty()
    }
}

/// Raw output of one detector over one text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateScan {
    pub candidates: Vec<Detection>,

    /// Types of rules that gave up before finishing
    pub skipped_rules: Vec<PIIType>,
}

/// Trait for a source of raw PII candidates
///
/// Candidates from one detector may overlap candidates from another; the
/// [`DetectionEngine`] resolves conflicts across all of them.
pub trait PIIDetector: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Raw, unresolved matches in the given text
    fn candidates(&self, text: &str) -> Vec<Detection>;

    /// Candidates plus the rules that could not finish.
    ///
    /// Detectors that never give up can rely on the default.
    fn scan(&self, text: &str) -> CandidateScan {
        CandidateScan {
            candidates: self.candidates(text),
            skipped_rules: Vec::new(),
        }
    }

    /// Get the types of PII this detector can find
    fn supported_types(&self) -> Vec<PIIType>;
}

/// Configuration for the regex detector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Catalog rules to leave out
    pub disabled_types: Vec<PIIType>,

    /// Extra rules, applied after the catalog
    pub custom_patterns: Vec<CustomPattern>,

    /// Wall-clock budget for scanning one rule, in milliseconds.
    ///
    /// 0 (the default) disables it. Matching is linear in the text length,
    /// so a fixed budget only ever cuts off large documents; when set, any
    /// rule that runs over is reported in [`DetectionReport::skipped_rules`].
    pub rule_time_budget_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            disabled_types: Vec::new(),
            custom_patterns: Vec::new(),
            rule_time_budget_ms: 0,
        }
    }
}

/// Custom regex pattern for detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    /// Type reported for matches
    pub pii_type: PIIType,

    /// Regex pattern (matched case-insensitively)
    pub pattern: String,

    /// Confidence score for matches
    pub confidence: f32,
}

/// Runs a list of detectors and resolves their candidates into one
/// non-overlapping list.
///
/// Detector order matters: candidates are merged in detector order before
/// the stable sort, so among equal-confidence overlaps the earlier
/// detector's match survives.
#[derive(Clone)]
pub struct DetectionEngine {
    detectors: Vec<Arc<dyn PIIDetector>>,
}

impl DetectionEngine {
    /// An engine with no detectors; add them with [`with_detector`](Self::with_detector)
    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// An engine backed by a regex detector built from `config`
    pub fn from_config(config: DetectorConfig) -> Result<Self> {
        let detector = RegexPIIDetector::new(config)?;
        Ok(Self::empty().with_detector(Arc::new(detector)))
    }

    pub fn with_detector(mut self, detector: Arc<dyn PIIDetector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn supported_types(&self) -> Vec<PIIType> {
        let mut types: Vec<PIIType> = self
            .detectors
            .iter()
            .flat_map(|d| d.supported_types())
            .collect();
        types.sort();
        types.dedup();
        types
    }

    /// Detect PII in `text`
    pub fn detect(&self, text: &str) -> DetectionReport {
        if text.is_empty() {
            return DetectionReport::default();
        }

        let mut candidates = Vec::new();
        let mut skipped_rules = Vec::new();
        for detector in &self.detectors {
            let scan = detector.scan(text);
            let total = scan.candidates.len();
            let before = candidates.len();
            candidates.extend(
                scan.candidates
                    .into_iter()
                    .filter(|d| d.is_well_formed(text)),
            );
            debug!(
                detector = detector.name(),
                candidates = total,
                malformed = total - (candidates.len() - before),
                skipped = scan.skipped_rules.len(),
                "collected PII candidates"
            );
            skipped_rules.extend(scan.skipped_rules);
        }
        skipped_rules.sort();
        skipped_rules.dedup();

        let detections = resolve_overlaps(candidates);
        let summary = DetectionSummary::from_detections(&detections);

        DetectionReport {
            detections,
            summary,
            skipped_rules,
        }
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::empty().with_detector(Arc::new(RegexPIIDetector::with_default_rules()))
    }
}

static DEFAULT_ENGINE: Lazy<DetectionEngine> = Lazy::new(DetectionEngine::default);

/// Detect PII in `text` with the built-in pattern catalog
pub fn detect(text: &str) -> DetectionReport {
    DEFAULT_ENGINE.detect(text)
}
