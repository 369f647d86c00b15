//! Regex-based PII detector implementation

use crate::detector::{
    CandidateScan, CustomPattern, DEFAULT_RULES, Detection, DetectorConfig, PIIDetector, PIIType,
};
use crate::error::{PiiError, Result};
use regex::{Regex, RegexBuilder};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Compiled form of one pattern rule
struct CompiledRule {
    pii_type: PIIType,
    regex: Regex,
    confidence: f32,
}

/// Regex-based PII detector
///
/// Applies the built-in catalog (minus disabled types) followed by any custom
/// patterns. When a time budget is configured each rule is scanned under it
/// independently; a rule that runs over contributes nothing for that call
/// and is reported as skipped while the others still report.
pub struct RegexPIIDetector {
    rules: Vec<CompiledRule>,
    time_budget: Option<Duration>,
}

impl RegexPIIDetector {
    /// Create a new regex-based PII detector with the given configuration
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let mut rules = compile_catalog(&config.disabled_types);

        for pattern in &config.custom_patterns {
            rules.push(compile_custom(pattern)?);
        }

        Ok(Self {
            rules,
            time_budget: time_budget(config.rule_time_budget_ms),
        })
    }

    /// Detector with the full catalog and no time budget
    pub fn with_default_rules() -> Self {
        let config = DetectorConfig::default();
        Self {
            rules: compile_catalog(&config.disabled_types),
            time_budget: time_budget(config.rule_time_budget_ms),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Collect every match of one rule, or `None` if the deadline passed
    /// before the scan finished.
    fn scan_rule(
        &self,
        rule: &CompiledRule,
        text: &str,
        deadline: Option<Instant>,
    ) -> Option<Vec<Detection>> {
        let past_deadline = || deadline.is_some_and(|d| Instant::now() >= d);

        let mut found = Vec::new();
        for capture in rule.regex.find_iter(text) {
            if past_deadline() {
                return None;
            }
            if capture.start() == capture.end() {
                continue;
            }
            found.push(Detection {
                text: capture.as_str().to_string(),
                pii_type: rule.pii_type,
                confidence: rule.confidence,
                start: capture.start(),
                end: capture.end(),
                type_name: None,
            });
        }

        if past_deadline() { None } else { Some(found) }
    }
}

fn time_budget(ms: u64) -> Option<Duration> {
    match ms {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

fn build_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

fn compile_catalog(disabled: &[PIIType]) -> Vec<CompiledRule> {
    DEFAULT_RULES
        .iter()
        .filter(|rule| !disabled.contains(&rule.pii_type))
        .filter_map(|rule| match build_regex(rule.pattern) {
            Ok(regex) => Some(CompiledRule {
                pii_type: rule.pii_type,
                regex,
                confidence: rule.confidence,
            }),
            Err(e) => {
                error!(pii_type = %rule.pii_type, "Skipping catalog rule that failed to compile: {}", e);
                None
            }
        })
        .collect()
}

fn compile_custom(pattern: &CustomPattern) -> Result<CompiledRule> {
    if !(0.0..=1.0).contains(&pattern.confidence) {
        return Err(PiiError::InvalidConfidence {
            pii_type: pattern.pii_type,
            confidence: pattern.confidence,
        });
    }

    let regex = build_regex(&pattern.pattern).map_err(|source| PiiError::InvalidPattern {
        pii_type: pattern.pii_type,
        source,
    })?;

    Ok(CompiledRule {
        pii_type: pattern.pii_type,
        regex,
        confidence: pattern.confidence,
    })
}

impl PIIDetector for RegexPIIDetector {
    fn name(&self) -> &str {
        "regex"
    }

    fn candidates(&self, text: &str) -> Vec<Detection> {
        self.scan(text).candidates
    }

    fn scan(&self, text: &str) -> CandidateScan {
        let mut scan = CandidateScan::default();

        for rule in &self.rules {
            let deadline = self.time_budget.map(|budget| Instant::now() + budget);
            match self.scan_rule(rule, text, deadline) {
                Some(found) => {
                    debug!(pii_type = %rule.pii_type, matches = found.len(), "rule scanned");
                    scan.candidates.extend(found);
                }
                None => {
                    warn!(
                        pii_type = %rule.pii_type,
                        budget_ms = self.time_budget.map(|b| b.as_millis() as u64),
                        text_len = text.len(),
                        "Rule exceeded its time budget, skipping it for this text"
                    );
                    scan.skipped_rules.push(rule.pii_type);
                }
            }
        }

        scan
    }

    fn supported_types(&self) -> Vec<PIIType> {
        let mut types: Vec<PIIType> = self.rules.iter().map(|r| r.pii_type).collect();
        types.sort();
        types.dedup();
        types
    }
}
