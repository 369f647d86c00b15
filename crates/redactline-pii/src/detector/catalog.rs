//! Built-in PII pattern catalog

use crate::detector::PIIType;

/// One catalog entry: every match of `pattern` is reported as `pii_type`
/// with a fixed `confidence`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PIIPatternRule {
    pub pii_type: PIIType,
    pub pattern: &'static str,
    pub confidence: f32,
}

/// The default rules, in application order.
///
/// All rules are matched case-insensitively. Order decides which of two
/// equal-confidence overlapping matches survives.
pub const DEFAULT_RULES: [PIIPatternRule; 7] = [
    PIIPatternRule {
        pii_type: PIIType::Email,
        pattern: r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Z|a-z]{2,}\b",
        confidence: 0.95,
    },
    // (555) 123-4567, 555.123.4567, +1 555 123 4567
    PIIPatternRule {
        pii_type: PIIType::Phone,
        pattern: r"(?:\+?1[-.\s]?)?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})",
        confidence: 0.90,
    },
    PIIPatternRule {
        pii_type: PIIType::SSN,
        pattern: r"\b\d{3}-\d{2}-\d{4}\b",
        confidence: 0.98,
    },
    PIIPatternRule {
        pii_type: PIIType::CreditCard,
        pattern: r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b",
        confidence: 0.85,
    },
    PIIPatternRule {
        pii_type: PIIType::ZipCode,
        pattern: r"\b\d{5}(?:-\d{4})?\b",
        confidence: 0.70,
    },
    PIIPatternRule {
        pii_type: PIIType::DateOfBirth,
        pattern: r"\b(?:0[1-9]|1[0-2])[/-](?:0[1-9]|[12]\d|3[01])[/-](?:19|20)\d{2}\b",
        confidence: 0.60,
    },
    PIIPatternRule {
        pii_type: PIIType::Name,
        pattern: r"\b[A-Z][a-z]+ [A-Z][a-z]+(?:\s[A-Z][a-z]+)?\b",
        confidence: 0.50,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_covers_every_known_type_once() {
        let mut types: Vec<PIIType> = DEFAULT_RULES.iter().map(|r| r.pii_type).collect();
        types.sort();
        types.dedup();
        assert_eq!(types.len(), DEFAULT_RULES.len());
        assert!(!types.contains(&PIIType::Unknown));
    }

    #[test]
    fn test_catalog_confidences_in_range() {
        for rule in DEFAULT_RULES {
            assert!((0.0..=1.0).contains(&rule.confidence), "{}", rule.pii_type);
        }
    }

    #[test]
    fn test_catalog_patterns_compile() {
        for rule in DEFAULT_RULES {
            assert!(regex::Regex::new(rule.pattern).is_ok(), "{}", rule.pii_type);
        }
    }
}
