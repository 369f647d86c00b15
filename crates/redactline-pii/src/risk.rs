//! Risk classification and redaction suggestions

use crate::detector::{Detection, PIIType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Overall sensitivity of a detection list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        })
    }
}

/// Risk level, the detections worth reviewing first, and human-readable hints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub priority_items: Vec<Detection>,
    pub suggestions: Vec<String>,
}

const HIGH_RISK_TYPES: [PIIType; 2] = [PIIType::SSN, PIIType::CreditCard];
const MEDIUM_RISK_TYPES: [PIIType; 3] = [PIIType::Email, PIIType::Phone, PIIType::DateOfBirth];

/// Classify a detection list.
///
/// - `high`: any SSN or credit card
/// - `medium`: any email, phone or date of birth, or at least three
///   high-confidence detections
/// - `low`: everything else
pub fn assess_risk(detections: &[Detection]) -> RiskAssessment {
    if detections.is_empty() {
        return RiskAssessment {
            risk_level: RiskLevel::Low,
            priority_items: Vec::new(),
            suggestions: vec!["No sensitive information detected.".to_string()],
        };
    }

    let high_confidence_count = detections.iter().filter(|d| d.is_high_confidence()).count();

    let risk_level = if detections
        .iter()
        .any(|d| HIGH_RISK_TYPES.contains(&d.pii_type))
    {
        RiskLevel::High
    } else if detections
        .iter()
        .any(|d| MEDIUM_RISK_TYPES.contains(&d.pii_type))
        || high_confidence_count >= 3
    {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let priority_items = detections
        .iter()
        .filter(|d| d.is_high_confidence() || HIGH_RISK_TYPES.contains(&d.pii_type))
        .cloned()
        .collect();

    let mut counts: BTreeMap<PIIType, usize> = BTreeMap::new();
    for detection in detections {
        *counts.entry(detection.pii_type).or_insert(0) += 1;
    }

    let mut suggestions = Vec::new();
    if let Some(n) = counts.get(&PIIType::SSN) {
        suggestions.push(format!(
            "Consider redacting all {} Social Security Numbers for privacy compliance.",
            n
        ));
    }
    if let Some(n) = counts.get(&PIIType::Email) {
        suggestions.push(format!(
            "Review {} email addresses - consider redacting personal emails.",
            n
        ));
    }
    if let Some(n) = counts.get(&PIIType::CreditCard) {
        suggestions.push(format!(
            "Redact all {} credit card numbers for PCI compliance.",
            n
        ));
    }
    if high_confidence_count >= 5 {
        suggestions.push(
            "High volume of sensitive data detected. Consider comprehensive redaction.".to_string(),
        );
    }
    if suggestions.is_empty() {
        suggestions.push(
            "Review detected items and redact as needed based on your privacy requirements."
                .to_string(),
        );
    }

    RiskAssessment {
        risk_level,
        priority_items,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(pii_type: PIIType, confidence: f32) -> Detection {
        Detection {
            text: "x".to_string(),
            pii_type,
            confidence,
            start: 0,
            end: 1,
            type_name: None,
        }
    }

    #[test]
    fn test_empty_is_low() {
        let assessment = assess_risk(&[]);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.priority_items.is_empty());
        assert_eq!(assessment.suggestions, vec!["No sensitive information detected."]);
    }

    #[test]
    fn test_ssn_or_card_is_high() {
        let assessment = assess_risk(&[
            detection(PIIType::SSN, 0.98),
            detection(PIIType::CreditCard, 0.85),
        ]);

        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert_eq!(assessment.priority_items.len(), 2);
        assert!(assessment.suggestions[0].contains("1 Social Security Numbers"));
        assert!(assessment.suggestions[1].contains("1 credit card numbers"));
    }

    #[test]
    fn test_contact_types_are_medium() {
        for pii_type in [PIIType::Email, PIIType::Phone, PIIType::DateOfBirth] {
            let assessment = assess_risk(&[detection(pii_type, 0.6)]);
            assert_eq!(assessment.risk_level, RiskLevel::Medium, "{pii_type}");
        }
    }

    #[test]
    fn test_three_high_confidence_is_medium() {
        let names = vec![detection(PIIType::Name, 0.9); 3];
        assert_eq!(assess_risk(&names).risk_level, RiskLevel::Medium);

        let names = vec![detection(PIIType::Name, 0.9); 2];
        assert_eq!(assess_risk(&names).risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_names_and_zips_are_low() {
        let assessment = assess_risk(&[
            detection(PIIType::Name, 0.5),
            detection(PIIType::ZipCode, 0.7),
        ]);

        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.priority_items.is_empty());
        assert_eq!(assessment.suggestions.len(), 1);
        assert!(assessment.suggestions[0].starts_with("Review detected items"));
    }

    #[test]
    fn test_priority_items_include_low_confidence_high_risk() {
        let assessment = assess_risk(&[
            detection(PIIType::SSN, 0.3),
            detection(PIIType::Name, 0.5),
        ]);

        assert_eq!(assessment.priority_items.len(), 1);
        assert_eq!(assessment.priority_items[0].pii_type, PIIType::SSN);
    }

    #[test]
    fn test_high_volume_suggestion() {
        let emails = vec![detection(PIIType::Email, 0.95); 5];
        let assessment = assess_risk(&emails);

        assert!(assessment.suggestions[0].contains("5 email addresses"));
        assert!(assessment.suggestions.iter().any(|s| s.contains("High volume")));
    }

    #[test]
    fn test_risk_level_serialization() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
    }
}
