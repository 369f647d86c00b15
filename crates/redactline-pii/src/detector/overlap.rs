//! Overlap resolution across raw candidates

use crate::detector::Detection;

/// Reduce raw candidates to a list with no two overlapping ranges.
///
/// Candidates are stably sorted by start offset and walked once. A candidate
/// is compared only with the first accepted detection it overlaps: it
/// replaces that detection when its confidence is strictly higher and is
/// dropped otherwise, so ties keep the earlier detection. A replacement is
/// appended at the end of the accepted list rather than taking the evicted
/// detection's slot.
///
/// The accepted list stays disjoint and ordered by start, since a
/// replacement always has the largest start seen so far. Every accepted
/// detection before the last one therefore ends at or before the last one
/// starts, which is at or before the candidate's start, so only the last
/// accepted detection can overlap a candidate. The walk is linear after the
/// sort.
pub fn resolve_overlaps(mut candidates: Vec<Detection>) -> Vec<Detection> {
    candidates.sort_by_key(|d| d.start);

    let mut accepted: Vec<Detection> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match accepted.last() {
            Some(last) if candidate.overlaps(last) => {
                if candidate.confidence > last.confidence {
                    accepted.pop();
                    accepted.push(candidate);
                }
            }
            _ => accepted.push(candidate),
        }
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::PIIType;

    fn candidate(pii_type: PIIType, start: usize, end: usize, confidence: f32) -> Detection {
        Detection {
            text: "x".repeat(end - start),
            pii_type,
            confidence,
            start,
            end,
            type_name: None,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_overlaps(Vec::new()).is_empty());
    }

    #[test]
    fn test_disjoint_candidates_all_kept_in_start_order() {
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::Email, 20, 30, 0.95),
            candidate(PIIType::Name, 0, 10, 0.5),
        ]);

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].start, 0);
        assert_eq!(resolved[1].start, 20);
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::Name, 0, 5, 0.5),
            candidate(PIIType::ZipCode, 5, 10, 0.7),
        ]);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_higher_confidence_evicts_earlier() {
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::Name, 0, 10, 0.5),
            candidate(PIIType::Email, 5, 20, 0.95),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::Email);
    }

    #[test]
    fn test_lower_confidence_is_discarded() {
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::SSN, 0, 11, 0.98),
            candidate(PIIType::ZipCode, 4, 9, 0.7),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::SSN);
    }

    #[test]
    fn test_tie_keeps_first_accepted() {
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::Phone, 0, 12, 0.9),
            candidate(PIIType::Unknown, 2, 14, 0.9),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::Phone);
    }

    #[test]
    fn test_same_start_uses_merge_order() {
        // Stable sort: the first candidate in input order is seen first.
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::CreditCard, 0, 19, 0.85),
            candidate(PIIType::Phone, 0, 12, 0.9),
        ]);

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].pii_type, PIIType::Phone);
    }

    #[test]
    fn test_replacement_is_appended() {
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::Name, 0, 10, 0.5),
            candidate(PIIType::Name, 12, 20, 0.5),
            candidate(PIIType::Email, 5, 11, 0.95),
        ]);

        // Email (start 5) evicts the first name; the second name follows it.
        let starts: Vec<usize> = resolved.iter().map(|d| d.start).collect();
        assert_eq!(starts, vec![5, 12]);
    }

    #[test]
    fn test_result_never_overlaps() {
        let resolved = resolve_overlaps(vec![
            candidate(PIIType::Name, 0, 18, 0.5),
            candidate(PIIType::Name, 19, 26, 0.5),
            candidate(PIIType::Email, 22, 44, 0.95),
            candidate(PIIType::Name, 41, 47, 0.5),
            candidate(PIIType::Phone, 48, 60, 0.9),
        ]);

        for (i, a) in resolved.iter().enumerate() {
            for b in &resolved[i + 1..] {
                assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
            }
        }
        assert_eq!(resolved.len(), 3);
    }

    /// Compares each candidate against every accepted detection
    fn resolve_by_full_scan(mut candidates: Vec<Detection>) -> Vec<Detection> {
        candidates.sort_by_key(|d| d.start);
        let mut accepted: Vec<Detection> = Vec::new();
        for candidate in candidates {
            match accepted.iter().position(|existing| candidate.overlaps(existing)) {
                Some(index) => {
                    if candidate.confidence > accepted[index].confidence {
                        accepted.remove(index);
                        accepted.push(candidate);
                    }
                }
                None => accepted.push(candidate),
            }
        }
        accepted
    }

    #[test]
    fn test_matches_full_scan_on_mixed_candidates() {
        let types = [PIIType::Name, PIIType::ZipCode, PIIType::Phone, PIIType::Email];
        let confidences = [0.5, 0.7, 0.9, 0.9, 0.95];

        // Deterministic pseudo-random layout with many ties and nested ranges
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        let candidates: Vec<Detection> = (0..2_000)
            .map(|i| {
                let start = (next() % 5_000) as usize;
                let len = 1 + (next() % 40) as usize;
                candidate(
                    types[i % types.len()],
                    start,
                    start + len,
                    confidences[(next() % confidences.len() as u64) as usize],
                )
            })
            .collect();

        assert_eq!(
            resolve_overlaps(candidates.clone()),
            resolve_by_full_scan(candidates)
        );
    }

    #[test]
    fn test_scales_to_many_candidates() {
        // Pairs of overlapping candidates where the second always wins
        let pairs = 200_000;
        let mut candidates = Vec::with_capacity(pairs * 2);
        for i in 0..pairs {
            let start = i * 10;
            candidates.push(candidate(PIIType::Name, start, start + 6, 0.5));
            candidates.push(candidate(PIIType::Phone, start + 2, start + 9, 0.9));
        }

        let resolved = resolve_overlaps(candidates);

        assert_eq!(resolved.len(), pairs);
        assert!(resolved.iter().all(|d| d.pii_type == PIIType::Phone));
        assert!(resolved.windows(2).all(|w| w[0].end <= w[1].start));
    }
}
