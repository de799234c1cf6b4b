//! Entity detection engine.

use crate::{DetectError, DetectResult, PatternMatch, PatternMatcher};
use phi_core::{Entity, EntityType};
use serde::{Deserialize, Serialize};

/// Characters of surrounding text attached to each detection.
const CONTEXT_WINDOW: usize = 40;

/// Detection policy, typically loaded from the `phiDetection` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionPolicy {
    /// Whether detection is enabled at all.
    pub enabled: bool,
    /// Minimum confidence threshold (0.0 - 1.0).
    pub confidence: f64,
    /// Entity types to detect. Empty means all supported types.
    pub entities: Vec<EntityType>,
    /// Hint for callers that re-run detection as the user types. Detection
    /// itself is identical either way.
    #[serde(default)]
    pub real_time_detection: bool,
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            confidence: 0.6,
            entities: Vec::new(),
            real_time_detection: true,
        }
    }
}

impl DetectionPolicy {
    /// Validates the policy.
    ///
    /// # Errors
    /// Returns an error if the confidence threshold is out of range.
    pub fn validate(&self) -> DetectResult<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(DetectError::MalformedPolicy(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }

    fn allows(&self, entity_type: EntityType) -> bool {
        self.entities.is_empty() || self.entities.contains(&entity_type)
    }
}

/// Entity detector.
///
/// Stateless apart from its compiled patterns; safe to share across threads
/// and to invoke concurrently on independent text blobs.
pub struct Detector {
    matcher: PatternMatcher,
}

impl Detector {
    /// Creates a detector with the built-in pattern set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: PatternMatcher::new(),
        }
    }

    /// Creates a detector with a custom matcher.
    #[must_use]
    pub fn with_matcher(matcher: PatternMatcher) -> Self {
        Self { matcher }
    }

    /// Detects all entities in `text` permitted by `policy`.
    ///
    /// The input is never mutated. Empty or unmatchable text yields an empty
    /// list, never an error.
    pub fn detect(&self, text: &str, policy: &DetectionPolicy) -> Vec<Entity> {
        if !policy.enabled || text.is_empty() {
            return Vec::new();
        }

        let matches: Vec<PatternMatch> = self
            .matcher
            .find_validated(text)
            .into_iter()
            .filter(|m| m.confidence >= policy.confidence && policy.allows(m.entity_type))
            .collect();

        resolve_overlaps(matches)
            .into_iter()
            .map(|m| {
                let mut entity =
                    Entity::new(m.entity_type, m.matched_text, m.start, m.end, m.confidence);
                entity.context = Some(extract_context(text, m.start, m.end));
                entity
            })
            .collect()
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves overlapping matches: higher confidence wins, then the longer
/// span. Overlapping exact ties (same confidence, same length) are both
/// discarded with an ambiguity warning, so no information is dropped
/// silently.
fn resolve_overlaps(mut matches: Vec<PatternMatch>) -> Vec<PatternMatch> {
    matches.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.start.cmp(&b.start))
    });

    // Mark exact overlapping ties for discard.
    let mut discarded = vec![false; matches.len()];
    for i in 0..matches.len() {
        for j in (i + 1)..matches.len() {
            let (a, b) = (&matches[i], &matches[j]);
            if overlaps(a, b)
                && a.confidence == b.confidence
                && a.len() == b.len()
                && !(a.start == b.start && a.end == b.end && a.entity_type == b.entity_type)
            {
                tracing::warn!(
                    left = %a.pattern_name,
                    right = %b.pattern_name,
                    span = ?(a.start..a.end),
                    "ambiguous overlapping detections with equal confidence; discarding both"
                );
                discarded[i] = true;
                discarded[j] = true;
            }
        }
    }

    // Greedy acceptance in priority order.
    let mut accepted: Vec<PatternMatch> = Vec::new();
    for (i, m) in matches.into_iter().enumerate() {
        if discarded[i] {
            continue;
        }
        if accepted.iter().any(|a| overlaps(a, &m)) {
            continue;
        }
        accepted.push(m);
    }

    accepted.sort_by_key(|m| m.start);
    accepted
}

fn overlaps(a: &PatternMatch, b: &PatternMatch) -> bool {
    a.start < b.end && b.start < a.end
}

fn extract_context(text: &str, start: usize, end: usize) -> String {
    let mut ctx_start = start.saturating_sub(CONTEXT_WINDOW);
    while ctx_start > 0 && !text.is_char_boundary(ctx_start) {
        ctx_start -= 1;
    }
    let mut ctx_end = (end + CONTEXT_WINDOW).min(text.len());
    while ctx_end < text.len() && !text.is_char_boundary(ctx_end) {
        ctx_end += 1;
    }

    let mut context = String::new();
    if ctx_start > 0 {
        context.push_str("...");
    }
    context.push_str(&text[ctx_start..ctx_end]);
    if ctx_end < text.len() {
        context.push_str("...");
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Pattern, PatternSet};

    #[test]
    fn test_basic_detection() {
        let detector = Detector::new();
        let text = "Contact john@example.com or call 555-123-4567";

        let entities = detector.detect(text, &DetectionPolicy::default());

        assert!(entities.iter().any(|e| e.entity_type == EntityType::Email));
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Phone));
    }

    #[test]
    fn test_empty_text_returns_empty() {
        let detector = Detector::new();
        assert!(detector.detect("", &DetectionPolicy::default()).is_empty());
    }

    #[test]
    fn test_disabled_policy() {
        let detector = Detector::new();
        let policy = DetectionPolicy {
            enabled: false,
            ..Default::default()
        };
        assert!(detector
            .detect("SSN: 123-45-6789", &policy)
            .is_empty());
    }

    #[test]
    fn test_confidence_filter() {
        let detector = Detector::new();
        let policy = DetectionPolicy {
            confidence: 0.9,
            ..Default::default()
        };

        // SSN (0.90) passes, person names (0.65) do not.
        let entities = detector.detect("Ramesh Kumar has SSN 123-45-6789", &policy);
        assert!(entities.iter().any(|e| e.entity_type == EntityType::Ssn));
        assert!(!entities.iter().any(|e| e.entity_type == EntityType::Person));
    }

    #[test]
    fn test_entity_type_filter() {
        let detector = Detector::new();
        let policy = DetectionPolicy {
            entities: vec![EntityType::Email],
            ..Default::default()
        };

        let entities = detector.detect("a@b.com and 555-123-4567", &policy);
        assert!(entities.iter().all(|e| e.entity_type == EntityType::Email));
    }

    #[test]
    fn test_overlap_prefers_higher_confidence() {
        let detector = Detector::new();
        // Doctor form (0.85) should beat the plain person pattern (0.65)
        // over the overlapping span.
        let entities = detector.detect("seen by Dr. Priya Mehta today", &DetectionPolicy::default());

        let persons: Vec<_> = entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Person)
            .collect();
        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].value, "Dr. Priya Mehta");
    }

    #[test]
    fn test_equal_confidence_tie_discards_both() {
        // Two patterns claim the same span with the same confidence but
        // disagree on the entity type. Neither reading can be trusted, so
        // both are dropped rather than picking one silently.
        let mut set = PatternSet::new();
        set.add(Pattern::new("id_a", EntityType::InsuranceId, r"\b\d{6}\b").with_confidence(0.8));
        set.add(
            Pattern::new("id_b", EntityType::MedicalRecordNumber, r"\b\d{6}\b")
                .with_confidence(0.8),
        );
        let detector = Detector::with_matcher(PatternMatcher::with_patterns(set));

        let entities = detector.detect("ref 123456 attached", &DetectionPolicy::default());

        assert!(entities.is_empty());
    }

    #[test]
    fn test_context_extraction() {
        let detector = Detector::new();
        let entities = detector.detect(
            "Please contact john@example.com for more information.",
            &DetectionPolicy::default(),
        );

        assert!(!entities.is_empty());
        let ctx = entities[0].context.as_deref().unwrap();
        assert!(ctx.contains("john@example.com"));
    }

    #[test]
    fn test_policy_validation() {
        let policy = DetectionPolicy {
            confidence: 1.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
        assert!(DetectionPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_luhn_not_detected() {
        let detector = Detector::new();
        let entities = detector.detect("card 1234-5678-1234-5678", &DetectionPolicy::default());
        assert!(!entities
            .iter()
            .any(|e| e.entity_type == EntityType::CreditCard));
    }
}
