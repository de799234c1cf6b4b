//! Entity pattern matching.

use crate::{DetectError, DetectResult};
use phi_core::EntityType;
use regex::Regex;
use std::collections::HashMap;

/// An entity detection pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Pattern name.
    pub name: String,
    /// Entity type this pattern detects.
    pub entity_type: EntityType,
    /// Regular expression source.
    pub regex: String,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f64,
    /// Validation function name (if any).
    pub validator: Option<String>,
}

impl Pattern {
    /// Creates a new pattern.
    pub fn new(
        name: impl Into<String>,
        entity_type: EntityType,
        regex: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type,
            regex: regex.into(),
            confidence: 0.8,
            validator: None,
        }
    }

    /// Sets confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Sets validator.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Into<String>) -> Self {
        self.validator = Some(validator.into());
        self
    }
}

/// A compiled pattern ready for matching.
pub struct CompiledPattern {
    /// Original pattern.
    pub pattern: Pattern,
    regex: Regex,
}

impl CompiledPattern {
    /// Compiles a pattern.
    ///
    /// # Errors
    /// Returns an error if the regular expression does not compile.
    pub fn compile(pattern: Pattern) -> DetectResult<Self> {
        let regex = Regex::new(&pattern.regex).map_err(|source| {
            DetectError::PatternCompilation {
                name: pattern.name.clone(),
                source,
            }
        })?;
        Ok(Self { pattern, regex })
    }

    /// Finds all matches in text.
    pub fn find_matches(&self, text: &str) -> Vec<PatternMatch> {
        self.regex
            .find_iter(text)
            .map(|m| PatternMatch {
                pattern_name: self.pattern.name.clone(),
                entity_type: self.pattern.entity_type,
                start: m.start(),
                end: m.end(),
                matched_text: m.as_str().to_string(),
                confidence: self.pattern.confidence,
            })
            .collect()
    }
}

/// A pattern match result.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// Pattern name that matched.
    pub pattern_name: String,
    /// Entity type detected.
    pub entity_type: EntityType,
    /// Start offset in text.
    pub start: usize,
    /// End offset in text.
    pub end: usize,
    /// Matched text.
    pub matched_text: String,
    /// Confidence score.
    pub confidence: f64,
}

impl PatternMatch {
    /// Returns the span length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the span is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A set of patterns for entity detection.
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
    by_type: HashMap<EntityType, Vec<usize>>,
}

impl PatternSet {
    /// Creates an empty pattern set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            by_type: HashMap::new(),
        }
    }

    /// Creates the built-in pattern set.
    #[must_use]
    pub fn builtin() -> Self {
        let mut set = Self::new();

        set.add(
            Pattern::new(
                "email",
                EntityType::Email,
                r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}",
            )
            .with_confidence(0.95),
        );

        // Phone patterns (US and international)
        set.add(
            Pattern::new(
                "phone_us",
                EntityType::Phone,
                r"(?:\+1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}",
            )
            .with_confidence(0.85),
        );

        set.add(
            Pattern::new(
                "phone_intl",
                EntityType::Phone,
                r"\+[1-9][0-9]{1,2}[-.\s]?[0-9]{6,12}",
            )
            .with_confidence(0.85),
        );

        set.add(
            Pattern::new("ssn", EntityType::Ssn, r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b")
                .with_confidence(0.90)
                .with_validator("validate_ssn"),
        );

        // Credit card patterns
        set.add(
            Pattern::new(
                "credit_card_visa",
                EntityType::CreditCard,
                r"\b4[0-9]{12}(?:[0-9]{3})?\b",
            )
            .with_confidence(0.90)
            .with_validator("validate_luhn"),
        );

        set.add(
            Pattern::new(
                "credit_card_amex",
                EntityType::CreditCard,
                r"\b3[47][0-9]{13}\b",
            )
            .with_confidence(0.90)
            .with_validator("validate_luhn"),
        );

        set.add(
            Pattern::new(
                "credit_card_generic",
                EntityType::CreditCard,
                r"\b(?:\d{4}[-\s]?){3}\d{4}\b",
            )
            .with_confidence(0.92)
            .with_validator("validate_luhn"),
        );

        // Date of birth patterns
        set.add(
            Pattern::new(
                "dob_us",
                EntityType::DateOfBirth,
                r"\b(?:0[1-9]|1[0-2])[/-](?:0[1-9]|[12][0-9]|3[01])[/-](?:19|20)\d{2}\b",
            )
            .with_confidence(0.70),
        );

        set.add(
            Pattern::new(
                "dob_iso",
                EntityType::DateOfBirth,
                r"\b(?:19|20)\d{2}[-/](?:0[1-9]|1[0-2])[-/](?:0[1-9]|[12][0-9]|3[01])\b",
            )
            .with_confidence(0.70),
        );

        // Health insurance IDs
        set.add(
            Pattern::new(
                "insurance_id",
                EntityType::InsuranceId,
                r"\b(?:INS|HIC|POL)[-\s]?\d{6,12}\b",
            )
            .with_confidence(0.80),
        );

        // Medical record numbers
        set.add(
            Pattern::new(
                "mrn",
                EntityType::MedicalRecordNumber,
                r"(?i)\bMRN[-\s]?:?\s?\d{6,10}\b",
            )
            .with_confidence(0.85),
        );

        set.add(
            Pattern::new(
                "hospital_patient_id",
                EntityType::MedicalRecordNumber,
                r"\b[A-Z]{2,4}\d{6,10}-\d{3,4}\b",
            )
            .with_confidence(0.70),
        );

        set.add(
            Pattern::new(
                "street_address",
                EntityType::Address,
                r"\b\d{1,5},?\s+[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)?\s+(?:Street|St|Avenue|Ave|Road|Rd|Boulevard|Blvd|Lane|Ln|Drive|Dr)\b",
            )
            .with_confidence(0.65),
        );

        // Person names: doctor form first (higher confidence), then the
        // generic capitalized-words form.
        set.add(
            Pattern::new(
                "doctor_name",
                EntityType::Person,
                r"\bDr\.\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+){0,2}\b",
            )
            .with_confidence(0.85),
        );

        set.add(
            Pattern::new(
                "person_name",
                EntityType::Person,
                r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,3}\b",
            )
            .with_confidence(0.65),
        );

        set
    }

    /// Adds a pattern to the set.
    pub fn add(&mut self, pattern: Pattern) {
        match CompiledPattern::compile(pattern.clone()) {
            Ok(compiled) => {
                let idx = self.patterns.len();
                self.by_type
                    .entry(pattern.entity_type)
                    .or_default()
                    .push(idx);
                self.patterns.push(compiled);
            }
            Err(e) => {
                tracing::warn!("failed to compile pattern '{}': {}", pattern.name, e);
            }
        }
    }

    /// Finds all raw matches in text, sorted by position then confidence.
    pub fn find_all(&self, text: &str) -> Vec<PatternMatch> {
        let mut matches: Vec<PatternMatch> = self
            .patterns
            .iter()
            .flat_map(|p| p.find_matches(text))
            .collect();

        matches.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });

        matches
    }

    /// Finds matches for a specific entity type.
    pub fn find_by_type(&self, text: &str, entity_type: EntityType) -> Vec<PatternMatch> {
        self.by_type
            .get(&entity_type)
            .map(|indices| {
                indices
                    .iter()
                    .flat_map(|&i| self.patterns[i].find_matches(text))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CompiledPattern> {
        self.patterns.iter().find(|p| p.pattern.name == name)
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Pattern matcher with validation.
pub struct PatternMatcher {
    patterns: PatternSet,
    validators: HashMap<String, Box<dyn Fn(&str) -> bool + Send + Sync>>,
}

impl PatternMatcher {
    /// Creates a new matcher with built-in patterns and validators.
    #[must_use]
    pub fn new() -> Self {
        Self::with_patterns(PatternSet::builtin())
    }

    /// Creates with a custom pattern set; built-in validators are registered.
    pub fn with_patterns(patterns: PatternSet) -> Self {
        let mut matcher = Self {
            patterns,
            validators: HashMap::new(),
        };

        matcher.register_validator("validate_luhn", validate_luhn);
        matcher.register_validator("validate_ssn", validate_ssn);

        matcher
    }

    /// Registers a validator function.
    pub fn register_validator<F>(&mut self, name: &str, validator: F)
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.validators.insert(name.to_string(), Box::new(validator));
    }

    /// Adds a custom pattern.
    pub fn add_pattern(&mut self, pattern: Pattern) {
        self.patterns.add(pattern);
    }

    /// Finds all matches that pass their pattern's validator.
    pub fn find_validated(&self, text: &str) -> Vec<PatternMatch> {
        self.patterns
            .find_all(text)
            .into_iter()
            .filter(|m| {
                let validator = self
                    .patterns
                    .get(&m.pattern_name)
                    .and_then(|p| p.pattern.validator.as_deref())
                    .and_then(|name| self.validators.get(name));
                match validator {
                    Some(v) => v(&m.matched_text),
                    None => true,
                }
            })
            .collect()
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Validates a credit card number using the Luhn algorithm.
pub fn validate_luhn(number: &str) -> bool {
    let digits: Vec<u32> = number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Validates a US SSN (area, group, serial rules).
pub fn validate_ssn(ssn: &str) -> bool {
    let digits: String = ssn.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() != 9 {
        return false;
    }

    let area: u32 = digits[0..3].parse().unwrap_or(0);
    let group: u32 = digits[3..5].parse().unwrap_or(0);
    let serial: u32 = digits[5..9].parse().unwrap_or(0);

    if area == 0 || area == 666 || area >= 900 {
        return false;
    }

    group != 0 && serial != 0
}
