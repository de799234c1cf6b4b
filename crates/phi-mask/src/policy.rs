//! Mask pattern configuration.

use crate::{MaskError, MaskResult};
use serde::{Deserialize, Serialize};

/// Number of mask characters emitted for the hidden part of a custom
/// pattern, regardless of how long the hidden part really is.
pub const CUSTOM_MASK_RUN: usize = 3;

/// Which characters of a value stay visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskType {
    /// First `show_first` meaningful characters stay visible.
    ShowFirst,
    /// Last `show_last` meaningful characters stay visible.
    ShowLast,
    /// Both ends stay visible, the middle is masked.
    ShowFirstLast,
    /// Every meaningful character is masked.
    FullMask,
    /// Value is split at `separator`; the prefix shows its first
    /// `show_first` characters followed by a fixed run of mask characters,
    /// the separator and suffix pass verbatim. Built for emails, where the
    /// domain is not the sensitive part.
    Custom,
}

/// A character masking pattern, typically one entry of the
/// `maskingStrategies` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskPattern {
    /// Mask type.
    #[serde(rename = "type")]
    pub mask_type: MaskType,
    /// Visible prefix length, in meaningful characters.
    #[serde(default)]
    pub show_first: usize,
    /// Visible suffix length, in meaningful characters.
    #[serde(default)]
    pub show_last: usize,
    /// Replacement character.
    #[serde(default = "default_mask_char")]
    pub mask_char: char,
    /// Split character for [`MaskType::Custom`].
    #[serde(default)]
    pub separator: Option<char>,
    /// Keep separators and overall layout. When false, non-meaningful
    /// characters are stripped before masking.
    #[serde(default = "default_true")]
    pub preserve_format: bool,
    /// Always mask at least one character. When false (the documented
    /// default), values no longer than the visible window pass through
    /// unmasked.
    #[serde(default)]
    pub strict: bool,
}

fn default_mask_char() -> char {
    '*'
}

fn default_true() -> bool {
    true
}

impl MaskPattern {
    /// A pattern showing the first `n` meaningful characters.
    #[must_use]
    pub fn show_first(n: usize) -> Self {
        Self {
            mask_type: MaskType::ShowFirst,
            show_first: n,
            ..Self::full_mask()
        }
    }

    /// A pattern showing the last `n` meaningful characters.
    #[must_use]
    pub fn show_last(n: usize) -> Self {
        Self {
            mask_type: MaskType::ShowLast,
            show_last: n,
            ..Self::full_mask()
        }
    }

    /// A pattern showing both ends.
    #[must_use]
    pub fn show_first_last(first: usize, last: usize) -> Self {
        Self {
            mask_type: MaskType::ShowFirstLast,
            show_first: first,
            show_last: last,
            ..Self::full_mask()
        }
    }

    /// A pattern masking every meaningful character.
    #[must_use]
    pub fn full_mask() -> Self {
        Self {
            mask_type: MaskType::FullMask,
            show_first: 0,
            show_last: 0,
            mask_char: '*',
            separator: None,
            preserve_format: true,
            strict: false,
        }
    }

    /// The email pattern: `j***@company.com`.
    #[must_use]
    pub fn email(show_first: usize) -> Self {
        Self {
            mask_type: MaskType::Custom,
            show_first,
            separator: Some('@'),
            ..Self::full_mask()
        }
    }

    /// Validates the pattern.
    ///
    /// # Errors
    /// Returns an error for an alphanumeric mask character (which would
    /// read as data) or a custom pattern without a separator.
    pub fn validate(&self) -> MaskResult<()> {
        if self.mask_char.is_alphanumeric() {
            return Err(MaskError::InvalidPattern {
                field: "maskChar",
                reason: format!("'{}' is alphanumeric", self.mask_char),
            });
        }
        if self.mask_type == MaskType::Custom && self.separator.is_none() {
            return Err(MaskError::InvalidPattern {
                field: "separator",
                reason: "custom patterns need a split character".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_alphanumeric_mask_char() {
        let mut pattern = MaskPattern::full_mask();
        pattern.mask_char = 'x';
        assert!(pattern.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_custom_without_separator() {
        let mut pattern = MaskPattern::email(1);
        pattern.separator = None;
        assert!(pattern.validate().is_err());
    }

    #[test]
    fn test_config_json_shape() {
        let json = r#"{
            "type": "show_first_last",
            "showFirst": 4,
            "showLast": 4,
            "maskChar": "*",
            "preserveFormat": true
        }"#;
        let pattern: MaskPattern = serde_json::from_str(json).unwrap();
        assert_eq!(pattern.mask_type, MaskType::ShowFirstLast);
        assert_eq!(pattern.show_first, 4);
        assert_eq!(pattern.show_last, 4);
        assert!(pattern.preserve_format);
        assert!(!pattern.strict);
    }
}
