//! Character masking.
//!
//! Masking operates on the "meaningful" characters of a value, the
//! alphanumerics. With `preserve_format` on, separators are copied through
//! in place so `123-45-6789` masks to `***-**-6789` rather than
//! `*****6789`.

use crate::MaskPattern;
use crate::policy::{MaskType, CUSTOM_MASK_RUN};

/// Applies `pattern` to `value`.
///
/// Masking is one-way and infallible: patterns are validated when loaded,
/// and any valid pattern applies to any string. The empty string masks to
/// itself.
#[must_use]
pub fn mask(value: &str, pattern: &MaskPattern) -> String {
    if value.is_empty() {
        return String::new();
    }
    if pattern.mask_type == MaskType::Custom {
        return mask_custom(value, pattern);
    }

    let meaningful = value.chars().filter(|c| c.is_alphanumeric()).count();
    let (first, last) = visible_window(pattern, meaningful);

    let mut index = 0;
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if !ch.is_alphanumeric() {
            if pattern.preserve_format {
                out.push(ch);
            }
            continue;
        }
        if index < first || index >= meaningful - last {
            out.push(ch);
        } else {
            out.push(pattern.mask_char);
        }
        index += 1;
    }
    out
}

/// Visible (prefix, suffix) lengths in meaningful characters.
///
/// Lenient mode reproduces the documented behavior of showing a value
/// whole when it fits inside the visible window. Strict mode shrinks the
/// window so at least one character is always masked.
fn visible_window(pattern: &MaskPattern, meaningful: usize) -> (usize, usize) {
    let (first, last) = match pattern.mask_type {
        MaskType::ShowFirst => (pattern.show_first, 0),
        MaskType::ShowLast => (0, pattern.show_last),
        MaskType::ShowFirstLast => (pattern.show_first, pattern.show_last),
        MaskType::FullMask => (0, 0),
        MaskType::Custom => unreachable!("custom handled separately"),
    };

    if first + last < meaningful {
        return (first, last);
    }
    if !pattern.strict {
        // Short value passes through whole. Deliberate per config docs,
        // and the reason strict mode exists.
        return (meaningful, 0);
    }
    let visible = meaningful.saturating_sub(1);
    let first = first.min(visible);
    (first, visible - first)
}

/// Custom split masking. The value is cut at the first separator; the
/// prefix keeps `show_first` characters and gains a fixed-length mask run,
/// the separator and suffix pass verbatim. Without a separator in the
/// value this degrades to `show_first` over raw characters.
fn mask_custom(value: &str, pattern: &MaskPattern) -> String {
    let run: String = std::iter::repeat(pattern.mask_char)
        .take(CUSTOM_MASK_RUN)
        .collect();

    if let Some(split) = pattern.separator.and_then(|sep| value.find(sep)) {
        let (prefix, rest) = value.split_at(split);
        let shown: String = prefix.chars().take(pattern.show_first).collect();
        format!("{shown}{run}{rest}")
    } else {
        let shown: String = value.chars().take(pattern.show_first).collect();
        format!("{shown}{run}")
    }
}
