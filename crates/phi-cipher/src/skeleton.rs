//! Format skeleton extraction and reassembly.
//!
//! A value like `123-45-6789` is split into a skeleton (which positions are
//! digits, letters, or verbatim separators) and two payload streams: the
//! digits as base-10 symbols and the letters as base-26 symbols with case
//! recorded in the skeleton. The streams are enciphered independently and
//! written back through the skeleton, so separators, length, and character
//! classes survive encryption exactly.

/// Radix of the digit payload stream.
pub const DIGIT_RADIX: u8 = 10;

/// Radix of the letter payload stream.
pub const LETTER_RADIX: u8 = 26;

/// One position of a value's format skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A character carried through verbatim (punctuation, whitespace, or
    /// anything outside ASCII alphanumerics).
    Sep(char),
    /// An ASCII digit.
    Digit,
    /// An ASCII uppercase letter.
    Upper,
    /// An ASCII lowercase letter.
    Lower,
}

/// The format of a value with its payload removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    slots: Vec<Slot>,
}

/// The enciphered portion of a value: digit symbols in `0..10` and letter
/// symbols in `0..26` (case lives in the skeleton).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Digit stream, one symbol per `Slot::Digit`.
    pub digits: Vec<u8>,
    /// Letter stream, one symbol per `Slot::Upper` / `Slot::Lower`.
    pub letters: Vec<u8>,
}

impl Skeleton {
    /// Splits `value` into its skeleton and payload streams.
    #[must_use]
    pub fn split(value: &str) -> (Self, Payload) {
        let mut slots = Vec::with_capacity(value.chars().count());
        let mut digits = Vec::new();
        let mut letters = Vec::new();

        for ch in value.chars() {
            if ch.is_ascii_digit() {
                slots.push(Slot::Digit);
                digits.push(ch as u8 - b'0');
            } else if ch.is_ascii_uppercase() {
                slots.push(Slot::Upper);
                letters.push(ch as u8 - b'A');
            } else if ch.is_ascii_lowercase() {
                slots.push(Slot::Lower);
                letters.push(ch as u8 - b'a');
            } else {
                slots.push(Slot::Sep(ch));
            }
        }

        (Self { slots }, Payload { digits, letters })
    }

    /// Writes payload streams back through the skeleton.
    ///
    /// Callers always pass a payload produced for this skeleton (possibly
    /// enciphered), so stream lengths match by construction; any excess
    /// symbols are ignored and missing symbols fall back to the stream
    /// origin.
    #[must_use]
    pub fn assemble(&self, payload: &Payload) -> String {
        let mut digits = payload.digits.iter().copied();
        let mut letters = payload.letters.iter().copied();
        let mut out = String::with_capacity(self.slots.len());

        for slot in &self.slots {
            match slot {
                Slot::Sep(ch) => out.push(*ch),
                Slot::Digit => {
                    let d = digits.next().unwrap_or(0) % DIGIT_RADIX;
                    out.push((b'0' + d) as char);
                }
                Slot::Upper => {
                    let l = letters.next().unwrap_or(0) % LETTER_RADIX;
                    out.push((b'A' + l) as char);
                }
                Slot::Lower => {
                    let l = letters.next().unwrap_or(0) % LETTER_RADIX;
                    out.push((b'a' + l) as char);
                }
            }
        }
        out
    }

    /// Number of digit slots.
    #[must_use]
    pub fn digit_count(&self) -> usize {
        self.slots.iter().filter(|s| matches!(s, Slot::Digit)).count()
    }

    /// Number of letter slots.
    #[must_use]
    pub fn letter_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Upper | Slot::Lower))
            .count()
    }

    /// Returns true if the skeleton carries no encipherable payload.
    #[must_use]
    pub fn is_all_separators(&self) -> bool {
        self.slots.iter().all(|s| matches!(s, Slot::Sep(_)))
    }
}
