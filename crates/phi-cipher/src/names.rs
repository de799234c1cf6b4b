//! Keyed deterministic name substitution.
//!
//! Person names cannot go through algebraic FPE without producing
//! gibberish, so they are replaced with entries from curated name lists
//! instead. The pick is a keyed hash of the input, so the same name under
//! the same key always maps to the same substitute across sessions, and
//! different keys produce unrelated substitutions. The map is many-to-one;
//! inversion works only through the reverse index recorded as
//! substitutions happen.

use crate::{CipherError, CipherResult};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Substitute first names.
const FIRST_NAMES: &[&str] = &[
    "Arjun", "Rahul", "Amit", "Vikram", "Rajesh", "Suresh", "Anil", "Ravi",
    "Karthik", "Sanjay", "Manoj", "Deepak", "Nikhil", "Rohan", "Ashwin",
    "Vivek", "Anand", "Harish", "Prakash", "Ganesh", "Priya", "Anjali",
    "Neha", "Kavita", "Sunita", "Rekha", "Meena", "Asha", "Divya", "Pooja",
    "Swati", "Nisha", "Ritu", "Geeta", "Smita", "Shweta", "Anita", "Maya",
    "Radha", "Sita",
];

/// Substitute last names.
const LAST_NAMES: &[&str] = &[
    "Kumar", "Singh", "Sharma", "Patel", "Reddy", "Nair", "Iyer", "Rao",
    "Gupta", "Verma", "Menon", "Shah", "Desai", "Joshi", "Agarwal",
    "Chopra", "Malhotra", "Kapoor", "Mehta", "Pillai",
];

/// Substitute clinician names, picked whole so the title reads naturally.
const DOCTOR_NAMES: &[&str] = &[
    "Dr. Priya Mehta", "Dr. Rajesh Kumar", "Dr. Anita Sharma",
    "Dr. Vikram Singh", "Dr. Sunita Patel", "Dr. Anil Reddy",
    "Dr. Kavita Nair", "Dr. Manoj Iyer", "Dr. Neha Gupta", "Dr. Arjun Rao",
    "Dr. Pooja Verma", "Dr. Rahul Desai",
];

#[derive(Debug, Default)]
struct SubstitutionTable {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

/// Deterministic keyed substituter for person names.
#[derive(Debug)]
pub struct NameSubstituter {
    key: [u8; 32],
    table: RwLock<SubstitutionTable>,
}

impl NameSubstituter {
    /// Creates a substituter keyed with the PERSON-domain subkey of a key
    /// epoch.
    #[must_use]
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key,
            table: RwLock::new(SubstitutionTable::default()),
        }
    }

    /// Substitutes a person name, recording the pair in the reverse index.
    ///
    /// Names carrying a clinician title are replaced with a whole entry
    /// from the clinician list; other names are rebuilt from keyed picks
    /// of the first and last name lists.
    #[must_use]
    pub fn substitute(&self, name: &str) -> String {
        if let Some(existing) = self.table.read().forward.get(name) {
            return existing.clone();
        }

        let substitute = self.pick(name);
        let mut table = self.table.write();
        // Lost the race: another thread may have bound this name already.
        if let Some(existing) = table.forward.get(name) {
            return existing.clone();
        }
        table.forward.insert(name.to_string(), substitute.clone());
        match table.reverse.get(&substitute) {
            Some(prior) if prior != name => {
                // Many-to-one collision. The first binding wins so restore
                // stays unambiguous for the earlier name.
                tracing::warn!(
                    substitute = %substitute,
                    "substitute name collision; keeping first recorded original"
                );
            }
            Some(_) => {}
            None => {
                table.reverse.insert(substitute.clone(), name.to_string());
            }
        }
        substitute
    }

    /// Looks up the original behind a substitute name.
    ///
    /// # Errors
    /// Returns [`CipherError::NotInvertible`] if the substitute was never
    /// produced by this substituter.
    pub fn lookup_original(&self, substitute: &str) -> CipherResult<String> {
        self.table
            .read()
            .reverse
            .get(substitute)
            .cloned()
            .ok_or(CipherError::NotInvertible)
    }

    /// Snapshot of the substitute-to-original index.
    #[must_use]
    pub fn reverse_index(&self) -> HashMap<String, String> {
        self.table.read().reverse.clone()
    }

    fn pick(&self, name: &str) -> String {
        let trimmed = name.trim();
        let lowered = trimmed.to_lowercase();
        if lowered.starts_with("dr.") || lowered.starts_with("doctor") {
            return DOCTOR_NAMES[self.index(trimmed, DOCTOR_NAMES.len())].to_string();
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        match parts.as_slice() {
            [] => String::new(),
            [single] => FIRST_NAMES[self.index(single, FIRST_NAMES.len())].to_string(),
            [first, .., last] => {
                let fake_first = FIRST_NAMES[self.index(first, FIRST_NAMES.len())];
                let fake_last = LAST_NAMES[self.index(last, LAST_NAMES.len())];
                format!("{fake_first} {fake_last}")
            }
        }
    }

    /// Keyed index into a list: the same part under the same key always
    /// lands on the same entry.
    fn index(&self, part: &str, len: usize) -> usize {
        let hash = blake3::keyed_hash(&self.key, part.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_be_bytes(raw) % len as u64) as usize
    }
}
