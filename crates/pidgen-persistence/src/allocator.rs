//! ---
//! pid_section: "03-persistence-logging"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Record store abstractions and storage bindings."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::collections::HashSet;

use crate::store::RecordStore;
use crate::Result;

/// Smallest numeric suffix ever issued.
pub const IDENTIFIER_FLOOR: u64 = 1000;

/// Issues `PREFIX-n` identifiers, filling the lowest gap at or above the floor.
///
/// Allocation reserves nothing: only a successful primary append consumes
/// the value, and two allocators over one store can race (single writer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierAllocator {
    prefix: String,
}

impl IdentifierAllocator {
    /// Allocator for identifiers starting with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Configured prefix, without the trailing dash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Render the identifier for suffix `n`.
    pub fn format(&self, n: u64) -> String {
        format!("{}-{n}", self.prefix)
    }

    /// Next free identifier against the current contents of `store`.
    pub fn allocate<S: RecordStore + ?Sized>(&self, store: &S) -> Result<String> {
        Ok(self.next_free(store.scan_identifiers()?))
    }

    /// Smallest `PREFIX-n` with `n >= 1000` absent from `existing`.
    pub fn next_free<I, T>(&self, existing: I) -> String
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let taken: HashSet<u64> = existing
            .into_iter()
            .filter_map(|id| self.suffix_of(id.as_ref()))
            .collect();
        let n = (IDENTIFIER_FLOOR..)
            .find(|n| !taken.contains(n))
            .unwrap_or(IDENTIFIER_FLOOR);
        self.format(n)
    }

    // Only exact `PREFIX-n` spellings occupy a slot; `PREFIX-01000` does not.
    fn suffix_of(&self, id: &str) -> Option<u64> {
        let digits = id.strip_prefix(self.prefix.as_str())?.strip_prefix('-')?;
        let n: u64 = digits.parse().ok()?;
        (n.to_string() == digits).then_some(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_starts_at_floor() {
        let allocator = IdentifierAllocator::new("GKNMH-CERWP");
        assert_eq!(allocator.next_free(Vec::<String>::new()), "GKNMH-CERWP-1000");
    }

    #[test]
    fn smallest_gap_wins() {
        let allocator = IdentifierAllocator::new("GKNMH-CERWP");
        let existing = ["GKNMH-CERWP-1000", "GKNMH-CERWP-1001", "GKNMH-CERWP-1003"];
        assert_eq!(allocator.next_free(existing), "GKNMH-CERWP-1002");
    }

    #[test]
    fn foreign_and_below_floor_ids_are_ignored() {
        let allocator = IdentifierAllocator::new("P");
        let existing = ["P-999", "Q-1000", "P-01000", "P-1000x", "P-1001"];
        assert_eq!(allocator.next_free(existing), "P-1000");
    }

    #[test]
    fn allocation_does_not_reserve() {
        let allocator = IdentifierAllocator::new("P");
        let existing = vec!["P-1000".to_owned()];
        assert_eq!(allocator.next_free(&existing), allocator.next_free(&existing));
    }
}
