//! The selection set: items a user has picked for export.
//!
//! Entries are unique by id and kept in insertion order for display.
//! Re-adding an id that is already present is a no-op, so the first write
//! for an id wins; after an explicit [`remove`](SelectionSet::remove) the id
//! may be added again.

use std::collections::HashSet;

use crate::models::TaxonomyItem;

/// Lower bound of the cosmetic audience estimate.
const ESTIMATE_MIN: u64 = 50_000;
/// Exclusive upper bound of the cosmetic audience estimate.
const ESTIMATE_MAX: u64 = 5_000_000;

/// Ordered, id-deduplicated collection of [`TaxonomyItem`]s.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    items: Vec<TaxonomyItem>,
    ids: HashSet<String>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` unless its id is already present.
    ///
    /// Returns `true` if the item was inserted.
    pub fn add(&mut self, item: TaxonomyItem) -> bool {
        if self.ids.contains(&item.id) {
            return false;
        }
        self.ids.insert(item.id.clone());
        self.items.push(item);
        true
    }

    /// Add each item in order, skipping ids already present.
    ///
    /// Returns the number of items inserted.
    pub fn add_many<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = TaxonomyItem>,
    {
        let mut added = 0;
        for item in items {
            if self.add(item) {
                added += 1;
            }
        }
        added
    }

    /// Remove the entry with `id`. Returns `true` if one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.ids.remove(id) {
            return false;
        }
        self.items.retain(|item| item.id != id);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&TaxonomyItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaxonomyItem> {
        self.items.iter()
    }

    /// Entries in insertion order.
    pub fn items(&self) -> &[TaxonomyItem] {
        &self.items
    }
}

/// Cosmetic audience figure for an item whose real size is unknown.
///
/// Derived from a 31-multiplier rolling hash of the id's UTF-16 code units,
/// so a given id always yields the same number in `[50_000, 5_000_000)`.
/// Never a real audience figure; display it with a `~` prefix.
pub fn estimate_audience_size(id: &str) -> u64 {
    let hash = id
        .encode_utf16()
        .fold(0u32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as u32));
    ESTIMATE_MIN + (hash as u64 % (ESTIMATE_MAX - ESTIMATE_MIN))
}

/// Human display of an item's audience: the real figure with thousands
/// separators, or `~estimate` when unknown.
pub fn display_audience(item: &TaxonomyItem) -> String {
    match item.audience_size {
        Some(size) => group_thousands(size),
        None => format!("~{}", group_thousands(estimate_audience_size(&item.id))),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str) -> TaxonomyItem {
        TaxonomyItem::new(id, name, None)
    }

    #[test]
    fn test_add_dedups_by_id() {
        let mut set = SelectionSet::new();
        assert!(set.add(item("1", "Coffee")));
        assert!(!set.add(item("1", "Coffee (renamed)")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("1").unwrap().name, "Coffee");
    }

    #[test]
    fn test_add_many_first_write_wins() {
        let mut set = SelectionSet::new();
        set.add(item("2", "Tea"));
        let added = set.add_many(vec![
            item("1", "Coffee"),
            item("2", "Green tea"),
            item("1", "Espresso"),
            item("3", "Juice"),
        ]);
        assert_eq!(added, 2);
        let ids: Vec<&str> = set.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
        assert_eq!(set.get("2").unwrap().name, "Tea");
        assert_eq!(set.get("1").unwrap().name, "Coffee");
    }

    #[test]
    fn test_never_holds_duplicate_ids() {
        let mut set = SelectionSet::new();
        for round in 0..5 {
            for id in 0..10 {
                set.add(item(&id.to_string(), &format!("round {}", round)));
            }
            set.add_many((0..20).map(|id| item(&id.to_string(), "bulk")));
        }
        let unique: HashSet<&str> = set.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(unique.len(), set.len());
        assert_eq!(set.len(), 20);
        assert_eq!(set.get("3").unwrap().name, "round 0");
    }

    #[test]
    fn test_remove_then_add_restores() {
        let mut set = SelectionSet::new();
        set.add(item("1", "Coffee"));
        set.add(item("2", "Tea"));
        assert!(set.remove("1"));
        assert!(!set.contains("1"));
        assert!(!set.remove("1"));
        assert!(set.add(item("1", "Coffee again")));
        assert_eq!(set.get("1").unwrap().name, "Coffee again");
        let ids: Vec<&str> = set.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[test]
    fn test_clear() {
        let mut set = SelectionSet::new();
        set.add_many(vec![item("1", "a"), item("2", "b")]);
        set.clear();
        assert!(set.is_empty());
        assert!(set.add(item("1", "a")));
    }

    #[test]
    fn test_estimate_is_stable_and_in_range() {
        let a = estimate_audience_size("6003139266461");
        assert_eq!(a, estimate_audience_size("6003139266461"));
        assert!((ESTIMATE_MIN..ESTIMATE_MAX).contains(&a));
        assert_eq!(estimate_audience_size(""), ESTIMATE_MIN);
    }

    #[test]
    fn test_estimate_matches_rolling_hash() {
        // "ab" → 97 * 31 + 98 = 3105
        assert_eq!(estimate_audience_size("ab"), ESTIMATE_MIN + 3105);
    }

    #[test]
    fn test_display_audience() {
        assert_eq!(display_audience(&TaxonomyItem::new("1", "x", Some(1234567))), "1,234,567");
        assert_eq!(display_audience(&TaxonomyItem::new("1", "x", Some(999))), "999");
        let est = display_audience(&item("ab", "x"));
        assert_eq!(est, "~53,105");
    }
}
