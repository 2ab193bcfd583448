//! Sets of Linux capability names.

use std::collections::HashSet;

/// A set of capability names (e.g. `NET_RAW`).
///
/// Membership is O(1); use [`CapabilitySet::sorted`] whenever the
/// contents end up in a report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    caps: HashSet<String>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list of capabilities. Duplicates collapse.
    pub fn from_list<I, S>(caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            caps: caps.into_iter().map(Into::into).collect(),
        }
    }

    /// Union of any number of sets.
    pub fn merge<'a, I>(sets: I) -> Self
    where
        I: IntoIterator<Item = &'a CapabilitySet>,
    {
        let mut merged = HashSet::new();
        for set in sets {
            merged.extend(set.caps.iter().cloned());
        }
        Self { caps: merged }
    }

    pub fn contains(&self, cap: &str) -> bool {
        self.caps.contains(cap)
    }

    /// Case-insensitive membership, for values like `ALL`/`all`.
    pub fn contains_ignore_case(&self, cap: &str) -> bool {
        self.caps.iter().any(|c| c.eq_ignore_ascii_case(cap))
    }

    pub fn len(&self) -> usize {
        self.caps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.caps.iter().map(String::as_str)
    }

    /// Capabilities in ascending lexicographic order.
    pub fn sorted(&self) -> Vec<String> {
        let mut sorted: Vec<String> = self.caps.iter().cloned().collect();
        sorted.sort();
        sorted
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_list(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_duplicates_collapse() {
        let set = CapabilitySet::from_list(["NET_RAW", "CHOWN", "NET_RAW"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("NET_RAW"));
        assert!(!set.contains("net_raw"));
        assert!(set.contains_ignore_case("net_raw"));
    }

    #[test]
    fn test_merge_and_sort() {
        let added = CapabilitySet::from_list(["SYS_ADMIN", "NET_ADMIN"]);
        let not_dropped = CapabilitySet::from_list(["CHOWN", "NET_ADMIN"]);
        let merged = CapabilitySet::merge([&added, &not_dropped]);
        assert_eq!(merged.sorted(), vec!["CHOWN", "NET_ADMIN", "SYS_ADMIN"]);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = CapabilitySet::merge(std::iter::empty::<&CapabilitySet>());
        assert!(merged.is_empty());
        assert!(merged.sorted().is_empty());
    }

    fn arb_set() -> impl Strategy<Value = CapabilitySet> {
        prop::collection::vec("[A-Z_]{1,12}", 0..12).prop_map(CapabilitySet::from_list)
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a in arb_set(), b in arb_set()) {
            prop_assert_eq!(CapabilitySet::merge([&a, &b]), CapabilitySet::merge([&b, &a]));
        }

        #[test]
        fn merge_is_idempotent(a in arb_set()) {
            prop_assert_eq!(CapabilitySet::merge([&a, &a]), a);
        }

        #[test]
        fn sorted_merge_is_the_ordered_union(a in arb_set(), b in arb_set()) {
            let sorted = CapabilitySet::merge([&a, &b]).sorted();
            for pair in sorted.windows(2) {
                prop_assert!(pair[0] < pair[1]);
            }
            for cap in a.iter().chain(b.iter()) {
                prop_assert!(sorted.iter().any(|c| c == cap));
            }
            for cap in &sorted {
                prop_assert!(a.contains(cap) || b.contains(cap));
            }
        }
    }
}
