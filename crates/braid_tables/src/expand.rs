//! Expansion of ternary entries into explicit key sets.
//!
//! These helpers enumerate the keys an entry (or table) can match by turning
//! wildcard bits into explicit 0/1 entries. They power the
//! [`table_is_subset_of`] correctness check used to validate every
//! minimisation pass, and are practical only on tables whose entries share
//! most of their wildcard bits (the common Xs are never expanded).

use crate::entry::RoutingTableEntry;
use std::collections::HashSet;

/// Returns a mask of the X positions common to every entry: the bits set in
/// no key and no mask.
pub fn get_common_xs(entries: &[RoutingTableEntry]) -> u32 {
    let mut key = 0u32;
    let mut mask = 0u32;
    for entry in entries {
        key |= entry.key;
        mask |= entry.mask;
    }
    !(key | mask)
}

/// Expands every X in `entry` not covered by `ignore_xs` into explicit 0 and
/// 1 entries, most significant bit first (0 before 1).
pub fn expand_entry(entry: &RoutingTableEntry, ignore_xs: u32) -> Vec<RoutingTableEntry> {
    let xs = !entry.key & !entry.mask & !ignore_xs;
    if xs == 0 {
        return vec![entry.clone()];
    }

    // Split on the most significant X and recurse.
    let bit = 1u32 << (31 - xs.leading_zeros());
    let zero = RoutingTableEntry {
        mask: entry.mask | bit,
        ..entry.clone()
    };
    let one = RoutingTableEntry {
        key: entry.key | bit,
        mask: entry.mask | bit,
        ..entry.clone()
    };

    let mut expanded = expand_entry(&zero, ignore_xs);
    expanded.extend(expand_entry(&one, ignore_xs));
    expanded
}

/// Expands all entries over their non-common Xs (or over everything outside
/// `ignore_xs` when given).
///
/// Entries are expanded in table order and keys already produced by an
/// earlier entry are dropped: in a first-match-wins table a later entry
/// never sees those keys, so the output is an orthogonal table equivalent to
/// the input.
pub fn expand_entries(
    entries: &[RoutingTableEntry],
    ignore_xs: Option<u32>,
) -> Vec<RoutingTableEntry> {
    let ignore_xs = ignore_xs.unwrap_or_else(|| get_common_xs(entries));

    let mut seen_keys = HashSet::new();
    let mut expanded = Vec::new();
    for entry in entries {
        for new_entry in expand_entry(entry, ignore_xs) {
            if seen_keys.insert(new_entry.key) {
                expanded.push(new_entry);
            }
        }
    }
    expanded
}

/// Checks that every key matched by every entry of `entries_a` is routed
/// identically by `entries_b`.
///
/// This is the functional-correctness property every minimisation pass must
/// preserve: the minimised table may match more keys than the original, but
/// never differently for a key the original matched.
pub fn table_is_subset_of(entries_a: &[RoutingTableEntry], entries_b: &[RoutingTableEntry]) -> bool {
    // Xs common to all of b never influence its matching, so they do not
    // need to be expanded out of a either.
    let common_xs = get_common_xs(entries_b);

    for entry in expand_entries(entries_a, Some(common_xs)) {
        let matched = entries_b
            .iter()
            .find(|other| entry.key & other.mask == other.key & other.mask);
        match matched {
            Some(other) if other.route == entry.route => continue,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Route;
    use braid_topo::Link;

    fn entry(route: &[Route], key: u32, mask: u32) -> RoutingTableEntry {
        RoutingTableEntry::new(route.iter().copied(), key, mask)
    }

    const N: Route = Route::Link(Link::North);
    const S: Route = Route::Link(Link::South);

    #[test]
    fn common_xs() {
        // 01XX and XX1X share an X only in the least significant bit.
        let entries = vec![
            entry(&[], 0b0100, 0xffff_fff0 | 0b1100),
            entry(&[], 0b0010, 0xffff_fff0 | 0b0010),
        ];
        assert_eq!(get_common_xs(&entries), 0b0001);
    }

    #[test]
    fn expand_entry_splits_unignored_xs() {
        // 01XX with the LSB ignored expands to 010X and 011X.
        let e = entry(&[], 0b0100, 0xffff_fff0 | 0b1100);
        assert_eq!(
            expand_entry(&e, 0xffff_fff1),
            vec![
                entry(&[], 0b0100, 0xffff_fff0 | 0b1110),
                entry(&[], 0b0110, 0xffff_fff0 | 0b1110),
            ]
        );
    }

    #[test]
    fn expand_entry_without_xs_is_identity() {
        let e = entry(&[N], 0b1010, 0xffff_ffff);
        assert_eq!(expand_entry(&e, 0), vec![e]);
    }

    #[test]
    fn expand_entries_retains_common_xs() {
        let entries = vec![
            entry(&[], 0b0100, 0xffff_fff0 | 0b1100), // 01XX
            entry(&[], 0b0010, 0xffff_fff0 | 0b0010), // XX1X
        ];
        assert_eq!(
            expand_entries(&entries, None),
            vec![
                entry(&[], 0b0100, 0xffff_fff0 | 0b1110), // 010X
                entry(&[], 0b0110, 0xffff_fff0 | 0b1110), // 011X
                entry(&[], 0b0010, 0xffff_fff0 | 0b1110), // 001X
                entry(&[], 0b1010, 0xffff_fff0 | 0b1110), // 101X
                entry(&[], 0b1110, 0xffff_fff0 | 0b1110), // 111X
            ]
        );
    }

    #[test]
    fn expand_entries_drops_shadowed_keys() {
        // The second entry's 0000 expansion is unreachable behind the first.
        let entries = vec![
            entry(&[N], 0b0000, 0b1111),
            entry(&[S], 0b0000, 0b1011), // 0X00
        ];
        assert_eq!(
            expand_entries(&entries, Some(0xffff_fff0)),
            vec![
                entry(&[N], 0b0000, 0b1111),
                entry(&[S], 0b0100, 0b1111),
            ]
        );
    }

    #[test]
    fn subset_of_reordered_general_table() {
        let table = vec![
            entry(&[N], 0b0000, 0b1111),
            entry(&[N], 0b0001, 0b1111),
            entry(&[S], 0b0010, 0b1110),
        ];
        let minimised = vec![
            entry(&[S], 0b0010, 0b1110),
            entry(&[N], 0b0000, 0b1110),
        ];
        assert!(table_is_subset_of(&table, &minimised));
    }

    #[test]
    fn subset_is_directional() {
        let original = vec![entry(&[N], 0b0000, 0b1111)];
        let minimised = vec![entry(&[N], 0b0000, 0b1110)];
        assert!(table_is_subset_of(&original, &minimised));
        // The minimised table also matches 0b0001, which the original does
        // not, so the reverse fails.
        assert!(!table_is_subset_of(&minimised, &original));
    }

    #[test]
    fn subset_fails_on_changed_route() {
        let table = vec![entry(&[N], 0b0000, 0b1111)];
        let other = vec![entry(&[S], 0b0000, 0b1111)];
        assert!(!table_is_subset_of(&table, &other));
    }

    #[test]
    fn subset_fails_on_unmatched_key() {
        let table = vec![entry(&[N], 0b0000, 0b1111)];
        assert!(!table_is_subset_of(&table, &[]));
    }
}
