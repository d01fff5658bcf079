//! Removal of entries the hardware's default routing already handles.
//!
//! When a packet matches no table entry, the router forwards it out of the
//! link opposite the one it arrived on. An entry whose only job is to do
//! exactly that is dead weight and can be dropped, provided no later entry
//! would start matching the freed keys.

use crate::entry::{intersect, RoutingTableEntry};
use crate::error::MinimisationFailedError;
use std::collections::HashSet;

/// Removes every entry which could be replaced by default routing.
///
/// Returns an error carrying the achieved length if the reduced table is
/// still larger than `target_length`.
pub fn minimise(
    table: &[RoutingTableEntry],
    target_length: Option<usize>,
) -> Result<Vec<RoutingTableEntry>, MinimisationFailedError> {
    // When every entry carries the same mask and no two keys collide, no
    // entry can alias another and the per-entry aliasing scan is skipped.
    let orthogonal = is_orthogonal(table);

    let new_table: Vec<RoutingTableEntry> = table
        .iter()
        .enumerate()
        .filter(|&(i, entry)| !is_defaultable(i, entry, table, orthogonal))
        .map(|(_, entry)| entry.clone())
        .collect();

    match target_length {
        Some(target) if target < new_table.len() => Err(MinimisationFailedError {
            target_length: target,
            final_length: new_table.len(),
            chip: None,
        }),
        _ => Ok(new_table),
    }
}

/// True when all entries share one mask and all keys are distinct, a cheap
/// sufficient condition for "no entry can alias another".
fn is_orthogonal(table: &[RoutingTableEntry]) -> bool {
    let Some(first) = table.first() else {
        return true;
    };
    if table.iter().any(|entry| entry.mask != first.mask) {
        return false;
    }
    let mut keys = HashSet::with_capacity(table.len());
    table.iter().all(|entry| keys.insert(entry.key & entry.mask))
}

/// Determines whether the entry at position `i` may be removed and replaced
/// by default routing.
fn is_defaultable(
    i: usize,
    entry: &RoutingTableEntry,
    table: &[RoutingTableEntry],
    skip_alias_check: bool,
) -> bool {
    // Exactly one source and one sink, and the source may not be local
    // injection.
    if entry.sources.len() != 1 || entry.route.len() != 1 {
        return false;
    }
    let (Some(&Some(source)), Some(&sink)) = (entry.sources.first(), entry.route.first()) else {
        return false;
    };

    // Both ends must be links and the packet must be going straight through.
    if !source.is_link() || !sink.is_link() || source.opposite() != Some(sink) {
        return false;
    }

    // The entry must not be aliased: if any later entry matches a key this
    // one matches, removing this entry would hand those keys to it.
    skip_alias_check
        || !table[i + 1..]
            .iter()
            .any(|other| intersect(entry.key, entry.mask, other.key, other.mask))
}
