//! Ordered-covering routing table minimisation.
//!
//! Entries with identical destination sets are merged into single, more
//! general entries. The table is kept sorted by increasing generality and a
//! merged entry is inserted at the end of its generality class, so specific
//! entries always match before the general entries that cover them. A merge
//! is only applied after it has been *refined*: candidate entries are
//! removed from it until the merged entry cannot capture keys belonging to
//! any other entry, judged against the original table via the alias map
//! rather than the already-reduced one.
//!
//! The alias map records, for every merged entry currently in the table, the
//! original `(key, mask)` pairs it subsumes. Callers that feed tables
//! through several minimisation stages can thread it between them.

use crate::default_routes;
use crate::entry::{generality, intersect, RoutingTableEntry};
use crate::error::MinimisationFailedError;
use std::collections::{BTreeMap, BTreeSet};

/// A `(key, mask)` pair identifying one ternary match expression.
pub type KeyMask = (u32, u32);

/// For each merged entry present in a table, the original entries it
/// subsumes.
pub type AliasMap = BTreeMap<KeyMask, BTreeSet<KeyMask>>;

/// Minimises a routing table by merging entries and then removing any
/// remaining default routes.
///
/// Merging alone may leave the table above `target_length` when the
/// remaining entries are straight-through routes the hardware handles
/// implicitly, so the default-route pass runs with the same target and has
/// the final say.
pub fn minimise(
    table: &[RoutingTableEntry],
    target_length: Option<usize>,
) -> Result<Vec<RoutingTableEntry>, MinimisationFailedError> {
    let (table, _aliases) = ordered_covering(table, target_length, &AliasMap::new(), true)?;
    default_routes::minimise(&table, target_length)
}

/// Reduces the size of a routing table by merging entries together.
///
/// Returns the minimised table along with the updated alias map. With
/// `target_length` of `None`, merging continues until no beneficial merge
/// remains. Otherwise merging stops once the table is short enough; if no
/// sequence of merges achieves that and `no_raise` is false, a
/// [`MinimisationFailedError`] reports the best length reached.
pub fn ordered_covering(
    table: &[RoutingTableEntry],
    target_length: Option<usize>,
    aliases: &AliasMap,
    no_raise: bool,
) -> Result<(Vec<RoutingTableEntry>, AliasMap), MinimisationFailedError> {
    let mut aliases = aliases.clone();

    // Keep the table ordered by increasing generality so that specific
    // entries are always hit before general ones.
    let mut table = table.to_vec();
    table.sort_by_key(RoutingTableEntry::generality);

    while target_length.map_or(true, |target| table.len() > target) {
        let Some(merge) = best_merge(&table, &aliases) else {
            break;
        };
        let (new_table, new_aliases) = apply_merge(&table, &merge, &aliases);
        table = new_table;
        aliases = new_aliases;
    }

    if !no_raise {
        if let Some(target) = target_length {
            if table.len() > target {
                return Err(MinimisationFailedError {
                    target_length: target,
                    final_length: table.len(),
                    chip: None,
                });
            }
        }
    }

    Ok((table, aliases))
}

/// A proposed merge of table entries with equal routes, together with the
/// key, mask and position the combined entry would take.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Merge {
    /// Indices of the entries to be merged.
    entries: BTreeSet<usize>,
    key: u32,
    mask: u32,
    generality: u32,
    /// Where the merged entry is inserted: the end of its generality class.
    insertion_index: usize,
}

impl Merge {
    fn new(table: &[RoutingTableEntry], entries: BTreeSet<usize>) -> Merge {
        let mut any_ones = 0u32;
        let mut all_ones = u32::MAX;
        let mut all_selected = u32::MAX;
        for &i in &entries {
            any_ones |= table[i].key;
            all_ones &= table[i].key;
            all_selected &= table[i].mask;
        }

        // Bits on which the keys disagree become Xs; the rest keep the
        // members' mask bits.
        let disagreements = any_ones & !all_ones;
        let mask = all_selected & !disagreements;
        let key = all_ones & mask;
        let generality = generality(key, mask);

        Merge {
            entries,
            key,
            mask,
            generality,
            insertion_index: insertion_index(table, generality),
        }
    }

    /// Entries removed from the table by applying this merge.
    fn goodness(&self) -> i64 {
        self.entries.len() as i64 - 1
    }
}

/// Returns the index at which an entry of the given generality is inserted:
/// after every entry of lower or equal generality.
fn insertion_index(table: &[RoutingTableEntry], generality: u32) -> usize {
    table.partition_point(|entry| entry.generality() <= generality)
}

/// Yields the maximal candidate merges: for each entry not yet considered,
/// the set of all later entries sharing its route set.
fn candidate_merges(table: &[RoutingTableEntry]) -> Vec<Merge> {
    let mut considered = vec![false; table.len()];
    let mut merges = Vec::new();

    for i in 0..table.len() {
        if considered[i] {
            continue;
        }
        let mut entries = BTreeSet::from([i]);
        for (j, other) in table.iter().enumerate().skip(i + 1) {
            if other.route == table[i].route {
                entries.insert(j);
            }
        }
        for &j in &entries {
            considered[j] = true;
        }
        if entries.len() > 1 {
            merges.push(Merge::new(table, entries));
        }
    }
    merges
}

/// Refines every candidate merge and returns the one eliminating the most
/// entries, or `None` when no refined candidate eliminates any.
///
/// Candidates are inspected in table order and only a strictly better merge
/// displaces the current best, so selection is deterministic.
fn best_merge(table: &[RoutingTableEntry], aliases: &AliasMap) -> Option<Merge> {
    let mut best: Option<Merge> = None;
    let mut best_goodness = 0;

    for merge in candidate_merges(table) {
        let refined = refine_merge(table, merge, aliases, best_goodness);
        if refined.goodness() > best_goodness {
            best_goodness = refined.goodness();
            best = Some(refined);
        }
    }
    best
}

/// Removes entries from a merge until applying it cannot change the routing
/// of any key the original table matched.
///
/// Refinement stops early once the merge is no better than `min_goodness`
/// since the caller will discard it anyway.
fn refine_merge(
    table: &[RoutingTableEntry],
    merge: Merge,
    aliases: &AliasMap,
    min_goodness: i64,
) -> Merge {
    let mut merge = refine_downcheck(table, merge, aliases, min_goodness);

    if merge.goodness() > min_goodness {
        let (refined, changed) = refine_upcheck(table, merge, min_goodness);
        merge = refined;

        if changed && merge.goodness() > min_goodness {
            // Removing entries changed the merged expression, so entries
            // below the new insertion point must be re-checked.
            merge = refine_downcheck(table, merge, aliases, min_goodness);
        }
    }
    merge
}

/// Removes from the merge any member which, moved down to the insertion
/// point, would be shadowed by an entry currently between its position and
/// that point.
///
/// For example, `1000 -> N` cannot join a merge inserted below `X000 -> NE`:
/// the keys it matched would start hitting `X000` first.
fn refine_upcheck(table: &[RoutingTableEntry], mut merge: Merge, min_goodness: i64) -> (Merge, bool) {
    let mut changed = false;
    let members: Vec<usize> = merge.entries.iter().rev().copied().collect();

    for i in members {
        let entry = &table[i];
        let shadowed = (i + 1..merge.insertion_index)
            .any(|j| {
                !merge.entries.contains(&j)
                    && intersect(entry.key, entry.mask, table[j].key, table[j].mask)
            });
        if shadowed {
            let mut entries = merge.entries.clone();
            entries.remove(&i);
            merge = Merge::new(table, entries);
            changed = true;

            if merge.goodness() <= min_goodness {
                break;
            }
        }
    }
    (merge, changed)
}

/// Shrinks the merge until the merged entry captures no key belonging to an
/// entry below its insertion point.
///
/// Covered entries are judged at the alias level, i.e. against the original
/// table's expressions. When a covered pair is found, the merge is
/// restricted to members holding a definite bit value that conflicts with
/// it (picking the bit retaining the most members); when no such restriction
/// leaves two members, the merge is rejected outright.
fn refine_downcheck(
    table: &[RoutingTableEntry],
    mut merge: Merge,
    aliases: &AliasMap,
    min_goodness: i64,
) -> Merge {
    while merge.goodness() > min_goodness {
        let Some((covered_key, covered_mask)) = first_covered(table, &merge, aliases) else {
            return merge;
        };

        let mut best_restriction: Option<BTreeSet<usize>> = None;
        for bit in (0..32).map(|b| 1u32 << b) {
            // Only bits where the covered expression is definite and the
            // merged expression is an X can break the overlap. (On a
            // definite bit they already agree, or there would be no
            // overlap.)
            if covered_mask & bit == 0 || merge.mask & bit != 0 {
                continue;
            }
            let wanted = covered_key & bit == 0;

            let retained: BTreeSet<usize> = merge
                .entries
                .iter()
                .copied()
                .filter(|&i| {
                    table[i].mask & bit != 0 && ((table[i].key & bit != 0) == wanted)
                })
                .collect();
            if retained.len() >= 2
                && best_restriction
                    .as_ref()
                    .map_or(true, |best| retained.len() > best.len())
            {
                best_restriction = Some(retained);
            }
        }

        match best_restriction {
            Some(entries) => merge = Merge::new(table, entries),
            None => return Merge::new(table, BTreeSet::new()),
        }
    }
    merge
}

/// Finds the first original `(key, mask)` expression below the merge's
/// insertion point which the merged entry would capture keys from.
fn first_covered(table: &[RoutingTableEntry], merge: &Merge, aliases: &AliasMap) -> Option<KeyMask> {
    for (i, entry) in table.iter().enumerate().skip(merge.insertion_index) {
        if merge.entries.contains(&i) {
            continue;
        }
        let key_mask = (entry.key, entry.mask);
        match aliases.get(&key_mask) {
            Some(originals) => {
                for &(key, mask) in originals {
                    if intersect(merge.key, merge.mask, key, mask) {
                        return Some((key, mask));
                    }
                }
            }
            None => {
                if intersect(merge.key, merge.mask, key_mask.0, key_mask.1) {
                    return Some(key_mask);
                }
            }
        }
    }
    None
}

/// Applies a merge, producing the reduced table and the updated alias map.
fn apply_merge(
    table: &[RoutingTableEntry],
    merge: &Merge,
    aliases: &AliasMap,
) -> (Vec<RoutingTableEntry>, AliasMap) {
    let mut aliases = aliases.clone();

    let Some(&first) = merge.entries.first() else {
        return (table.to_vec(), aliases);
    };
    let new_entry = RoutingTableEntry {
        route: table[first].route.clone(),
        key: merge.key,
        mask: merge.mask,
        sources: merge
            .entries
            .iter()
            .flat_map(|&i| table[i].sources.iter().copied())
            .collect(),
    };

    let mut merged_aliases = BTreeSet::new();
    let mut new_table = Vec::with_capacity(table.len() - merge.entries.len() + 1);
    for (i, entry) in table.iter().enumerate() {
        if i == merge.insertion_index {
            new_table.push(new_entry.clone());
        }
        if merge.entries.contains(&i) {
            // Fold the member's aliases (or the member itself) into the
            // merged entry's alias set.
            let key_mask = (entry.key, entry.mask);
            match aliases.remove(&key_mask) {
                Some(originals) => merged_aliases.extend(originals),
                None => {
                    merged_aliases.insert(key_mask);
                }
            }
        } else {
            new_table.push(entry.clone());
        }
    }
    if merge.insertion_index == table.len() {
        new_table.push(new_entry);
    }
    aliases.insert((merge.key, merge.mask), merged_aliases);

    (new_table, aliases)
}
