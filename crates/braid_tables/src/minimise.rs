//! Driver applying minimisation methods to one table or to a whole system's
//! tables.
//!
//! Methods are tried cheapest-first and the first to reach the target wins.
//! Per-chip minimisation shares nothing between chips, so the system-wide
//! driver fans the tables out across a rayon thread pool.

use crate::default_routes;
use crate::entry::RoutingTableEntry;
use crate::error::MinimisationFailedError;
use crate::ordered_covering;
use braid_topo::Chip;
use rayon::prelude::*;
use std::collections::HashMap;

/// A table minimisation method: reduces a table, or reports the best length
/// it could reach.
pub type MinimiseFn =
    fn(&[RoutingTableEntry], Option<usize>) -> Result<Vec<RoutingTableEntry>, MinimisationFailedError>;

/// The standard method order: default-route elimination is linear-time and
/// runs first; ordered covering is far more expensive and more general.
pub const DEFAULT_METHODS: &[MinimiseFn] = &[default_routes::minimise, ordered_covering::minimise];

/// Target table lengths for a system's chips.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TargetLengths {
    /// Minimise every table as far as possible.
    #[default]
    Unlimited,
    /// One maximum length applied to every chip.
    Uniform(usize),
    /// Per-chip maximum lengths; chips absent from the map (or mapped to
    /// `None`) are minimised as far as possible.
    PerChip(HashMap<Chip, Option<usize>>),
}

impl TargetLengths {
    /// Returns the target length for the given chip, if any.
    pub fn for_chip(&self, chip: Chip) -> Option<usize> {
        match self {
            TargetLengths::Unlimited => None,
            TargetLengths::Uniform(target) => Some(*target),
            TargetLengths::PerChip(map) => map.get(&chip).copied().flatten(),
        }
    }
}

impl From<usize> for TargetLengths {
    fn from(target: usize) -> TargetLengths {
        TargetLengths::Uniform(target)
    }
}

impl From<Option<usize>> for TargetLengths {
    fn from(target: Option<usize>) -> TargetLengths {
        target.map_or(TargetLengths::Unlimited, TargetLengths::Uniform)
    }
}

impl From<HashMap<Chip, Option<usize>>> for TargetLengths {
    fn from(map: HashMap<Chip, Option<usize>>) -> TargetLengths {
        TargetLengths::PerChip(map)
    }
}

/// The identity method: succeeds only when the table is already strictly
/// below the target, so the driver skips the real minimisers for tables
/// with room to spare.
fn identity(
    table: &[RoutingTableEntry],
    target_length: Option<usize>,
) -> Result<Vec<RoutingTableEntry>, MinimisationFailedError> {
    match target_length {
        Some(target) if table.len() >= target => Err(MinimisationFailedError {
            target_length: target,
            final_length: table.len(),
            chip: None,
        }),
        _ => Ok(table.to_vec()),
    }
}

/// Minimises a single routing table.
///
/// Tries the identity method and then each supplied method in order,
/// returning the first result within `target_length`. When every method
/// fails, the error reports the best length any of them achieved. With a
/// `target_length` of `None`, every method runs and the smallest table wins
/// (on equal lengths, the earliest method's result is kept).
pub fn minimise_table(
    table: &[RoutingTableEntry],
    target_length: Option<usize>,
    methods: &[MinimiseFn],
) -> Result<Vec<RoutingTableEntry>, MinimisationFailedError> {
    let mut all_methods: Vec<MinimiseFn> = Vec::with_capacity(methods.len() + 1);
    all_methods.push(identity);
    all_methods.extend_from_slice(methods);

    match target_length {
        Some(target) => {
            let mut best_achieved = table.len();
            for method in all_methods {
                match method(table, target_length) {
                    Ok(new_table) => return Ok(new_table),
                    Err(failure) => best_achieved = best_achieved.min(failure.final_length),
                }
            }
            Err(MinimisationFailedError {
                target_length: target,
                final_length: best_achieved,
                chip: None,
            })
        }
        None => {
            let mut best: Option<Vec<RoutingTableEntry>> = None;
            for method in all_methods {
                if let Ok(new_table) = method(table, None) {
                    if best.as_ref().map_or(true, |b| new_table.len() < b.len()) {
                        best = Some(new_table);
                    }
                }
            }
            // The identity method always succeeds without a target.
            Ok(best.unwrap_or_else(|| table.to_vec()))
        }
    }
}

/// Minimises the routing tables of a whole system, one chip at a time.
///
/// Chips are independent and are processed in parallel. Chips whose
/// minimised table is empty are omitted from the result. On failure, the
/// error carries the coordinates of the offending chip.
pub fn minimise_tables(
    tables: &HashMap<Chip, Vec<RoutingTableEntry>>,
    target_lengths: &TargetLengths,
    methods: &[MinimiseFn],
) -> Result<HashMap<Chip, Vec<RoutingTableEntry>>, MinimisationFailedError> {
    tables
        .par_iter()
        .map(|(&chip, table)| {
            let minimised = minimise_table(table, target_lengths.for_chip(chip), methods)
                .map_err(|failure| MinimisationFailedError {
                    chip: Some(chip),
                    ..failure
                })?;
            Ok((chip, minimised))
        })
        .filter(|result| !matches!(result, Ok((_, table)) if table.is_empty()))
        .collect()
}
