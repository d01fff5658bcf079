//! Error type for table minimisation.

use braid_topo::Chip;
use std::fmt;

/// Raised when a routing table could not be minimised to reach a specified
/// target length.
///
/// Carries the best length any method achieved so callers can judge how far
/// off the target was. When minimisation is performed across many chips at
/// once, the driver attaches the coordinates of the first offending chip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct MinimisationFailedError {
    /// The target number of routing entries.
    pub target_length: usize,
    /// The number of entries reached when the algorithm completed
    /// (`final_length > target_length`).
    pub final_length: usize,
    /// The chip whose table first failed to minimise, when minimising many
    /// tables at once.
    pub chip: Option<Chip>,
}

impl fmt::Display for MinimisationFailedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chip {
            Some((x, y)) => write!(
                f,
                "could not minimise routing table for ({x}, {y}) to fit in {} entries, \
                 best achieved was {}",
                self.target_length, self.final_length
            ),
            None => write!(
                f,
                "could not minimise routing table to fit in {} entries, best achieved was {}",
                self.target_length, self.final_length
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_chip() {
        let err = MinimisationFailedError {
            target_length: 1024,
            final_length: 1131,
            chip: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("1024"));
        assert!(msg.contains("1131"));
        assert!(!msg.contains("for ("));
    }

    #[test]
    fn display_with_chip() {
        let err = MinimisationFailedError {
            target_length: 2,
            final_length: 3,
            chip: Some((4, 7)),
        };
        let msg = err.to_string();
        assert!(msg.contains("(4, 7)"));
        assert!(msg.contains("fit in 2 entries"));
    }
}
