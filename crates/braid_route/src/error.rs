//! Error types for route construction.

use braid_topo::Chip;

/// Errors produced while building routing trees.
///
/// Both variants indicate genuine infeasibility (topology or constraints),
/// not transient faults: callers should relax the offending input or fail
/// the overall build rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// No alive path connects two chips a net needs to span.
    #[error("machine has a disconnected subregion: no path from {from:?} to {to:?}")]
    MachineHasDisconnectedSubregion {
        /// Chip the search started from.
        from: Chip,
        /// Chip the search was aiming for.
        to: Chip,
    },

    /// A supplied constraint cannot be satisfied with the given placements
    /// and machine.
    #[error("invalid constraint: {reason}")]
    InvalidConstraint {
        /// Description of the conflict.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_display() {
        let err = RouteError::MachineHasDisconnectedSubregion {
            from: (0, 0),
            to: (3, 4),
        };
        let msg = err.to_string();
        assert!(msg.contains("(0, 0)"));
        assert!(msg.contains("(3, 4)"));
    }

    #[test]
    fn invalid_constraint_display() {
        let err = RouteError::InvalidConstraint {
            reason: "endpoint link is dead".to_string(),
        };
        assert!(err.to_string().contains("endpoint link is dead"));
    }
}
