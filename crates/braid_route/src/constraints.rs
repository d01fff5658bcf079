//! Constraints a router must respect.

use crate::ids::VertexId;
use braid_tables::Route;
use braid_topo::Chip;
use serde::{Deserialize, Serialize};

/// A constraint supplied alongside the nets to be routed.
///
/// All constraints defined here should be respected by any routing
/// algorithm; individual algorithms may define implementation-specific
/// constraints separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// Unconditionally place a vertex on a specific chip.
    ///
    /// Enforced by the placer; routers receive it for completeness and
    /// ignore it, trusting the placements they are given.
    Location {
        /// The constrained vertex.
        vertex: VertexId,
        /// The chip the vertex must be placed on.
        chip: Chip,
    },
    /// Terminate routes to a vertex at a specific destination instead of
    /// the vertex's allocated cores.
    ///
    /// Typically used for off-board peripherals: traffic for a device
    /// vertex is routed to the chip the vertex is placed on and then out of
    /// the given link.
    RouteEndpoint {
        /// The constrained sink vertex.
        vertex: VertexId,
        /// The destination routes to the vertex must end at.
        route: Route,
    },
}
