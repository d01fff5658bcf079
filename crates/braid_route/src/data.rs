//! Input data structures for the router.
//!
//! Placements and core allocations are produced by external collaborators
//! (a placer and an allocator); the router consumes them as read-only maps.

use crate::ids::VertexId;
use braid_topo::Chip;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chip assignments for every vertex, as produced by a placer.
pub type Placements = HashMap<VertexId, Chip>;

/// Core assignments for sink vertices, as produced by an allocator.
/// Vertices absent from the map terminate without a core route.
pub type Allocations = HashMap<VertexId, CoreRange>;

/// One multicast communication intent: a source vertex fanning out to many
/// sink vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    /// The vertex originating the traffic.
    pub source: VertexId,
    /// The vertices the traffic must reach.
    pub sinks: Vec<VertexId>,
    /// Application-assigned traffic weight. Carried for consumers such as
    /// placers and visualisers; the routing algorithms do not read it.
    pub weight: f32,
}

impl Net {
    /// Creates a net with the default weight of 1.
    pub fn new(source: VertexId, sinks: impl IntoIterator<Item = VertexId>) -> Net {
        Net {
            source,
            sinks: sinks.into_iter().collect(),
            weight: 1.0,
        }
    }
}

/// A contiguous range of cores allocated to a vertex, `start` inclusive to
/// `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreRange {
    /// First core in the range.
    pub start: u8,
    /// One past the last core in the range.
    pub end: u8,
}

impl CoreRange {
    /// Creates the range `start..end`.
    pub fn new(start: u8, end: u8) -> CoreRange {
        CoreRange { start, end }
    }

    /// Number of cores in the range.
    pub fn len(self) -> usize {
        usize::from(self.end.saturating_sub(self.start))
    }

    /// True when the range allocates no cores.
    pub fn is_empty(self) -> bool {
        self.end <= self.start
    }
}

/// Tunable parameters for the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterOptions {
    /// Radius of the concentric neighbour search performed around each sink
    /// before falling back to routing from the source. Zero degenerates to
    /// plain longest-dimension-first routing. The default of 20 follows the
    /// NER paper's evaluation.
    pub radius: u32,
}

impl Default for RouterOptions {
    fn default() -> RouterOptions {
        RouterOptions { radius: 20 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_default_weight() {
        let net = Net::new(VertexId::from_raw(0), [VertexId::from_raw(1)]);
        assert_eq!(net.weight, 1.0);
        assert_eq!(net.sinks.len(), 1);
    }

    #[test]
    fn core_range_len() {
        assert_eq!(CoreRange::new(1, 4).len(), 3);
        assert!(CoreRange::new(2, 2).is_empty());
        assert_eq!(CoreRange::new(5, 3).len(), 0);
    }

    #[test]
    fn router_options_default_radius() {
        assert_eq!(RouterOptions::default().radius, 20);
    }

    #[test]
    fn serde_roundtrip() {
        let net = Net::new(VertexId::from_raw(3), [VertexId::from_raw(4), VertexId::from_raw(5)]);
        let json = serde_json::to_string(&net).unwrap();
        let restored: Net = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, net);
    }
}
