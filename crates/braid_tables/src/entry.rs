//! Forwarding-table entries and the destinations they route to.

use braid_topo::Link;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A destination a packet can be forwarded to after arriving at a chip's
/// router: one of the six chip-to-chip links, or one of the chip's local
/// cores.
///
/// The hardware numbers destinations consecutively: links take indices 0-5
/// and core `n` takes index `6 + n`. Core 0 is the monitor core; cores 1-17
/// are the application cores. The derived ordering follows the hardware
/// index, so sets of routes order deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Route {
    /// Forward down a chip-to-chip link.
    Link(Link),
    /// Terminate at a local core (0-17).
    Core(u8),
}

impl Route {
    /// The highest valid core number.
    pub const MAX_CORE: u8 = 17;

    /// Returns the route terminating at the numbered core, or `None` when
    /// the number is outside 0-17.
    pub fn core(num: u8) -> Option<Route> {
        (num <= Self::MAX_CORE).then_some(Route::Core(num))
    }

    /// True iff this route crosses a chip-to-chip link.
    pub fn is_link(self) -> bool {
        matches!(self, Route::Link(_))
    }

    /// True iff this route terminates at a core.
    pub fn is_core(self) -> bool {
        matches!(self, Route::Core(_))
    }

    /// Returns the core number being routed to, or `None` for a link route.
    pub fn core_num(self) -> Option<u8> {
        match self {
            Route::Core(num) => Some(num),
            Route::Link(_) => None,
        }
    }

    /// Returns the route down the opposite link, or `None` for a core route.
    pub fn opposite(self) -> Option<Route> {
        match self {
            Route::Link(link) => Some(Route::Link(link.opposite())),
            Route::Core(_) => None,
        }
    }

    /// Returns the hardware destination index: 0-5 for links, `6 + n` for
    /// core `n`.
    pub fn index(self) -> u8 {
        match self {
            Route::Link(link) => link.index(),
            Route::Core(num) => 6 + num,
        }
    }
}

impl From<Link> for Route {
    fn from(link: Link) -> Route {
        Route::Link(link)
    }
}

/// One ternary entry in a chip's forwarding table.
///
/// An entry matches a 32-bit packet key `k` iff `k & mask == key & mask`;
/// a zero mask bit is a wildcard ("X"). Tables are ordered and the first
/// matching entry wins.
///
/// `sources` records the directions packets matching this entry can arrive
/// from, as the link pointing back the way the packet came (`None` marks
/// packets injected locally at this chip). It takes no part in matching; it
/// exists so minimisers can recognise entries that hardware default routing
/// would handle anyway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutingTableEntry {
    /// The set of destinations matching packets are forwarded to.
    pub route: BTreeSet<Route>,
    /// 32-bit key compared against packet keys under the mask.
    pub key: u32,
    /// 32-bit mask selecting which key bits participate in the match.
    pub mask: u32,
    /// Directions from which matching packets can arrive.
    pub sources: BTreeSet<Option<Route>>,
}

impl RoutingTableEntry {
    /// Creates an entry with the given destinations and no recorded sources.
    pub fn new(route: impl IntoIterator<Item = Route>, key: u32, mask: u32) -> RoutingTableEntry {
        RoutingTableEntry {
            route: route.into_iter().collect(),
            key,
            mask,
            sources: BTreeSet::new(),
        }
    }

    /// Replaces the recorded packet sources.
    pub fn with_sources(
        mut self,
        sources: impl IntoIterator<Item = Option<Route>>,
    ) -> RoutingTableEntry {
        self.sources = sources.into_iter().collect();
        self
    }

    /// Tests whether the given packet key matches this entry.
    pub fn matches(&self, key: u32) -> bool {
        key & self.mask == self.key & self.mask
    }

    /// Returns the number of wildcard bits in this entry's mask.
    pub fn generality(&self) -> u32 {
        generality(self.key, self.mask)
    }
}

/// Counts the Xs (wildcard bits) in a key-mask pair. An X is any bit which
/// is set in neither the key nor the mask; more Xs means a broader match.
pub fn generality(key: u32, mask: u32) -> u32 {
    (!(key | mask)).count_ones()
}

/// Tests whether two key-mask pairs can both match some key.
///
/// The pairs intersect iff they agree on every bit that both masks select.
pub fn intersect(key_a: u32, mask_a: u32, key_b: u32, mask_b: u32) -> bool {
    (key_a ^ key_b) & mask_a & mask_b == 0
}
