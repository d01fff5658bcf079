//! Flattening of routing trees into per-chip forwarding tables.

use crate::tree::RoutingTree;
use braid_tables::{Route, RoutingTableEntry};
use braid_topo::{Chip, Link};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Options for table generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Skip entries whose packets would continue in the direction they
    /// already travel: the hardware forwards unmatched packets straight
    /// through, so such entries change nothing. Default true.
    pub omit_default_routes: bool,
}

impl Default for TableOptions {
    fn default() -> TableOptions {
        TableOptions {
            omit_default_routes: true,
        }
    }
}

/// Accumulated in/out direction sets for one `(chip, key, mask)` group.
#[derive(Debug, Default)]
struct InOutPair {
    /// Directions of travel on arrival; `None` for the tree's root.
    ins: BTreeSet<Option<Link>>,
    outs: BTreeSet<Route>,
}

/// Converts a set of routing trees into per-chip routing tables.
///
/// Each tree is paired with its net's `(key, mask)`. Entries are grouped by
/// `(chip, key, mask)`: a chip visited by several branches of the same net
/// (possible when constraints force re-entry) accumulates the union of all
/// incoming and outgoing directions rather than duplicating entries.
///
/// The entries' `sources` field records arrival ports (the link facing back
/// the way each packet came), which is what the default-route minimisation
/// pass consumes.
pub fn routing_tree_to_tables(
    routes: &[(RoutingTree, (u32, u32))],
    options: &TableOptions,
) -> HashMap<Chip, Vec<RoutingTableEntry>> {
    // {chip: [((key, mask), in/out sets)]} in first-visit order, with an
    // index for the accumulation case.
    type KeyMask = (u32, u32);
    let mut route_sets: HashMap<Chip, Vec<(KeyMask, InOutPair)>> = HashMap::new();
    let mut positions: HashMap<(Chip, KeyMask), usize> = HashMap::new();

    for (tree, key_mask) in routes {
        for step in tree.traverse() {
            let groups = route_sets.entry(step.chip).or_default();
            let index = *positions
                .entry((step.chip, *key_mask))
                .or_insert_with(|| {
                    groups.push((*key_mask, InOutPair::default()));
                    groups.len() - 1
                });
            groups[index].1.ins.insert(step.direction);
            groups[index].1.outs.extend(step.out_routes.iter().copied());
        }
    }

    let mut tables: HashMap<Chip, Vec<RoutingTableEntry>> = HashMap::new();
    for (chip, groups) in route_sets {
        let mut table = Vec::new();
        for ((key, mask), pair) in groups {
            // A packet arriving down a link and leaving down that same link
            // is handled by hardware default routing; the entry only needs
            // to exist when something else happens.
            let straight_through = pair.ins.len() == 1
                && match pair.ins.first() {
                    Some(&Some(direction)) => {
                        pair.outs.len() == 1
                            && pair.outs.first() == Some(&Route::Link(direction))
                    }
                    _ => false,
                };
            if options.omit_default_routes && straight_through {
                continue;
            }

            let sources = pair
                .ins
                .iter()
                .map(|&travel| travel.map(|link| Route::Link(link.opposite())))
                .collect();
            table.push(RoutingTableEntry {
                route: pair.outs,
                key,
                mask,
                sources,
            });
        }
        if !table.is_empty() {
            tables.insert(chip, table);
        }
    }
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::VertexId;
    use crate::tree::TreeEdge;

    fn vertex(n: u32) -> VertexId {
        VertexId::from_raw(n)
    }

    /// (0,0) -E-> (1,0) -E-> (2,0), terminating at core 1, with a second
    /// branch (0,0) -N-> (0,1) terminating at core 2.
    fn sample_tree() -> RoutingTree {
        let mut tree = RoutingTree::new((0, 0));
        let a = tree.add_node((1, 0));
        let b = tree.add_node((2, 0));
        let c = tree.add_node((0, 1));
        tree.add_child(tree.root(), TreeEdge::Hop { link: Link::East, node: a });
        tree.add_child(a, TreeEdge::Hop { link: Link::East, node: b });
        tree.add_child(b, TreeEdge::Terminal { vertex: vertex(1), route: Route::core(1) });
        tree.add_child(tree.root(), TreeEdge::Hop { link: Link::North, node: c });
        tree.add_child(c, TreeEdge::Terminal { vertex: vertex(2), route: Route::core(2) });
        tree
    }

    #[test]
    fn builds_entries_with_sources_and_routes() {
        let tables = routing_tree_to_tables(
            &[(sample_tree(), (0xcafe_0000, 0xffff_0000))],
            &TableOptions::default(),
        );

        // The root fans out and is locally sourced.
        let root = &tables[&(0, 0)];
        assert_eq!(root.len(), 1);
        assert_eq!(
            root[0].route,
            BTreeSet::from([Route::Link(Link::East), Route::Link(Link::North)])
        );
        assert_eq!(root[0].key, 0xcafe_0000);
        assert_eq!(root[0].mask, 0xffff_0000);
        assert_eq!(root[0].sources, BTreeSet::from([None]));

        // The straight-through hop at (1,0) is elided by default.
        assert!(!tables.contains_key(&(1, 0)));

        // Endpoint chips route to their cores, with the arrival port
        // recorded.
        let end = &tables[&(2, 0)];
        assert_eq!(end[0].route, BTreeSet::from([Route::Core(1)]));
        assert_eq!(end[0].sources, BTreeSet::from([Some(Route::Link(Link::West))]));

        let side = &tables[&(0, 1)];
        assert_eq!(side[0].route, BTreeSet::from([Route::Core(2)]));
        assert_eq!(side[0].sources, BTreeSet::from([Some(Route::Link(Link::South))]));
    }

    #[test]
    fn straight_through_entries_kept_when_requested() {
        let tables = routing_tree_to_tables(
            &[(sample_tree(), (0x0, 0xf))],
            &TableOptions {
                omit_default_routes: false,
            },
        );
        let middle = &tables[&(1, 0)];
        assert_eq!(middle.len(), 1);
        assert_eq!(middle[0].route, BTreeSet::from([Route::Link(Link::East)]));
        assert_eq!(
            middle[0].sources,
            BTreeSet::from([Some(Route::Link(Link::West))])
        );
    }

    #[test]
    fn turning_entries_are_never_elided() {
        // (0,0) -E-> (1,0) -N-> (1,1): the middle chip turns the packet.
        let mut tree = RoutingTree::new((0, 0));
        let a = tree.add_node((1, 0));
        let b = tree.add_node((1, 1));
        tree.add_child(tree.root(), TreeEdge::Hop { link: Link::East, node: a });
        tree.add_child(a, TreeEdge::Hop { link: Link::North, node: b });
        tree.add_child(b, TreeEdge::Terminal { vertex: vertex(1), route: Route::core(1) });

        let tables = routing_tree_to_tables(&[(tree, (0x1, 0xf))], &TableOptions::default());
        let middle = &tables[&(1, 0)];
        assert_eq!(middle.len(), 1);
        assert_eq!(middle[0].route, BTreeSet::from([Route::Link(Link::North)]));
    }

    #[test]
    fn nets_with_distinct_keys_stack_in_order() {
        let mut other = RoutingTree::new((0, 0));
        other.add_child(
            other.root(),
            TreeEdge::Terminal { vertex: vertex(9), route: Route::core(3) },
        );

        let tables = routing_tree_to_tables(
            &[
                (sample_tree(), (0x0000_0000, 0xffff_0000)),
                (other, (0x0001_0000, 0xffff_0000)),
            ],
            &TableOptions::default(),
        );
        let root = &tables[&(0, 0)];
        assert_eq!(root.len(), 2);
        assert_eq!(root[0].key, 0x0000_0000);
        assert_eq!(root[1].key, 0x0001_0000);
        assert_eq!(root[1].route, BTreeSet::from([Route::Core(3)]));
    }

    #[test]
    fn revisits_accumulate_directions() {
        // Two branches of one net converge on chip (2,1) from different
        // directions (a constraint-forced shape). The chip must get a
        // single entry whose sources and routes are the unions across both
        // visits, not one entry per visit.
        let mut tree = RoutingTree::new((1, 1));
        let direct = tree.add_node((2, 1));
        let above = tree.add_node((2, 2));
        let detour = tree.add_node((2, 1));
        tree.add_child(tree.root(), TreeEdge::Hop { link: Link::East, node: direct });
        tree.add_child(direct, TreeEdge::Terminal { vertex: vertex(1), route: Route::core(1) });
        tree.add_child(tree.root(), TreeEdge::Hop { link: Link::NorthEast, node: above });
        tree.add_child(above, TreeEdge::Hop { link: Link::South, node: detour });
        tree.add_child(detour, TreeEdge::Terminal { vertex: vertex(2), route: Route::core(2) });

        let tables = routing_tree_to_tables(&[(tree, (0x2, 0xf))], &TableOptions::default());
        let converged = &tables[&(2, 1)];
        assert_eq!(converged.len(), 1);
        assert_eq!(
            converged[0].route,
            BTreeSet::from([Route::Core(1), Route::Core(2)])
        );
        assert_eq!(
            converged[0].sources,
            BTreeSet::from([
                Some(Route::Link(Link::West)),
                Some(Route::Link(Link::North)),
            ])
        );
    }
}
