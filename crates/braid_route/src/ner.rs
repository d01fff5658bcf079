//! Neighbour Exploring Routing (NER).
//!
//! Builds one multicast tree per net. Sinks are connected closest-first:
//! for each sink a nearby chip already in the tree is located by searching
//! concentric rings of hexagons, and a longest-dimension-first path is
//! grafted from there, so sinks sharing a common approach share table
//! entries downstream. Routes are first generated against a fault-free
//! machine and then repaired: dead chips are cut out and severed branches
//! reconnected with an A* search over the links that actually work.
//!
//! Algorithm reference: J. Navaridas et al., "SpiNNaker: Enhanced multicast
//! routing", Parallel Computing (2014).

use crate::constraints::Constraint;
use crate::data::{Allocations, Net, Placements, RouterOptions};
use crate::error::RouteError;
use crate::ids::{NodeHandle, VertexId};
use crate::tree::{RoutingTree, TreeEdge};
use braid_tables::Route;
use braid_topo::{
    concentric_hexagons, longest_dimension_first, shortest_mesh_path, shortest_mesh_path_length,
    shortest_torus_path, shortest_torus_path_length, to_xyz, Chip, Link, Machine,
};
use rand::Rng;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

/// Returns the set of working links leading from chip `a` to chip `b`,
/// accounting for wrap-around.
pub fn links_between(a: Chip, b: Chip, machine: &Machine) -> BTreeSet<Link> {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    Link::ALL
        .into_iter()
        .filter(|&link| {
            let v = link.to_vector();
            (dx - v.0).rem_euclid(machine.width) == 0
                && (dy - v.1).rem_euclid(machine.height) == 0
                && machine.has_link(a, link)
        })
        .collect()
}

/// Produces a spanning tree for one net assuming a fault-free machine.
///
/// This is the kernel of the NER algorithm. Destinations are visited
/// closest-first; each is connected to the nearest chip already in the tree
/// (found by searching `radius` concentric rings of hexagons around it,
/// falling back to the source) via a longest-dimension-first path.
///
/// Returns the tree plus a lookup from visited chip to tree node.
fn ner_net(
    source: Chip,
    destinations: &BTreeSet<Chip>,
    width: i32,
    height: i32,
    wrap_around: bool,
    radius: u32,
    rng: &mut impl Rng,
) -> (RoutingTree, HashMap<Chip, NodeHandle>) {
    let mut tree = RoutingTree::new(source);
    let mut route: HashMap<Chip, NodeHandle> = HashMap::from([(source, tree.root())]);

    let mut ordered: Vec<Chip> = destinations.iter().copied().collect();
    ordered.sort_by_key(|&destination| {
        if wrap_around {
            shortest_torus_path_length(to_xyz(source), to_xyz(destination), width, height)
        } else {
            shortest_mesh_path_length(to_xyz(source), to_xyz(destination))
        }
    });

    for destination in ordered {
        // Find the nearest connected chip by searching enlarging rings
        // around the destination, falling back on the source.
        let mut neighbour = concentric_hexagons(radius, destination)
            .map(|(x, y)| {
                if wrap_around {
                    (x.rem_euclid(width), y.rem_euclid(height))
                } else {
                    (x, y)
                }
            })
            .find(|chip| route.contains_key(chip))
            .unwrap_or(source);

        let vector = if wrap_around {
            shortest_torus_path(to_xyz(neighbour), to_xyz(destination), width, height, rng)
        } else {
            shortest_mesh_path(to_xyz(neighbour), to_xyz(destination))
        };

        // The longest-dimension-first route may pass through an already
        // connected chip; following it from there would create a cycle.
        // Truncate the route at the last such intersection and continue
        // from that chip instead.
        let mut hops: Vec<(Link, Chip)> =
            longest_dimension_first(vector, neighbour, Some(width), Some(height), rng).collect();
        if let Some(i) = hops.iter().rposition(|&(_, chip)| route.contains_key(&chip)) {
            neighbour = hops[i].1;
            hops.drain(..=i);
        }

        let mut last = route[&neighbour];
        for (link, chip) in hops {
            let node = tree.add_node(chip);
            route.insert(chip, node);
            tree.add_child(last, TreeEdge::Hop { link, node });
            last = node;
        }
    }

    (tree, route)
}

/// Copies a tree of plain hops, cutting out chips and links which do not
/// work in the given machine.
///
/// Children of a dead chip are lifted into its parent; a dead chip visited
/// mid-route never has a sink of its own, so nothing is lost. Pairs of
/// chips left unconnected because their link is dead (or their common
/// parent was) are reported for repair.
fn copy_and_disconnect_tree(
    tree: &RoutingTree,
    machine: &Machine,
) -> Result<(RoutingTree, HashMap<Chip, NodeHandle>, BTreeSet<(Chip, Chip)>), RouteError> {
    let root_chip = tree.chip(tree.root());
    if !machine.has_chip(root_chip) {
        return Err(RouteError::InvalidConstraint {
            reason: format!("net is sourced from dead chip {root_chip:?}"),
        });
    }

    let mut new_tree = RoutingTree::new(root_chip);
    let mut lookup = HashMap::from([(root_chip, new_tree.root())]);
    let mut broken_links = BTreeSet::new();

    // Queue of (new parent, direction from parent, old child node).
    let mut to_visit: VecDeque<(NodeHandle, Link, NodeHandle)> = VecDeque::new();
    for edge in &tree.node(tree.root()).children {
        if let TreeEdge::Hop { link, node } = *edge {
            to_visit.push_back((new_tree.root(), link, node));
        }
    }

    while let Some((new_parent, direction, old_node)) = to_visit.pop_front() {
        let chip = tree.chip(old_node);
        let new_node = if machine.has_chip(chip) {
            let node = new_tree.add_node(chip);
            lookup.insert(chip, node);

            let parent_chip = new_tree.chip(new_parent);
            if links_between(parent_chip, chip, machine).contains(&direction) {
                new_tree.add_child(new_parent, TreeEdge::Hop { link: direction, node });
            } else {
                // Link to parent is dead, or the original parent was dead
                // and the adoptive parent is not adjacent.
                broken_links.insert((parent_chip, chip));
            }
            node
        } else {
            // Dead chip: its children hang off the parent instead.
            new_parent
        };

        for edge in &tree.node(old_node).children {
            if let TreeEdge::Hop { link, node } = *edge {
                to_visit.push_back((new_node, link, node));
            }
        }
    }

    Ok((new_tree, lookup, broken_links))
}

/// Uses A* to find a working path from any chip in `sources` to `sink`.
///
/// The heuristic pulls the search towards `heuristic_source` (the
/// disconnected chip's old parent) without regard for the other sources.
/// That chip is usually in the direction of the rest of the tree, and
/// stopping at the first touched source chip means no loop can form.
///
/// The search runs backwards from the sink, so link identifiers are taken
/// from the perspective of the neighbour being stepped to. The returned
/// path starts at a source chip and ends at a connected neighbour of
/// `sink`; each entry gives the link to follow from that chip towards the
/// next.
fn a_star(
    sink: Chip,
    heuristic_source: Chip,
    sources: &HashSet<Chip>,
    machine: &Machine,
    wrap_around: bool,
) -> Result<Vec<(Link, Chip)>, RouteError> {
    let heuristic = |chip: Chip| -> i32 {
        if wrap_around {
            shortest_torus_path_length(
                to_xyz(chip),
                to_xyz(heuristic_source),
                machine.width,
                machine.height,
            )
        } else {
            shortest_mesh_path_length(to_xyz(chip), to_xyz(heuristic_source))
        }
    };

    // For each explored chip, the link and chip we hopped from to reach it.
    let mut visited: HashMap<Chip, (Link, Chip)> = HashMap::new();
    let mut selected_source = None;

    // Min-heap of (distance to heuristic_source, chip); BinaryHeap is a
    // max-heap so entries are reversed. Ties resolve on the coordinate.
    let mut to_visit = BinaryHeap::from([Reverse((heuristic(sink), sink))]);
    while let Some(Reverse((_, node))) = to_visit.pop() {
        if sources.contains(&node) {
            selected_source = Some(node);
            break;
        }

        for neighbour_link in Link::ALL {
            let vector = neighbour_link.opposite().to_vector();
            let neighbour = (
                (node.0 + vector.0).rem_euclid(machine.width),
                (node.1 + vector.1).rem_euclid(machine.height),
            );

            // The neighbour must be able to reach the current node.
            if !machine.has_link(neighbour, neighbour_link) {
                continue;
            }
            if neighbour == sink || visited.contains_key(&neighbour) {
                continue;
            }
            visited.insert(neighbour, (neighbour_link, node));
            to_visit.push(Reverse((heuristic(neighbour), neighbour)));
        }
    }

    let Some(selected_source) = selected_source else {
        return Err(RouteError::MachineHasDisconnectedSubregion {
            from: sink,
            to: heuristic_source,
        });
    };

    // Walk the discovered hops back from the selected source to the sink.
    let (direction, mut previous) = visited[&selected_source];
    let mut path = vec![(direction, selected_source)];
    while previous != sink {
        let (direction, next) = visited[&previous];
        path.push((direction, previous));
        previous = next;
    }

    Ok(path)
}

/// Repairs a tree so that it only uses chips and links which work,
/// reconnecting severed branches via A*.
fn avoid_dead_links(
    tree: &RoutingTree,
    machine: &Machine,
    wrap_around: bool,
) -> Result<(RoutingTree, HashMap<Chip, NodeHandle>), RouteError> {
    let (mut tree, mut lookup, broken_links) = copy_and_disconnect_tree(tree, machine)?;

    // Reconnect each orphaned subtree to any other part of the tree. Every
    // subtree eventually reattaches, directly or through another repaired
    // subtree, leaving a single connected tree.
    for (parent, child) in broken_links {
        let child_handle = lookup[&child];
        let child_chips: HashSet<Chip> = tree.chips_from(child_handle).collect();
        let sources: HashSet<Chip> = lookup
            .keys()
            .filter(|chip| !child_chips.contains(chip))
            .copied()
            .collect();

        let path = a_star(child, parent, &sources, machine, wrap_around)?;

        let mut last_node = lookup[&path[0].1];
        let mut last_direction = path[0].0;
        for &(direction, chip) in &path[1..] {
            let new_node = if !child_chips.contains(&chip) {
                // New ground. The A* sources exclude only this subtree, so
                // the chip cannot already be part of the tree.
                debug_assert!(!lookup.contains_key(&chip), "cycle created");
                let node = tree.add_node(chip);
                lookup.insert(chip, node);
                node
            } else {
                // The path runs over part of the disconnected subtree
                // itself. Sever the overlapped node from its parent and
                // absorb it into the path so no cycle is introduced.
                let node = lookup[&chip];
                let subtree: Vec<NodeHandle> = tree
                    .chips_from(child_handle)
                    .filter_map(|c| lookup.get(&c).copied())
                    .collect();
                for candidate in subtree {
                    if tree.remove_hop_child(candidate, node) {
                        break;
                    }
                }
                node
            };
            tree.add_child(
                last_node,
                TreeEdge::Hop {
                    link: last_direction,
                    node: new_node,
                },
            );
            last_node = new_node;
            last_direction = direction;
        }
        tree.add_child(
            last_node,
            TreeEdge::Hop {
                link: last_direction,
                node: child_handle,
            },
        );
    }

    Ok((tree, lookup))
}

/// Routes every net, producing one routing tree per net in input order.
///
/// Trees are generated with the NER kernel against an idealised machine,
/// repaired around dead chips and links, and finally capped with terminals:
/// each sink receives one terminal per allocated core, unless a
/// [`Constraint::RouteEndpoint`] overrides the endpoint, and sinks with no
/// allocation are attached without a route. If the machine's working links
/// cannot connect a net, routing fails with
/// [`RouteError::MachineHasDisconnectedSubregion`].
pub fn route_nets(
    nets: &[Net],
    machine: &Machine,
    constraints: &[Constraint],
    placements: &Placements,
    allocations: &Allocations,
    options: &RouterOptions,
    rng: &mut impl Rng,
) -> Result<Vec<RoutingTree>, RouteError> {
    let wrap_around = machine.has_wrap_around_links();

    let mut route_to_endpoint: HashMap<VertexId, Route> = HashMap::new();
    for constraint in constraints {
        if let Constraint::RouteEndpoint { vertex, route } = *constraint {
            route_to_endpoint.insert(vertex, route);
        }
    }

    let placement_of = |vertex: VertexId| -> Result<Chip, RouteError> {
        placements
            .get(&vertex)
            .copied()
            .ok_or_else(|| RouteError::InvalidConstraint {
                reason: format!("vertex {vertex} has no placement"),
            })
    };

    let mut routes = Vec::with_capacity(nets.len());
    for net in nets {
        let source = placement_of(net.source)?;
        let destinations: BTreeSet<Chip> = net
            .sinks
            .iter()
            .map(|&sink| placement_of(sink))
            .collect::<Result<_, _>>()?;

        // Generate the tree assuming a perfect machine, then repair it.
        let (tree, _) = ner_net(
            source,
            &destinations,
            machine.width,
            machine.height,
            wrap_around,
            options.radius,
            rng,
        );
        let (mut tree, lookup) = avoid_dead_links(&tree, machine, wrap_around)?;

        // Attach the net's sinks.
        for &sink in &net.sinks {
            let chip = placement_of(sink)?;
            let Some(&node) = lookup.get(&chip) else {
                // The sink's chip is dead, so the repaired tree never
                // reaches it.
                return Err(RouteError::MachineHasDisconnectedSubregion {
                    from: source,
                    to: chip,
                });
            };

            if let Some(&route) = route_to_endpoint.get(&sink) {
                if let Route::Link(link) = route {
                    if !machine.has_link(chip, link) {
                        return Err(RouteError::InvalidConstraint {
                            reason: format!(
                                "endpoint link {link:?} for vertex {sink} is dead at chip {chip:?}"
                            ),
                        });
                    }
                }
                tree.add_child(node, TreeEdge::Terminal { vertex: sink, route: Some(route) });
            } else if let Some(range) = allocations.get(&sink) {
                for core in range.start..range.end {
                    let route =
                        Route::core(core).ok_or_else(|| RouteError::InvalidConstraint {
                            reason: format!("core {core} allocated to vertex {sink} is out of range"),
                        })?;
                    tree.add_child(node, TreeEdge::Terminal { vertex: sink, route: Some(route) });
                }
            } else {
                tree.add_child(node, TreeEdge::Terminal { vertex: sink, route: None });
            }
        }

        routes.push(tree);
    }

    Ok(routes)
}
