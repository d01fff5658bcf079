//! Routing tree data structures representing one net's multicast route.
//!
//! A [`RoutingTree`] describes the complete path taken by one net's traffic
//! from its source chip to every endpoint. It is used during routing in
//! preference to flat table entries because it is easier to verify and more
//! accurately represents the problem: each node is a chip the route passes
//! through, each edge either a hop down a link or a termination at a core or
//! link endpoint.
//!
//! Nodes live in an arena indexed by [`NodeHandle`], so branches can be
//! grafted and severed without cyclic ownership. The root is always handle
//! 0. Trees are built by the router and read-only afterwards.

use crate::ids::{NodeHandle, VertexId};
use braid_tables::Route;
use braid_topo::{Chip, Link};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// A multicast route for a single net, rooted at the source's chip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingTree {
    nodes: Vec<TreeNode>,
}

/// One chip visited by a route, with the steps leading on from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    /// The chip the route is passing through.
    pub chip: Chip,
    /// The next steps of the route from this chip.
    pub children: Vec<TreeEdge>,
}

/// One outgoing step of a route at a chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeEdge {
    /// The route continues to another chip down the given link.
    Hop {
        /// The link crossed to reach the child.
        link: Link,
        /// The subtree rooted at the neighbouring chip.
        node: NodeHandle,
    },
    /// The route terminates here for the given vertex.
    ///
    /// The route is a core for an ordinary sink, a link for a
    /// constraint-directed endpoint, or `None` for a sink with no resources
    /// allocated (present in the tree but producing no table entry).
    Terminal {
        /// The sink vertex reached at this chip.
        vertex: VertexId,
        /// The destination used to reach the vertex, if any.
        route: Option<Route>,
    },
}

/// An element encountered while iterating a tree: an interior node or a
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeElement {
    /// An interior node, visitable via [`RoutingTree::node`].
    Node(NodeHandle),
    /// A terminal edge.
    Terminal {
        /// The sink vertex.
        vertex: VertexId,
        /// The destination used to reach it, if any.
        route: Option<Route>,
    },
}

/// One step of a breadth-first traversal: the link the route arrived on
/// (`None` at the root), the chip, and the set of destinations needed to
/// reach the node's children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraverseStep {
    /// The link crossed to arrive at this chip, or `None` at the root.
    pub direction: Option<Link>,
    /// The chip being visited.
    pub chip: Chip,
    /// Destinations required at this chip: one link per hop child plus each
    /// terminal's route. Terminals without a route contribute nothing.
    pub out_routes: BTreeSet<Route>,
}

impl RoutingTree {
    /// Creates a tree containing only a root at the given chip.
    pub fn new(root_chip: Chip) -> RoutingTree {
        RoutingTree {
            nodes: vec![TreeNode {
                chip: root_chip,
                children: Vec::new(),
            }],
        }
    }

    /// The root node's handle.
    pub fn root(&self) -> NodeHandle {
        NodeHandle::from_raw(0)
    }

    /// Returns the node behind a handle.
    pub fn node(&self, handle: NodeHandle) -> &TreeNode {
        &self.nodes[handle.as_raw() as usize]
    }

    /// Returns the chip of the node behind a handle.
    pub fn chip(&self, handle: NodeHandle) -> Chip {
        self.node(handle).chip
    }

    /// Number of nodes in the arena (reachable or not).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the arena holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Allocates a new, unconnected node.
    pub(crate) fn add_node(&mut self, chip: Chip) -> NodeHandle {
        let handle = NodeHandle::from_raw(self.nodes.len() as u32);
        self.nodes.push(TreeNode {
            chip,
            children: Vec::new(),
        });
        handle
    }

    /// Appends an outgoing edge to a node.
    pub(crate) fn add_child(&mut self, parent: NodeHandle, edge: TreeEdge) {
        self.nodes[parent.as_raw() as usize].children.push(edge);
    }

    /// Removes the hop edge from `parent` to `child`, if present.
    pub(crate) fn remove_hop_child(&mut self, parent: NodeHandle, child: NodeHandle) -> bool {
        let children = &mut self.nodes[parent.as_raw() as usize].children;
        let position = children
            .iter()
            .position(|edge| matches!(edge, TreeEdge::Hop { node, .. } if *node == child));
        match position {
            Some(index) => {
                children.remove(index);
                true
            }
            None => false,
        }
    }

    /// Depth-first iteration over every node and terminal reachable from
    /// `from`, in no particular sibling order.
    pub fn iterate_from(&self, from: NodeHandle) -> impl Iterator<Item = TreeElement> + '_ {
        let mut stack = vec![TreeElement::Node(from)];
        std::iter::from_fn(move || {
            let element = stack.pop()?;
            if let TreeElement::Node(handle) = element {
                for edge in &self.node(handle).children {
                    stack.push(match *edge {
                        TreeEdge::Hop { node, .. } => TreeElement::Node(node),
                        TreeEdge::Terminal { vertex, route } => {
                            TreeElement::Terminal { vertex, route }
                        }
                    });
                }
            }
            Some(element)
        })
    }

    /// Depth-first iteration over the whole tree.
    pub fn iterate(&self) -> impl Iterator<Item = TreeElement> + '_ {
        self.iterate_from(self.root())
    }

    /// The chips of every node reachable from `from`.
    pub fn chips_from(&self, from: NodeHandle) -> impl Iterator<Item = Chip> + '_ {
        self.iterate_from(from).filter_map(|element| match element {
            TreeElement::Node(handle) => Some(self.chip(handle)),
            TreeElement::Terminal { .. } => None,
        })
    }

    /// Breadth-first traversal yielding, for every visited chip, the arrival
    /// direction and the set of outgoing destinations.
    pub fn traverse(&self) -> Vec<TraverseStep> {
        let mut steps = Vec::new();
        let mut to_visit = VecDeque::from([(None, self.root())]);

        while let Some((direction, handle)) = to_visit.pop_front() {
            let node = self.node(handle);
            let mut out_routes = BTreeSet::new();
            for edge in &node.children {
                match *edge {
                    TreeEdge::Hop { link, node } => {
                        out_routes.insert(Route::from(link));
                        to_visit.push_back((Some(link), node));
                    }
                    TreeEdge::Terminal { route, .. } => {
                        if let Some(route) = route {
                            out_routes.insert(route);
                        }
                    }
                }
            }
            steps.push(TraverseStep {
                direction,
                chip: node.chip,
                out_routes,
            });
        }
        steps
    }
}
