//! Multicast route construction for the braid interconnect toolchain.
//!
//! This crate turns a set of nets (one source vertex fanning out to many
//! sinks) into loop-free multicast [`RoutingTree`]s across a possibly
//! faulty, possibly toroidal machine, and flattens those trees into the
//! per-chip forwarding tables that `braid_tables` minimises.
//!
//! # Pipeline
//!
//! 1. **Route**: [`route_nets`] builds one tree per net using Neighbour
//!    Exploring Routing, detouring around dead chips and links
//! 2. **Flatten**: [`routing_tree_to_tables`] converts the trees plus each
//!    net's `(key, mask)` into ordered per-chip entry lists
//! 3. **Minimise**: `braid_tables::minimise_tables` compresses each chip's
//!    table to its hardware capacity
//!
//! # Usage
//!
//! ```ignore
//! use braid_route::{route_nets, routing_tree_to_tables, RouterOptions, TableOptions};
//!
//! let trees = route_nets(&nets, &machine, &constraints, &placements,
//!                        &allocations, &RouterOptions::default(), &mut rng)?;
//! let keyed: Vec<_> = trees.into_iter().zip(keys).collect();
//! let tables = routing_tree_to_tables(&keyed, &TableOptions::default());
//! ```

#![warn(missing_docs)]

pub mod constraints;
pub mod data;
pub mod error;
pub mod ids;
pub mod ner;
pub mod tables;
pub mod tree;

pub use constraints::Constraint;
pub use data::{Allocations, CoreRange, Net, Placements, RouterOptions};
pub use error::RouteError;
pub use ids::{NodeHandle, VertexId};
pub use ner::{links_between, route_nets};
pub use tables::{routing_tree_to_tables, TableOptions};
pub use tree::{RoutingTree, TraverseStep, TreeEdge, TreeElement, TreeNode};
