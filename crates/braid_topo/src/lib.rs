//! Lattice geometry and machine description for the braid interconnect toolchain.
//!
//! This crate provides the topological foundations used by the router and the
//! table minimisers: chip coordinates on the hexagonal lattice, the six
//! inter-chip [`Link`] directions, shortest-path computation with and without
//! wrap-around, and the [`Machine`] liveness model (which chips and links are
//! actually working).
//!
//! Coordinates come in two forms: a 2-D chip address `(x, y)` and a 3-D
//! lattice vector `(x, y, z)` where vectors differing by a multiple of
//! `(1, 1, 1)` describe the same displacement. See [`geometry`] for the
//! conversion and shortest-path functions.

#![warn(missing_docs)]

pub mod geometry;
pub mod links;
pub mod machine;

pub use geometry::{
    concentric_hexagons, longest_dimension_first, minimise_xyz, shortest_mesh_path,
    shortest_mesh_path_length, shortest_torus_path, shortest_torus_path_length, to_xyz,
    ConcentricHexagons, LdfSteps, Vector3,
};
pub use links::Link;
pub use machine::Machine;

/// A 2-D chip address in the interconnect grid.
pub type Chip = (i32, i32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexports_available() {
        let _ = Link::East;
        let _ = Machine::new(2, 2);
        let _ = to_xyz((1, 2));
    }
}
