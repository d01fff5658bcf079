//! Shortest-path geometry on the hexagonal lattice.
//!
//! Displacements are expressed as 3-D vectors `(x, y, z)` where the `z` axis
//! runs diagonally (one `+z` step moves `(+1, +1)` in chip coordinates), so
//! any two vectors differing by a multiple of `(1, 1, 1)` describe the same
//! displacement. [`minimise_xyz`] picks the unique representative with the
//! smallest total magnitude; path lengths and hop sequences are derived from
//! that form.
//!
//! The torus-path functions break ties between equally short routes uniformly
//! at random. All randomness is taken through a caller-supplied
//! [`rand::Rng`] so routing can be made deterministic under test.

use crate::links::Link;
use crate::Chip;
use rand::Rng;
use std::cmp::{max, min, Ordering};

/// A displacement on the hexagonal lattice.
pub type Vector3 = (i32, i32, i32);

/// Converts a 2-D chip coordinate into an `(x, y, 0)` lattice vector.
pub fn to_xyz(xy: Chip) -> Vector3 {
    (xy.0, xy.1, 0)
}

/// Minimises an `(x, y, z)` vector.
///
/// Subtracts the median of the three components from each of them, giving
/// the equivalent vector with at most two non-zero components (of opposite
/// sign) and the minimum sum of magnitudes.
pub fn minimise_xyz(xyz: Vector3) -> Vector3 {
    let (x, y, z) = xyz;
    let m = max(min(x, y), min(max(x, y), z));
    (x - m, y - m, z - m)
}

/// Returns the length of a shortest path between two points, ignoring
/// wrap-around links.
pub fn shortest_mesh_path_length(source: Vector3, destination: Vector3) -> i32 {
    let x = destination.0 - source.0;
    let y = destination.1 - source.1;
    let z = destination.2 - source.2;
    // Minimisation adds or subtracts (1, 1, 1), which leaves the range of the
    // three components unchanged. A minimal vector has at most two non-zero
    // components of opposite sign, so the range is the sum of magnitudes.
    max(x, max(y, z)) - min(x, min(y, z))
}

/// Returns the shortest vector between two points, ignoring wrap-around
/// links.
pub fn shortest_mesh_path(source: Vector3, destination: Vector3) -> Vector3 {
    minimise_xyz((
        destination.0 - source.0,
        destination.1 - source.1,
        destination.2 - source.2,
    ))
}

/// Returns the length of a shortest path between two points on a
/// `width x height` torus.
pub fn shortest_torus_path_length(
    source: Vector3,
    destination: Vector3,
    width: i32,
    height: i32,
) -> i32 {
    // Reduce to an (x, y) displacement from an origin-relative source, with
    // both components non-negative.
    let x = (destination.0 - destination.2 - (source.0 - source.2)).rem_euclid(width);
    let y = (destination.1 - destination.2 - (source.1 - source.2)).rem_euclid(height);

    min(
        max(x, y), // No wrap
        min(
            width - x + y, // Wrap X only
            min(
                x + height - y,             // Wrap Y only
                max(width - x, height - y), // Wrap X and Y
            ),
        ),
    )
}

/// Returns a shortest vector between two points on a `width x height` torus.
///
/// When multiple shortest routes exist one is chosen uniformly at random:
/// integer distances get an independent jitter in `[0, 1)` before the
/// minimum is taken, which can only reorder exact ties. Where the minimised
/// vector is long enough to lap the opposite dimension, a random number of
/// full "spirals" around the z axis is folded in, spreading traffic across
/// physically equivalent routes. The result is always a true shortest
/// vector.
pub fn shortest_torus_path(
    source: Vector3,
    destination: Vector3,
    width: i32,
    height: i32,
    rng: &mut impl Rng,
) -> Vector3 {
    let (w, h) = (width, height);

    // Translate the destination as if the source were at (0, 0, 0) and fold
    // both to (x, y, 0) form with non-negative components.
    let sx = source.0 - source.2;
    let sy = source.1 - source.2;
    let dx = (destination.0 - destination.2 - sx).rem_euclid(w);
    let dy = (destination.1 - destination.2 - sy).rem_euclid(h);

    // The four candidate routings: [(distance, vector); 4].
    let approaches: [(i32, Vector3); 4] = [
        (max(dx, dy), (dx, dy, 0)),                          // No wrap
        (w - dx + dy, (-(w - dx), dy, 0)),                   // Wrap X only
        (dx + h - dy, (dx, -(h - dy), 0)),                   // Wrap Y only
        (max(w - dx, h - dy), (-(w - dx), -(h - dy), 0)),    // Wrap X and Y
    ];

    // Select a minimal approach, breaking exact ties at random.
    let mut best = (f64::INFINITY, (0, 0, 0));
    for &(distance, vector) in &approaches {
        let jittered = distance as f64 + rng.gen::<f64>();
        if jittered
            .partial_cmp(&best.0)
            .unwrap_or(Ordering::Equal)
            .is_lt()
        {
            best = (jittered, vector);
        }
    }
    let (mut x, mut y, mut z) = minimise_xyz(best.1);

    // Fold in a random number of full spirals around the z axis where the
    // vector is long enough to permit them.
    if x.abs() >= height {
        let max_spirals = x.div_euclid(height);
        let d = rng.gen_range(min(0, max_spirals)..=max(0, max_spirals)) * height;
        x -= d;
        z -= d;
    } else if y.abs() >= width {
        let max_spirals = y.div_euclid(width);
        let d = rng.gen_range(min(0, max_spirals)..=max(0, max_spirals)) * width;
        y -= d;
        z -= d;
    }

    (x, y, z)
}

/// Returns a lazy iterator over the hops of a longest-dimension-first route.
///
/// The three axes of `vector` are traversed one at a time in order of
/// decreasing magnitude, ties broken uniformly at random. Each item is the
/// link taken and the coordinate arrived at; coordinates wrap modulo
/// `width`/`height` when those are given. Exactly `|x| + |y| + |z|` hops are
/// produced and the final coordinate is `start` displaced by `vector`.
pub fn longest_dimension_first(
    vector: Vector3,
    start: Chip,
    width: Option<i32>,
    height: Option<i32>,
    rng: &mut impl Rng,
) -> LdfSteps {
    // Order the axes by descending magnitude with random jitter to break
    // ties; zero-magnitude axes always sort last and are dropped.
    let mut dims: Vec<(usize, i32, f64)> = [vector.0, vector.1, vector.2]
        .into_iter()
        .enumerate()
        .map(|(dim, magnitude)| (dim, magnitude, rng.gen::<f64>()))
        .collect();
    dims.sort_by(|a, b| {
        let ka = a.1.abs() as f64 + a.2;
        let kb = b.1.abs() as f64 + b.2;
        kb.partial_cmp(&ka).unwrap_or(Ordering::Equal)
    });

    LdfSteps {
        dims: dims
            .into_iter()
            .filter(|&(_, magnitude, _)| magnitude != 0)
            .map(|(dim, magnitude, _)| (dim, magnitude))
            .collect(),
        current: 0,
        taken: 0,
        x: start.0,
        y: start.1,
        width,
        height,
    }
}

/// Iterator over the `(link, coordinate)` hops of a longest-dimension-first
/// route. Created by [`longest_dimension_first`].
#[derive(Debug, Clone)]
pub struct LdfSteps {
    /// Non-zero axes as `(dimension, magnitude)`, most significant first.
    dims: Vec<(usize, i32)>,
    current: usize,
    taken: i32,
    x: i32,
    y: i32,
    width: Option<i32>,
    height: Option<i32>,
}

impl Iterator for LdfSteps {
    type Item = (Link, Chip);

    fn next(&mut self) -> Option<(Link, Chip)> {
        let &(dim, magnitude) = self.dims.get(self.current)?;
        let positive = magnitude > 0;
        let sign = if positive { 1 } else { -1 };

        let link = match (dim, positive) {
            (0, true) => Link::East,
            (0, false) => Link::West,
            (1, true) => Link::North,
            (1, false) => Link::South,
            // One +z step is a (-1, -1) move in chip coordinates.
            (2, true) => Link::SouthWest,
            _ => Link::NorthEast,
        };

        match dim {
            0 => self.x += sign,
            1 => self.y += sign,
            _ => {
                self.x -= sign;
                self.y -= sign;
            }
        }
        if let Some(w) = self.width {
            self.x = self.x.rem_euclid(w);
        }
        if let Some(h) = self.height {
            self.y = self.y.rem_euclid(h);
        }

        self.taken += 1;
        if self.taken == magnitude.abs() {
            self.taken = 0;
            self.current += 1;
        }

        Some((link, (self.x, self.y)))
    }
}

/// Returns an iterator over the coordinates of concentric rings of hexagons
/// centred on `start`.
///
/// Ring 0 is the centre alone; ring `r` contributes `6 * r` coordinates.
/// `radius` is the outermost ring produced. Coordinates are not wrapped; the
/// caller applies any torus wrapping it needs.
pub fn concentric_hexagons(radius: u32, start: Chip) -> ConcentricHexagons {
    ConcentricHexagons {
        x: start.0,
        y: start.1,
        radius,
        ring: 0,
        side: 0,
        step: 0,
    }
}

/// Iterator over concentric hexagonal rings. Created by
/// [`concentric_hexagons`].
#[derive(Debug, Clone)]
pub struct ConcentricHexagons {
    x: i32,
    y: i32,
    radius: u32,
    ring: u32,
    side: usize,
    step: u32,
}

impl ConcentricHexagons {
    /// Walk order around one ring, starting one step South of the centre.
    const SIDES: [(i32, i32); 6] = [(1, 1), (0, 1), (-1, 0), (-1, -1), (0, -1), (1, 0)];

    fn enter_next_ring(&mut self) {
        self.ring += 1;
        if self.ring <= self.radius {
            self.y -= 1;
            self.side = 0;
            self.step = 0;
        }
    }
}

impl Iterator for ConcentricHexagons {
    type Item = Chip;

    fn next(&mut self) -> Option<Chip> {
        if self.ring > self.radius {
            return None;
        }
        let item = (self.x, self.y);

        if self.ring == 0 {
            self.enter_next_ring();
            return Some(item);
        }

        let (dx, dy) = Self::SIDES[self.side];
        self.x += dx;
        self.y += dy;
        self.step += 1;
        if self.step == self.ring {
            self.step = 0;
            self.side += 1;
            if self.side == Self::SIDES.len() {
                self.enter_next_ring();
            }
        }

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashSet, VecDeque};

    /// Brute-force shortest-path distance on a torus via BFS.
    fn bfs_torus_distance(width: i32, height: i32, from: Chip, to: Chip) -> i32 {
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([(from, 0)]);
        while let Some((chip, dist)) = queue.pop_front() {
            if chip == to {
                return dist;
            }
            for link in Link::ALL {
                let v = link.to_vector();
                let next = (
                    (chip.0 + v.0).rem_euclid(width),
                    (chip.1 + v.1).rem_euclid(height),
                );
                if seen.insert(next) {
                    queue.push_back((next, dist + 1));
                }
            }
        }
        unreachable!("torus is connected");
    }

    #[test]
    fn minimise_examples() {
        assert_eq!(minimise_xyz((0, 0, 0)), (0, 0, 0));
        assert_eq!(minimise_xyz((1, 1, 1)), (0, 0, 0));
        assert_eq!(minimise_xyz((2, 1, 0)), (1, 0, -1));
        assert_eq!(minimise_xyz((-1, -1, -1)), (0, 0, 0));
        assert_eq!(minimise_xyz((3, 1, 2)), (1, -1, 0));
    }

    #[test]
    fn minimised_vector_has_two_opposite_components() {
        for x in -4..4 {
            for y in -4..4 {
                for z in -4..4 {
                    let (a, b, c) = minimise_xyz((x, y, z));
                    let nonzero: Vec<i32> =
                        [a, b, c].into_iter().filter(|&v| v != 0).collect();
                    assert!(nonzero.len() <= 2, "({x}, {y}, {z}) -> ({a}, {b}, {c})");
                    if nonzero.len() == 2 {
                        assert!(nonzero[0].signum() != nonzero[1].signum());
                    }
                }
            }
        }
    }

    #[test]
    fn mesh_path_lengths() {
        assert_eq!(shortest_mesh_path_length((0, 0, 0), (0, 0, 0)), 0);
        assert_eq!(shortest_mesh_path_length((0, 0, 0), (1, 0, 0)), 1);
        assert_eq!(shortest_mesh_path_length((0, 0, 0), (1, 1, 0)), 1);
        assert_eq!(shortest_mesh_path_length((0, 0, 0), (2, 1, 0)), 2);
        assert_eq!(shortest_mesh_path_length((2, 1, 0), (0, 0, 0)), 2);
        assert_eq!(shortest_mesh_path_length((0, 0, 0), (-1, 1, 0)), 2);
    }

    #[test]
    fn mesh_path_is_minimised_difference() {
        assert_eq!(shortest_mesh_path((0, 0, 0), (2, 2, 0)), (0, 0, -2));
        assert_eq!(shortest_mesh_path((1, 0, 0), (0, 1, 0)), (-1, 1, 0));
    }

    #[test]
    fn torus_path_length_matches_bfs() {
        for &(w, h) in &[(3, 3), (4, 4), (5, 3), (2, 4)] {
            for x in 0..w {
                for y in 0..h {
                    let expected = bfs_torus_distance(w, h, (1, 1), (x, y));
                    let got =
                        shortest_torus_path_length(to_xyz((1, 1)), to_xyz((x, y)), w, h);
                    assert_eq!(got, expected, "({w}x{h}) (1,1) -> ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn torus_path_vector_is_shortest() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for &(w, h) in &[(4, 4), (8, 2), (3, 7)] {
            for x in 0..w {
                for y in 0..h {
                    let length =
                        shortest_torus_path_length(to_xyz((0, 0)), to_xyz((x, y)), w, h);
                    for _ in 0..10 {
                        let (vx, vy, vz) =
                            shortest_torus_path(to_xyz((0, 0)), to_xyz((x, y)), w, h, &mut rng);
                        // The hop count of the vector must equal the true
                        // shortest distance.
                        assert_eq!(
                            vx.abs() + vy.abs() + vz.abs(),
                            length,
                            "({w}x{h}) -> ({x},{y}) gave ({vx},{vy},{vz})"
                        );
                        // And it must actually arrive at the destination.
                        assert_eq!((vx - vz).rem_euclid(w), x);
                        assert_eq!((vy - vz).rem_euclid(h), y);
                    }
                }
            }
        }
    }

    #[test]
    fn torus_tie_break_reaches_multiple_routes() {
        // On a 4x4 torus the chip two hops East is also two hops West; both
        // vectors should appear over repeated draws.
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = HashSet::new();
        for _ in 0..64 {
            seen.insert(shortest_torus_path(to_xyz((0, 0)), to_xyz((2, 0)), 4, 4, &mut rng));
        }
        assert!(seen.len() > 1, "tie-breaking never varied: {seen:?}");
    }

    #[test]
    fn ldf_hop_count_and_endpoint() {
        let mut rng = StdRng::seed_from_u64(1);
        for &vector in &[
            (0, 0, 0),
            (3, 0, 0),
            (0, -2, 0),
            (2, -1, 3),
            (-5, 5, 0),
            (1, 1, 1),
        ] {
            let hops: Vec<(Link, Chip)> =
                longest_dimension_first(vector, (3, 3), Some(10), Some(10), &mut rng).collect();
            let (x, y, z) = vector;
            assert_eq!(hops.len() as i32, x.abs() + y.abs() + z.abs());
            let expected = ((3 + x - z).rem_euclid(10), (3 + y - z).rem_euclid(10));
            let end = hops.last().map(|&(_, chip)| chip).unwrap_or((3, 3));
            assert_eq!(end, expected, "vector {vector:?}");
        }
    }

    #[test]
    fn ldf_hops_are_unit_steps() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut at = (0, 0);
        for (link, chip) in longest_dimension_first((3, -2, 1), (0, 0), Some(8), Some(8), &mut rng)
        {
            let v = link.to_vector();
            assert_eq!(
                ((at.0 + v.0).rem_euclid(8), (at.1 + v.1).rem_euclid(8)),
                chip
            );
            at = chip;
        }
    }

    #[test]
    fn ldf_without_wrapping() {
        let mut rng = StdRng::seed_from_u64(3);
        let hops: Vec<(Link, Chip)> =
            longest_dimension_first((2, 0, 0), (9, 0), None, None, &mut rng).collect();
        assert_eq!(hops.last().map(|&(_, c)| c), Some((11, 0)));
    }

    #[test]
    fn ldf_orders_axes_by_magnitude() {
        // With distinct magnitudes the longest axis must always come first.
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let hops: Vec<(Link, Chip)> =
                longest_dimension_first((1, 4, 0), (0, 0), Some(16), Some(16), &mut rng).collect();
            assert_eq!(hops[0].0, Link::North, "seed {seed}");
        }
    }

    #[test]
    fn concentric_hexagon_counts() {
        for radius in 0..5u32 {
            let count = concentric_hexagons(radius, (0, 0)).count() as u32;
            assert_eq!(count, 1 + (1..=radius).map(|r| 6 * r).sum::<u32>());
        }
    }

    #[test]
    fn concentric_hexagons_start_at_centre() {
        let mut rings = concentric_hexagons(2, (4, 4));
        assert_eq!(rings.next(), Some((4, 4)));
        // Ring 1 are the six immediate neighbours.
        let ring1: HashSet<Chip> = rings.by_ref().take(6).collect();
        let expected: HashSet<Chip> = Link::ALL
            .iter()
            .map(|l| {
                let v = l.to_vector();
                (4 + v.0, 4 + v.1)
            })
            .collect();
        assert_eq!(ring1, expected);
    }

    #[test]
    fn concentric_hexagons_are_unique() {
        let coords: Vec<Chip> = concentric_hexagons(4, (0, 0)).collect();
        let unique: HashSet<Chip> = coords.iter().copied().collect();
        assert_eq!(coords.len(), unique.len());
    }
}
