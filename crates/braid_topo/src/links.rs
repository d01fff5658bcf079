//! The six link directions connecting a chip to its neighbours.

use serde::{Deserialize, Serialize};

/// A direction down which a chip-to-chip link leaves a chip.
///
/// The integer codes match the hardware's link numbering and are ordered
/// consecutively anticlockwise, so the opposite link is `(code + 3) % 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Link {
    /// Link 0, towards `(+1, 0)`.
    East,
    /// Link 1, towards `(+1, +1)`.
    NorthEast,
    /// Link 2, towards `(0, +1)`.
    North,
    /// Link 3, towards `(-1, 0)`.
    West,
    /// Link 4, towards `(-1, -1)`.
    SouthWest,
    /// Link 5, towards `(0, -1)`.
    South,
}

impl Link {
    /// All six links in hardware numbering order.
    pub const ALL: [Link; 6] = [
        Link::East,
        Link::NorthEast,
        Link::North,
        Link::West,
        Link::SouthWest,
        Link::South,
    ];

    /// Returns the hardware link number (0-5).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Returns the link with the given hardware number, if it is in range.
    pub fn from_index(index: u8) -> Option<Link> {
        Link::ALL.get(index as usize).copied()
    }

    /// Returns the link leaving the neighbouring chip back towards this one.
    pub fn opposite(self) -> Link {
        Link::ALL[(self.index() as usize + 3) % 6]
    }

    /// Returns the unit displacement of one hop down this link.
    pub fn to_vector(self) -> (i32, i32) {
        match self {
            Link::East => (1, 0),
            Link::NorthEast => (1, 1),
            Link::North => (0, 1),
            Link::West => (-1, 0),
            Link::SouthWest => (-1, -1),
            Link::South => (0, -1),
        }
    }

    /// Returns the link taking one hop along the given displacement vector.
    ///
    /// A component whose magnitude exceeds 1 implies the hop used a
    /// wrap-around edge, so it is folded to a unit step in the opposite
    /// direction (a displacement of `width - 1` is one hop West).
    ///
    /// The vectors `(-1, 1)` and `(1, -1)` have no link on a large system but
    /// arise on 2xN and Nx2 systems, where wrapping one axis of a diagonal
    /// hop "spirals" the displacement. They alias to SouthWest and NorthEast
    /// respectively.
    ///
    /// Returns `None` for `(0, 0)`.
    pub fn from_vector(vector: (i32, i32)) -> Option<Link> {
        let (mut x, mut y) = vector;
        if x.abs() > 1 {
            x = if x > 0 { -1 } else { 1 };
        }
        if y.abs() > 1 {
            y = if y > 0 { -1 } else { 1 };
        }

        match (x, y) {
            (1, 0) => Some(Link::East),
            (-1, 0) => Some(Link::West),
            (0, 1) => Some(Link::North),
            (0, -1) => Some(Link::South),
            (1, 1) => Some(Link::NorthEast),
            (-1, -1) => Some(Link::SouthWest),
            // 2xN/Nx2 spiral aliases.
            (-1, 1) => Some(Link::SouthWest),
            (1, -1) => Some(Link::NorthEast),
            _ => None,
        }
    }
}
