//! Description of which chips and links in a system are present and working.

use crate::links::Link;
use crate::Chip;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The liveness model of an interconnect: its dimensions plus the sets of
/// dead chips and dead links.
///
/// The structure is transparent; the membership methods are utilities over
/// the public fields. Chips have coordinates `0 <= x < width` and
/// `0 <= y < height`. Links leaving a dead chip are implicitly dead. Links
/// have two directions and both ends should normally be marked dead
/// together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    /// Width of the system in chips.
    pub width: i32,
    /// Height of the system in chips.
    pub height: i32,
    /// Chips which are completely unavailable.
    pub dead_chips: HashSet<Chip>,
    /// Dead links, identified by the chip they leave and their direction.
    pub dead_links: HashSet<(Chip, Link)>,
}

impl Machine {
    /// Fraction of border wrap links which must work for the machine to be
    /// treated as a torus.
    const WRAP_AROUND_THRESHOLD: f64 = 0.9;

    /// Creates a fully-working `width x height` machine with wrap-around
    /// links.
    pub fn new(width: i32, height: i32) -> Machine {
        Machine {
            width,
            height,
            dead_chips: HashSet::new(),
            dead_links: HashSet::new(),
        }
    }

    /// Creates a `width x height` machine whose wrap-around links are all
    /// marked dead, i.e. a plain mesh.
    pub fn mesh(width: i32, height: i32) -> Machine {
        let mut dead_links = HashSet::new();
        for x in 0..width {
            dead_links.insert(((x, 0), Link::South));
            dead_links.insert(((x, 0), Link::SouthWest));
            dead_links.insert(((x, height - 1), Link::North));
            dead_links.insert(((x, height - 1), Link::NorthEast));
        }
        for y in 0..height {
            dead_links.insert(((0, y), Link::West));
            dead_links.insert(((0, y), Link::SouthWest));
            dead_links.insert(((width - 1, y), Link::East));
            dead_links.insert(((width - 1, y), Link::NorthEast));
        }
        Machine {
            width,
            height,
            dead_chips: HashSet::new(),
            dead_links,
        }
    }

    /// Tests whether the given chip is within bounds and alive.
    pub fn has_chip(&self, chip: Chip) -> bool {
        (0..self.width).contains(&chip.0)
            && (0..self.height).contains(&chip.1)
            && !self.dead_chips.contains(&chip)
    }

    /// Tests whether the given link leaving the given chip is working.
    ///
    /// A link is working when its chip is alive and the link is not in the
    /// dead set.
    pub fn has_link(&self, chip: Chip, link: Link) -> bool {
        self.has_chip(chip) && !self.dead_links.contains(&(chip, link))
    }

    /// Tests whether the machine has wrap-around links installed.
    ///
    /// Samples the border links which would leave the system: on a torus
    /// they wrap to the far side, on a mesh they are absent. Returns true
    /// when at least 90% of them work, so a torus with a few faults still
    /// routes as a torus.
    pub fn has_wrap_around_links(&self) -> bool {
        let mut working = 0usize;
        for x in 0..self.width {
            working += usize::from(self.has_link((x, 0), Link::South));
            working += usize::from(self.has_link((x, self.height - 1), Link::North));
        }
        for y in 0..self.height {
            working += usize::from(self.has_link((0, y), Link::West));
            working += usize::from(self.has_link((self.width - 1, y), Link::East));
        }
        let total = 2 * (self.width + self.height) as usize;
        working as f64 / total as f64 >= Self::WRAP_AROUND_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chip_membership() {
        let mut machine = Machine::new(4, 3);
        assert!(machine.has_chip((0, 0)));
        assert!(machine.has_chip((3, 2)));
        assert!(!machine.has_chip((4, 0)));
        assert!(!machine.has_chip((0, 3)));
        assert!(!machine.has_chip((-1, 0)));

        machine.dead_chips.insert((1, 1));
        assert!(!machine.has_chip((1, 1)));
    }

    #[test]
    fn link_membership() {
        let mut machine = Machine::new(4, 4);
        assert!(machine.has_link((0, 0), Link::East));

        machine.dead_links.insert(((0, 0), Link::East));
        assert!(!machine.has_link((0, 0), Link::East));
        assert!(machine.has_link((0, 0), Link::North));

        // Links leaving a dead chip are implicitly dead.
        machine.dead_chips.insert((2, 2));
        assert!(!machine.has_link((2, 2), Link::East));
    }

    #[test]
    fn torus_detection() {
        assert!(Machine::new(8, 8).has_wrap_around_links());
        assert!(!Machine::mesh(8, 8).has_wrap_around_links());
    }

    #[test]
    fn torus_detection_tolerates_a_few_dead_links() {
        let mut machine = Machine::new(10, 10);
        machine.dead_links.insert(((0, 0), Link::South));
        machine.dead_links.insert(((3, 0), Link::South));
        assert!(machine.has_wrap_around_links());

        // Killing a whole border drops below the threshold.
        for x in 0..10 {
            machine.dead_links.insert(((x, 0), Link::South));
            machine.dead_links.insert(((x, 9), Link::North));
        }
        assert!(!machine.has_wrap_around_links());
    }

    #[test]
    fn mesh_keeps_interior_links() {
        let machine = Machine::mesh(4, 4);
        assert!(machine.has_link((1, 1), Link::East));
        assert!(machine.has_link((2, 2), Link::SouthWest));
        assert!(!machine.has_link((3, 1), Link::East));
        assert!(!machine.has_link((1, 3), Link::North));
    }

    #[test]
    fn serde_roundtrip() {
        let mut machine = Machine::new(6, 6);
        machine.dead_chips.insert((2, 3));
        machine.dead_links.insert(((1, 1), Link::South));

        let json = serde_json::to_string(&machine).unwrap();
        let restored: Machine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, machine);
    }
}
