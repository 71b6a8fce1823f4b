//! Core type definitions used throughout the codebase

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for units, assigned monotonically at battle start
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Turn counter (starts at 1)
pub type Turn = u32;

/// Hands out unit ids in increasing order
#[derive(Debug, Clone)]
pub struct IdGenerator {
    next: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_unit_id(&mut self) -> UnitId {
        let id = UnitId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut ids = IdGenerator::new();
        let a = ids.next_unit_id();
        let b = ids.next_unit_id();
        let c = ids.next_unit_id();
        assert_eq!(a, UnitId(1));
        assert!(a < b && b < c);
    }

    #[test]
    fn test_unit_id_display() {
        assert_eq!(UnitId(7).to_string(), "#7");
    }
}
