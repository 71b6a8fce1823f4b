//! Unit types and their default combat properties
//!
//! The type tag is an opaque key for renderers; the engine only reads the
//! movement and attack reach derived from it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type of combat unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    Infantry,   // Line troops
    Ranged,     // Archers, long reach
    Magic,      // Slow casters
    Cavalry,    // Fast melee
    Alchemists, // Short-reach bombers
    Beasts,     // Fast, hard-hitting
    Constructs, // Slow, very tough
}

/// Default properties for a unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitProperties {
    /// Cells reachable per move
    pub mobility: u32,
    /// Max attack distance
    pub range: u32,
}

impl UnitType {
    /// Get default properties for this unit type
    pub fn default_properties(&self) -> UnitProperties {
        let (mobility, range) = match self {
            UnitType::Infantry => (2, 1),
            UnitType::Ranged => (2, 3),
            UnitType::Magic => (1, 2),
            UnitType::Cavalry => (3, 1),
            UnitType::Alchemists => (1, 2),
            UnitType::Beasts => (3, 1),
            UnitType::Constructs => (1, 1),
        };
        UnitProperties { mobility, range }
    }

    pub fn all() -> [UnitType; 7] {
        [
            UnitType::Infantry,
            UnitType::Ranged,
            UnitType::Magic,
            UnitType::Cavalry,
            UnitType::Alchemists,
            UnitType::Beasts,
            UnitType::Constructs,
        ]
    }

    /// Lowercase tag as used in rosters and config files
    pub fn tag(&self) -> &'static str {
        match self {
            UnitType::Infantry => "infantry",
            UnitType::Ranged => "ranged",
            UnitType::Magic => "magic",
            UnitType::Cavalry => "cavalry",
            UnitType::Alchemists => "alchemists",
            UnitType::Beasts => "beasts",
            UnitType::Constructs => "constructs",
        }
    }

    /// Single-letter glyph for text boards
    pub fn glyph(&self) -> char {
        match self {
            UnitType::Infantry => 'i',
            UnitType::Ranged => 'r',
            UnitType::Magic => 'm',
            UnitType::Cavalry => 'c',
            UnitType::Alchemists => 'a',
            UnitType::Beasts => 'b',
            UnitType::Constructs => 'k',
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_melee_types_have_range_one() {
        for unit_type in [
            UnitType::Infantry,
            UnitType::Cavalry,
            UnitType::Beasts,
            UnitType::Constructs,
        ] {
            assert_eq!(unit_type.default_properties().range, 1, "{unit_type}");
        }
    }

    #[test]
    fn test_cavalry_outpaces_infantry() {
        assert!(
            UnitType::Cavalry.default_properties().mobility
                > UnitType::Infantry.default_properties().mobility
        );
    }

    #[test]
    fn test_serde_uses_lowercase_tag() {
        for unit_type in UnitType::all() {
            let json = serde_json::to_string(&unit_type).unwrap();
            assert_eq!(json, format!("\"{}\"", unit_type.tag()));
        }
    }

    #[test]
    fn test_glyphs_unique() {
        let mut glyphs: Vec<char> = UnitType::all().iter().map(|t| t.glyph()).collect();
        glyphs.sort();
        glyphs.dedup();
        assert_eq!(glyphs.len(), UnitType::all().len());
    }
}
