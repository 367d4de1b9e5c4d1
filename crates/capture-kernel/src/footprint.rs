//! Per-animal collision footprints.
//!
//! Every avatar and NPC species has a width/height box used by the SAT test.
//! Dimensions come from a built-in table that room configuration may
//! override; species missing from both fall back to a default square.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Fraction of the width trimmed from each side of a footprint before
/// collision. Kept small so a group is not recaptured the tick after a
/// transfer.
pub const COLLISION_THRESHOLD: f32 = 0.1;

/// Footprint used for unknown species.
pub const DEFAULT_FOOTPRINT: Footprint = Footprint::square(1.0);

/// Width and height of a collision box in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    /// Extent along the heading axis
    pub width: f32,
    /// Extent across the heading axis
    pub height: f32,
}

impl Footprint {
    /// Creates a new footprint.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Creates a square footprint.
    #[must_use]
    pub const fn square(side: f32) -> Self {
        Self::new(side, side)
    }

    /// Shrinks both sides by `threshold * width`, never below zero.
    #[must_use]
    pub fn shrunk(self, threshold: f32) -> Self {
        let margin = self.width * threshold;
        Self {
            width: (self.width - margin).max(0.0),
            height: (self.height - margin).max(0.0),
        }
    }
}

impl Default for Footprint {
    fn default() -> Self {
        DEFAULT_FOOTPRINT
    }
}

/// Known animal species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimalKind {
    /// Fox
    Fox,
    /// Cat
    Cat,
    /// Dog
    Dog,
    /// Bunny
    Bunny,
    /// Penguin
    Penguin,
    /// Pig
    Pig,
    /// Cow
    Cow,
    /// Bear
    Bear,
}

impl AnimalKind {
    /// All species, in table order.
    pub const ALL: [Self; 8] = [
        Self::Fox,
        Self::Cat,
        Self::Dog,
        Self::Bunny,
        Self::Penguin,
        Self::Pig,
        Self::Cow,
        Self::Bear,
    ];

    /// Lowercase species key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Fox => "fox",
            Self::Cat => "cat",
            Self::Dog => "dog",
            Self::Bunny => "bunny",
            Self::Penguin => "penguin",
            Self::Pig => "pig",
            Self::Cow => "cow",
            Self::Bear => "bear",
        }
    }

    /// Parses a species key, ignoring case.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Parses the species from an NPC face file name such as `npcs/fox.png`.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        Self::from_key(species_stem(file_name))
    }

    /// Built-in footprint for this species.
    #[must_use]
    pub const fn footprint(self) -> Footprint {
        match self {
            Self::Fox => Footprint::new(1.2, 0.8),
            Self::Cat => Footprint::new(1.0, 0.7),
            Self::Dog => Footprint::new(1.3, 0.9),
            Self::Bunny => Footprint::new(0.7, 0.6),
            Self::Penguin => Footprint::new(0.8, 0.8),
            Self::Pig => Footprint::new(1.4, 1.0),
            Self::Cow => Footprint::new(2.0, 1.2),
            Self::Bear => Footprint::new(1.8, 1.4),
        }
    }
}

/// Species key of a face file name: `npcs/fox.png` gives `fox`.
fn species_stem(file_name: &str) -> &str {
    let base = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);
    base.split('.').next().unwrap_or(base)
}

/// Species → footprint lookup with configurable overrides.
#[derive(Debug, Clone, Default)]
pub struct FootprintTable {
    overrides: AHashMap<String, Footprint>,
}

impl FootprintTable {
    /// Creates a table using only built-in dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with per-species overrides (keys are case-insensitive).
    #[must_use]
    pub fn with_overrides<I, K>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, Footprint)>,
        K: AsRef<str>,
    {
        let overrides = overrides
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v))
            .collect();
        Self { overrides }
    }

    /// Looks up a species key. Never fails.
    #[must_use]
    pub fn lookup(&self, species: &str) -> Footprint {
        let key = species.trim().to_ascii_lowercase();
        if let Some(fp) = self.overrides.get(&key) {
            return *fp;
        }
        match AnimalKind::from_key(&key) {
            Some(kind) => kind.footprint(),
            None => {
                trace!("Unknown species {species:?}, using default footprint");
                DEFAULT_FOOTPRINT
            },
        }
    }

    /// Looks up the footprint for an NPC face file name, overrides included.
    #[must_use]
    pub fn for_face(&self, file_name: Option<&str>) -> Footprint {
        file_name.map_or(DEFAULT_FOOTPRINT, |name| self.lookup(species_stem(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_species_falls_back_to_square() {
        let table = FootprintTable::new();
        assert_eq!(table.lookup("dragon"), DEFAULT_FOOTPRINT);
        assert_eq!(table.for_face(Some("unicorn.png")), DEFAULT_FOOTPRINT);
        assert_eq!(table.for_face(None), DEFAULT_FOOTPRINT);
    }

    #[test]
    fn test_override_wins_over_builtin() {
        let table = FootprintTable::with_overrides([("FOX", Footprint::square(3.0))]);
        assert_eq!(table.lookup("fox"), Footprint::square(3.0));
        assert_eq!(table.lookup("cat"), AnimalKind::Cat.footprint());
    }

    #[test]
    fn test_override_applies_to_face_file_name() {
        let table = FootprintTable::with_overrides([("dragon", Footprint::square(5.0))]);
        assert_eq!(table.for_face(Some("dragon.png")), Footprint::square(5.0));
        assert_eq!(table.for_face(Some("npcs/Dragon.png")), Footprint::square(5.0));
        assert_eq!(table.for_face(Some("fox.png")), AnimalKind::Fox.footprint());
    }

    #[test]
    fn test_species_from_file_name() {
        assert_eq!(AnimalKind::from_file_name("fox.png"), Some(AnimalKind::Fox));
        assert_eq!(AnimalKind::from_file_name("npcs/Bear.webp"), Some(AnimalKind::Bear));
        assert_eq!(AnimalKind::from_file_name("rock.png"), None);
    }

    #[test]
    fn test_shrunk_uses_width_fraction() {
        let fp = Footprint::new(2.0, 1.0).shrunk(0.1);
        assert!((fp.width - 1.8).abs() < 1e-6);
        assert!((fp.height - 0.8).abs() < 1e-6);
        assert_eq!(Footprint::new(1.0, 0.05).shrunk(0.1).height, 0.0);
    }

    #[test]
    fn test_species_serde_is_lowercase() {
        let json = serde_json::to_string(&AnimalKind::Penguin).expect("serialize");
        assert_eq!(json, "\"penguin\"");
    }
}
