use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use super::BoundingBox;

/// A unique plot identification marker, stable for the lifetime of the plot.
pub type PlotId = String;

/// Stable identity of a player as resolved by the host, independent of their display name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerId(pub String);

impl<'a> From<&'a str> for OwnerId {
    fn from(s: &'a str) -> OwnerId { OwnerId(s.to_owned()) }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}


/// An owned, axis-aligned protected volume. The region authority holds the canonical copy; this is
/// the shape it is exchanged in.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Plot {
    pub id: PlotId,
    pub world: String,
    pub owner: OwnerId,
    pub members: BTreeSet<OwnerId>,
    pub flags: BTreeMap<String, String>,
    /// Tie-breaking priority for the region authority.
    pub priority: i32,
    pub bounds: BoundingBox,
}

impl Plot {
    pub fn new(id: PlotId, world: &str, owner: OwnerId, bounds: BoundingBox, priority: i32) -> Plot {
        Plot {
            id,
            world: world.to_owned(),
            owner,
            members: BTreeSet::new(),
            flags: BTreeMap::new(),
            priority,
            bounds,
        }
    }

    /// A replacement plot identical in everything but its bounds.
    pub fn with_bounds(&self, bounds: BoundingBox) -> Plot {
        Plot { bounds, ..self.clone() }
    }

    /// A replacement plot identical in everything but its flags.
    pub fn with_flags(&self, flags: BTreeMap<String, String>) -> Plot {
        Plot { flags, ..self.clone() }
    }

    #[inline]
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        self.owner == *owner
    }
}
