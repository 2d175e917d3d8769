//! The narrow interfaces through which the core reaches its collaborators: the region authority,
//! the voxel grid, the economy and player identity. Each is implemented once by the embedding
//! host; `memory` holds in-process implementations.

pub mod memory;

use events::Notice;
use primitives::{Coord, Material, Money, OwnerId, Plot};
use std::error::Error as StdErr;
use std::fmt;

pub use self::memory::{MemoryEconomy, MemoryGrid, MemoryHost, MemoryIdentity, MemoryRegions};

/// A collaborator refused a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError(pub String);

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl StdErr for HostError {}

impl<'a> From<&'a str> for HostError {
    fn from(s: &'a str) -> HostError { HostError(s.to_owned()) }
}


/// Canonical plot storage. It has no in-place resize, which is why bounds changes go through the
/// mutator as remove-then-add.
pub trait RegionStore {
    fn region(&self, id: &str) -> Option<Plot>;
    fn regions(&self, world: &str) -> Vec<Plot>;
    fn add_region(&mut self, plot: Plot) -> Result<(), HostError>;
    /// Remove a plot, returning what was removed. Removing an unknown id is `Ok(None)`.
    fn remove_region(&mut self, id: &str) -> Result<Option<Plot>, HostError>;
    fn save(&mut self) -> Result<(), HostError>;
}

/// Block access for one world.
pub trait VoxelGrid {
    fn voxel(&self, at: Coord) -> Material;
    fn set_voxel(&mut self, at: Coord, material: Material);
    /// Y of the highest non-air voxel in the column, or `min_height() - 1` for an empty column.
    fn highest_solid_y(&self, x: i32, z: i32) -> i32;
    fn min_height(&self) -> i32;
    fn max_height(&self) -> i32;
}

pub trait Economy {
    fn balance(&self, owner: &OwnerId) -> Money;
    fn withdraw(&mut self, owner: &OwnerId, amount: Money) -> Result<(), HostError>;
    fn deposit(&mut self, owner: &OwnerId, amount: Money);
}

pub trait Identity {
    fn resolve(&self, name: &str) -> Option<OwnerId>;
    fn name_of(&self, owner: &OwnerId) -> Option<String>;
    fn is_online(&self, owner: &OwnerId) -> bool;
}

/// Everything the core needs from the embedding runtime. Accessors are split so that callers can
/// use one collaborator at a time without holding a borrow of the others.
pub trait Host {
    fn regions(&self) -> &dyn RegionStore;
    fn regions_mut(&mut self) -> &mut dyn RegionStore;
    fn grid(&self) -> &dyn VoxelGrid;
    fn grid_mut(&mut self) -> &mut dyn VoxelGrid;
    fn economy(&mut self) -> &mut dyn Economy;
    fn identity(&self) -> &dyn Identity;
    /// Deliver a notice to a player. Only called for players who are online.
    fn notify(&mut self, to: &OwnerId, notice: Notice);
}

