use events::Notice;
use primitives::{BoundingBox, Coord, Material, Money, OwnerId, Plot};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use super::{Economy, Host, HostError, Identity, RegionStore, VoxelGrid};

/// A region authority which keeps every plot in memory.
#[derive(Debug, Default)]
pub struct MemoryRegions {
    plots: BTreeMap<String, Plot>,
    /// Number of upcoming `add_region` calls which will fail.
    pub failing_adds: usize,
    /// While set, every `remove_region` call fails.
    pub failing_removes: bool,
    pub saves: usize,
}

impl MemoryRegions {
    pub fn new() -> MemoryRegions {
        MemoryRegions::default()
    }

    pub fn len(&self) -> usize {
        self.plots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plots.is_empty()
    }

    /// Insert or overwrite a plot without going through failure injection.
    pub fn insert(&mut self, plot: Plot) {
        self.plots.insert(plot.id.clone(), plot);
    }
}

impl RegionStore for MemoryRegions {
    fn region(&self, id: &str) -> Option<Plot> {
        self.plots.get(id).cloned()
    }

    fn regions(&self, world: &str) -> Vec<Plot> {
        self.plots.values().filter(|p| p.world == world).cloned().collect()
    }

    fn add_region(&mut self, plot: Plot) -> Result<(), HostError> {
        if self.failing_adds > 0 {
            self.failing_adds -= 1;
            return Err("region authority refused the add".into())
        }
        if self.plots.contains_key(&plot.id) {
            return Err(HostError(format!("a region named '{}' already exists", plot.id)))
        }
        self.plots.insert(plot.id.clone(), plot);
        Ok(())
    }

    fn remove_region(&mut self, id: &str) -> Result<Option<Plot>, HostError> {
        if self.failing_removes {
            return Err("region authority refused the removal".into())
        }
        Ok(self.plots.remove(id))
    }

    fn save(&mut self) -> Result<(), HostError> {
        self.saves += 1;
        Ok(())
    }
}


/// A sparse voxel world. Every voxel not written is air.
#[derive(Debug)]
pub struct MemoryGrid {
    voxels: HashMap<Coord, Material>,
    air: Material,
    min_y: i32,
    max_y: i32,
}

impl MemoryGrid {
    pub fn new(min_y: i32, max_y: i32) -> MemoryGrid {
        MemoryGrid {
            voxels: HashMap::new(),
            air: Material::new("minecraft:air"),
            min_y,
            max_y,
        }
    }

    /// Set every voxel inside `bounds`.
    pub fn fill(&mut self, bounds: BoundingBox, material: &Material) {
        let (lo, hi) = (bounds.min(), bounds.max());
        for x in lo.x()..=hi.x() {
            for y in lo.y()..=hi.y() {
                for z in lo.z()..=hi.z() {
                    self.set_voxel(Coord(x, y, z), material.clone());
                }
            }
        }
    }

    /// Every written (non-air) voxel.
    pub fn snapshot(&self) -> BTreeMap<Coord, Material> {
        self.voxels.iter().map(|(c, m)| (*c, m.clone())).collect()
    }

    /// Number of voxels currently holding `material`.
    pub fn count(&self, material: &Material) -> usize {
        self.voxels.values().filter(|m| *m == material).count()
    }
}

impl VoxelGrid for MemoryGrid {
    fn voxel(&self, at: Coord) -> Material {
        self.voxels.get(&at).cloned().unwrap_or_else(|| self.air.clone())
    }

    fn set_voxel(&mut self, at: Coord, material: Material) {
        if material == self.air {
            self.voxels.remove(&at);
        } else {
            self.voxels.insert(at, material);
        }
    }

    fn highest_solid_y(&self, x: i32, z: i32) -> i32 {
        (self.min_y..=self.max_y).rev()
            .find(|y| self.voxels.contains_key(&Coord(x, *y, z)))
            .unwrap_or(self.min_y - 1)
    }

    fn min_height(&self) -> i32 { self.min_y }

    fn max_height(&self) -> i32 { self.max_y }
}


#[derive(Debug, Default)]
pub struct MemoryEconomy {
    accounts: HashMap<OwnerId, Money>,
}

impl MemoryEconomy {
    pub fn new() -> MemoryEconomy {
        MemoryEconomy::default()
    }

    pub fn set_balance(&mut self, owner: &OwnerId, amount: Money) {
        self.accounts.insert(owner.clone(), amount);
    }
}

impl Economy for MemoryEconomy {
    fn balance(&self, owner: &OwnerId) -> Money {
        self.accounts.get(owner).cloned().unwrap_or(0)
    }

    fn withdraw(&mut self, owner: &OwnerId, amount: Money) -> Result<(), HostError> {
        let balance = self.balance(owner);
        if balance < amount {
            return Err("insufficient funds".into())
        }
        self.accounts.insert(owner.clone(), balance - amount);
        Ok(())
    }

    fn deposit(&mut self, owner: &OwnerId, amount: Money) {
        *self.accounts.entry(owner.clone()).or_insert(0) += amount;
    }
}


#[derive(Debug, Default)]
pub struct MemoryIdentity {
    names: BTreeMap<OwnerId, String>,
    online: BTreeSet<OwnerId>,
}

impl MemoryIdentity {
    pub fn new() -> MemoryIdentity {
        MemoryIdentity::default()
    }

    /// Register a player and mark them online.
    pub fn join(&mut self, id: &OwnerId, name: &str) {
        self.names.insert(id.clone(), name.to_owned());
        self.online.insert(id.clone());
    }

    pub fn leave(&mut self, id: &OwnerId) {
        self.online.remove(id);
    }
}

impl Identity for MemoryIdentity {
    fn resolve(&self, name: &str) -> Option<OwnerId> {
        self.names.iter()
            .find(|&(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(id, _)| id.clone())
    }

    fn name_of(&self, owner: &OwnerId) -> Option<String> {
        self.names.get(owner).cloned()
    }

    fn is_online(&self, owner: &OwnerId) -> bool {
        self.online.contains(owner)
    }
}


/// An in-process host: every collaborator in memory, notices collected for inspection.
#[derive(Debug)]
pub struct MemoryHost {
    pub regions: MemoryRegions,
    pub grid: MemoryGrid,
    pub economy: MemoryEconomy,
    pub identity: MemoryIdentity,
    pub notices: Vec<(OwnerId, Notice)>,
}

impl MemoryHost {
    pub fn new(min_y: i32, max_y: i32) -> MemoryHost {
        MemoryHost {
            regions: MemoryRegions::new(),
            grid: MemoryGrid::new(min_y, max_y),
            economy: MemoryEconomy::new(),
            identity: MemoryIdentity::new(),
            notices: Vec::new(),
        }
    }

    /// Notices delivered to one player, oldest first.
    pub fn notices_for(&self, owner: &OwnerId) -> Vec<Notice> {
        self.notices.iter()
            .filter(|&&(ref to, _)| to == owner)
            .map(|&(_, ref n)| n.clone())
            .collect()
    }
}

impl Host for MemoryHost {
    fn regions(&self) -> &dyn RegionStore { &self.regions }
    fn regions_mut(&mut self) -> &mut dyn RegionStore { &mut self.regions }
    fn grid(&self) -> &dyn VoxelGrid { &self.grid }
    fn grid_mut(&mut self) -> &mut dyn VoxelGrid { &mut self.grid }
    fn economy(&mut self) -> &mut dyn Economy { &mut self.economy }
    fn identity(&self) -> &dyn Identity { &self.identity }

    fn notify(&mut self, to: &OwnerId, notice: Notice) {
        self.notices.push((to.clone(), notice));
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_solid_in_column() {
        let mut grid = MemoryGrid::new(-64, 319);
        assert_eq!(grid.highest_solid_y(0, 0), -65);
        grid.set_voxel(Coord(0, 10, 0), "minecraft:stone".into());
        grid.set_voxel(Coord(0, 70, 0), "minecraft:oak_leaves".into());
        assert_eq!(grid.highest_solid_y(0, 0), 70);
        grid.set_voxel(Coord(0, 70, 0), "minecraft:air".into());
        assert_eq!(grid.highest_solid_y(0, 0), 10);
    }

    #[test]
    fn failing_adds_count_down() {
        use primitives::BoundingBox;
        let mut regions = MemoryRegions::new();
        regions.failing_adds = 1;
        let plot = Plot::new("a_1".into(), "world", "a".into(),
            BoundingBox::new(Coord(0, 0, 0), Coord(2, 2, 2)), 0);
        assert!(regions.add_region(plot.clone()).is_err());
        assert!(regions.add_region(plot.clone()).is_ok());
        assert!(regions.add_region(plot).is_err()); // duplicate id
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn economy_refuses_overdraft() {
        let mut economy = MemoryEconomy::new();
        let who: OwnerId = "u1".into();
        economy.set_balance(&who, 50);
        assert!(economy.withdraw(&who, 60).is_err());
        assert!(economy.withdraw(&who, 20).is_ok());
        economy.deposit(&who, 5);
        assert_eq!(economy.balance(&who), 35);
    }

    #[test]
    fn identity_lookup() {
        let mut identity = MemoryIdentity::new();
        let who: OwnerId = "uuid-1".into();
        identity.join(&who, "Alex");
        assert_eq!(identity.resolve("alex"), Some(who.clone()));
        assert!(identity.is_online(&who));
        identity.leave(&who);
        assert!(!identity.is_online(&who));
        assert_eq!(identity.name_of(&who), Some("Alex".to_owned()));
    }
}
