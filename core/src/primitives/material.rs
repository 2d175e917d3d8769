use std::collections::BTreeSet;
use std::fmt;

/// A voxel type as named by the host world, e.g. `minecraft:stone`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Material(pub String);

impl Material {
    pub fn new<S: Into<String>>(name: S) -> Material {
        Material(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl<'a> From<&'a str> for Material {
    fn from(s: &'a str) -> Material { Material(s.to_owned()) }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}


/// How outline placement treats a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialClass {
    Air,
    Liquid,
    /// Short plants, saplings, seagrass and the like; silently replaced by markers.
    Vegetation,
    /// Solid but see-through (glass, leaves). Supports a marker and does not bury one.
    Transparent,
    /// Everything else. Supports a marker, never replaced by one.
    Structural,
}

impl MaterialClass {
    /// Can a marker be written into a voxel of this class?
    #[inline]
    pub fn is_target(self) -> bool {
        match self {
            MaterialClass::Air | MaterialClass::Liquid | MaterialClass::Vegetation => true,
            _ => false
        }
    }

    /// Can a marker rest on top of a voxel of this class?
    #[inline]
    pub fn is_ground(self) -> bool {
        match self {
            MaterialClass::Structural | MaterialClass::Transparent => true,
            _ => false
        }
    }

    /// Does a voxel of this class leave a marker beneath it visible?
    #[inline]
    pub fn is_see_through(self) -> bool {
        match self {
            MaterialClass::Air | MaterialClass::Transparent => true,
            _ => false
        }
    }
}


/// Name lists which classify materials. Anything not listed is structural.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MaterialRules {
    pub air: BTreeSet<String>,
    pub liquids: BTreeSet<String>,
    pub vegetation: BTreeSet<String>,
    pub transparent: BTreeSet<String>,
}

impl MaterialRules {
    pub fn classify(&self, material: &Material) -> MaterialClass {
        let name = material.name();
        if self.air.contains(name) { MaterialClass::Air }
        else if self.liquids.contains(name) { MaterialClass::Liquid }
        else if self.vegetation.contains(name) { MaterialClass::Vegetation }
        else if self.transparent.contains(name) { MaterialClass::Transparent }
        else { MaterialClass::Structural }
    }
}

impl Default for MaterialRules {
    fn default() -> MaterialRules {
        fn names(list: &[&str]) -> BTreeSet<String> {
            list.iter().map(|s| format!("minecraft:{}", s)).collect()
        }

        MaterialRules {
            air: names(&["air", "cave_air", "void_air"]),
            liquids: names(&["water", "lava"]),
            vegetation: names(&[
                "grass", "short_grass", "tall_grass", "fern", "large_fern", "dead_bush",
                "dandelion", "poppy", "blue_orchid", "allium", "azure_bluet", "oxeye_daisy",
                "cornflower", "lily_of_the_valley", "oak_sapling", "spruce_sapling",
                "birch_sapling", "jungle_sapling", "acacia_sapling", "dark_oak_sapling",
                "cherry_sapling", "seagrass", "tall_seagrass", "kelp", "snow", "sweet_berry_bush",
                "brown_mushroom", "red_mushroom",
            ]),
            transparent: names(&[
                "glass", "glass_pane", "oak_leaves", "spruce_leaves", "birch_leaves",
                "jungle_leaves", "acacia_leaves", "dark_oak_leaves", "cherry_leaves", "ice",
            ]),
        }
    }
}
