use error::Error;
use primitives::{Material, MaterialRules, Money};
use serde_json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How outline markers pick their height in each column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Rest on the first solid voxel found near the plot's anchor height.
    SurfaceContact,
    /// Like `SurfaceContact`, but also keep the voxel above the marker clear.
    VisibilityBiased,
    /// Always one voxel below the anchor height, no search.
    FixedOffset,
}

impl Default for PlacementStrategy {
    fn default() -> Self { PlacementStrategy::SurfaceContact }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OutlineConfig {
    pub strategy: PlacementStrategy,
    pub marker: Material,
    /// How far below the anchor height to look for ground.
    pub search_down: i32,
    /// How far above the anchor height to look for ground once the downward search fails.
    pub search_up: i32,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        OutlineConfig {
            strategy: PlacementStrategy::SurfaceContact,
            marker: Material::new("minecraft:glowstone"),
            search_down: 16,
            search_up: 16,
        }
    }
}

/// A flag that can be rented on a plot: the value it is set to while rented and its price.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlagOffer {
    pub value: String,
    pub price_per_minute: Money,
}

/// Everything tunable about plot management. Every field has a default, so a config file only
/// needs to name what it changes.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World the service manages.
    pub world: String,
    /// Width and depth of a level 0 plot. Must be odd.
    pub base_width: i32,
    /// Height of a level 0 plot. Must be odd.
    pub base_height: i32,
    pub max_level: u32,
    pub max_plots_per_owner: usize,
    pub default_priority: i32,

    pub creation_price: Money,
    /// Price of reaching level `n` is `level_price * n`.
    pub level_price: Money,
    pub vertical_price_per_minute: Money,
    pub lifetime_price_per_day: Money,

    /// Lifetime granted on creation; 0 means plots never expire.
    pub plot_lifetime_secs: u64,
    /// Shortest vertical expansion or flag rental that can be bought.
    pub min_rental_secs: u64,
    /// Minutes before expiry at which owners are warned.
    pub warning_minutes: Vec<u64>,
    pub deletion_confirm_secs: u64,
    pub purchase_confirm_secs: u64,
    pub tick_millis: u64,
    /// Period of the full outline and timer resynchronization; 0 disables it.
    pub resync_secs: u64,

    pub outline: OutlineConfig,
    pub materials: MaterialRules,
    pub rentable_flags: BTreeMap<String, FlagOffer>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            world: "world".into(),
            base_width: 15,
            base_height: 15,
            max_level: 10,
            max_plots_per_owner: 3,
            default_priority: 10,

            creation_price: 1_000,
            level_price: 500,
            vertical_price_per_minute: 20,
            lifetime_price_per_day: 100,

            plot_lifetime_secs: 30 * 24 * 60 * 60,
            min_rental_secs: 300,
            warning_minutes: vec![30, 10, 5, 1],
            deletion_confirm_secs: 60,
            purchase_confirm_secs: 30,
            tick_millis: 1_000,
            resync_secs: 15 * 60,

            outline: OutlineConfig::default(),
            materials: MaterialRules::default(),
            rentable_flags: btreemap! {
                "pvp".to_owned() => FlagOffer { value: "allow".into(), price_per_minute: 5 },
                "mob-spawning".to_owned() => FlagOffer { value: "deny".into(), price_per_minute: 3 },
                "fly".to_owned() => FlagOffer { value: "allow".into(), price_per_minute: 10 },
            },
        }
    }
}

impl Config {
    /// Load a configuration file. Fields missing from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Config, Error> {
        let raw = fs::read(path)?;
        let config: Config = serde_json::from_slice(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the geometry cannot honour.
    pub fn validate(&self) -> Result<(), Error> {
        if self.base_width < 1 || self.base_width % 2 == 0 {
            return Err(Error::Config(format!("base_width must be odd and positive, got {}", self.base_width)))
        }
        if self.base_height < 1 || self.base_height % 2 == 0 {
            return Err(Error::Config(format!("base_height must be odd and positive, got {}", self.base_height)))
        }
        if self.tick_millis == 0 {
            return Err(Error::Config("tick_millis must be positive".into()))
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn resync_period(&self) -> Option<Duration> {
        if self.resync_secs == 0 { None } else { Some(Duration::from_secs(self.resync_secs)) }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{
            "base_width": 3,
            "outline": { "strategy": "visibility_biased" }
        }"#).unwrap();

        assert_eq!(config.base_width, 3);
        assert_eq!(config.base_height, 15);
        assert_eq!(config.outline.strategy, PlacementStrategy::VisibilityBiased);
        assert_eq!(config.outline.search_down, 16);
        assert_eq!(config.warning_minutes, vec![30, 10, 5, 1]);
        assert!(config.rentable_flags.contains_key("pvp"));
    }

    #[test]
    fn even_base_is_rejected() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());
        config.base_width = 4;
        assert!(config.validate().is_err());
    }

    #[test]
    fn resync_can_be_disabled() {
        let mut config = Config::default();
        assert_eq!(config.resync_period(), Some(Duration::from_secs(900)));
        config.resync_secs = 0;
        assert_eq!(config.resync_period(), None);
    }
}
