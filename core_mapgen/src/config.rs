use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use bevy::prelude::Resource;
use serde::Deserialize;

use crate::{
    balance::BalanceConfig,
    climate::ClimateConfig,
    error::ConfigError,
    resources::{default_resource_definitions, ResourceDefinition},
    rivers::RiverConfig,
    templates::{BalanceTemplate, TemplateSet},
    vegetation::VegetationConfig,
    yields::{ScoringConfig, YieldsConfig},
};

pub const BUILTIN_MAPGEN_CONFIG: &str = include_str!("data/mapgen_config.json");

/// Grid size, homeland layout and land-mask parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub width: u32,
    pub height: u32,
    /// Side of the block each partition section is seeded in.
    pub section_size: u32,
    /// Number of homelands, one chunk of sections each.
    pub civilization_count: usize,
    pub min_seed_separation: u32,
    pub max_cells_per_chunk: usize,
    /// Soft border width; chunk seeds avoid it and it stays ocean.
    pub border: u32,
    /// Water bodies up to this many cells become lakes.
    pub lake_max_size: usize,
    /// Homeland cells whose land noise falls below this become water.
    pub erosion_threshold: f32,
    pub erosion_frequency: f32,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            width: 48,
            height: 32,
            section_size: 4,
            civilization_count: 2,
            min_seed_separation: 10,
            max_cells_per_chunk: 320,
            border: 2,
            lake_max_size: 6,
            erosion_threshold: 0.2,
            erosion_frequency: 0.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapGenConfig {
    pub map: MapSettings,
    pub climate: ClimateConfig,
    pub rivers: RiverConfig,
    pub yields: YieldsConfig,
    pub scoring: ScoringConfig,
    pub resources: Vec<ResourceDefinition>,
    pub templates: TemplateSet,
    pub balance: BalanceConfig,
    pub vegetation: VegetationConfig,
}

impl Default for MapGenConfig {
    fn default() -> Self {
        Self {
            map: MapSettings::default(),
            climate: ClimateConfig::default(),
            rivers: RiverConfig::default(),
            yields: YieldsConfig::default(),
            scoring: ScoringConfig::default(),
            resources: default_resource_definitions(),
            templates: TemplateSet::default(),
            balance: BalanceConfig::default(),
            vegetation: VegetationConfig::default(),
        }
    }
}

impl MapGenConfig {
    pub fn builtin() -> Arc<Self> {
        let parsed: MapGenConfig = serde_json::from_str(BUILTIN_MAPGEN_CONFIG)
            .expect("builtin mapgen config should parse");
        Arc::new(parsed)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MapGenConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Reject values the generator cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let map = &self.map;
        if map.width == 0 || map.height == 0 {
            return invalid(format!("map is {}x{}", map.width, map.height));
        }
        if map.section_size == 0 {
            return invalid("map.section_size must be positive".into());
        }
        if map.civilization_count == 0 {
            return invalid("map.civilization_count must be positive".into());
        }
        if map.max_cells_per_chunk == 0 {
            return invalid("map.max_cells_per_chunk must be positive".into());
        }
        unit("map.erosion_threshold", map.erosion_threshold)?;

        let climate = &self.climate;
        for (name, value) in [
            ("climate.evaporation", climate.evaporation),
            ("climate.land_evaporation", climate.land_evaporation),
            ("climate.precipitation", climate.precipitation),
            ("climate.runoff", climate.runoff),
            ("climate.seepage", climate.seepage),
            ("climate.starting_moisture", climate.starting_moisture),
        ] {
            unit(name, value)?;
        }
        if climate.wind_strength < 0.0 {
            return invalid(format!("climate.wind_strength is {}", climate.wind_strength));
        }
        if climate.low_temperature > climate.high_temperature {
            return invalid("climate.low_temperature is above high_temperature".into());
        }

        unit("rivers.rivered_cell_fraction", self.rivers.rivered_cell_fraction)?;

        if self.vegetation.min_clump > self.vegetation.max_clump {
            return invalid("vegetation.min_clump is above max_clump".into());
        }

        let templates = &self.templates;
        if templates.biomes.is_empty() || templates.topologies.is_empty() {
            return invalid("at least one biome and one topology template are required".into());
        }
        for biome in &templates.biomes {
            for value in [
                biome.snow,
                biome.tundra,
                biome.desert,
                biome.grassland,
                biome.forest,
                biome.jungle,
                biome.marsh,
            ] {
                unit(&format!("biome {}", biome.name), value)?;
            }
            if biome.snow + biome.tundra + biome.desert + biome.grassland > 1.0 + f32::EPSILON {
                return invalid(format!("biome {} terrain fractions exceed 1", biome.name));
            }
        }
        for topology in &templates.topologies {
            unit(&format!("topology {}", topology.name), topology.hills)?;
            unit(&format!("topology {}", topology.name), topology.mountains)?;
        }
        if templates.homeland.regions_per_homeland == 0 {
            return invalid("homeland.regions_per_homeland must be positive".into());
        }
        band("homeland.region_balance", &templates.homeland.region_balance)?;
        band("homeland.homeland_balance", &templates.homeland.homeland_balance)?;
        Ok(())
    }
}

fn invalid(message: String) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(message))
}

fn unit(name: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        invalid(format!("{name} is {value}, expected a value in [0, 1]"))
    }
}

fn band(name: &str, template: &BalanceTemplate) -> Result<(), ConfigError> {
    if template.min_score_per_cell > template.max_score_per_cell {
        return invalid(format!(
            "{name} min score {} is above max score {}",
            template.min_score_per_cell, template.max_score_per_cell
        ));
    }
    Ok(())
}

#[derive(Resource, Debug, Clone)]
pub struct MapGenConfigHandle(Arc<MapGenConfig>);

impl MapGenConfigHandle {
    pub fn new(config: Arc<MapGenConfig>) -> Self {
        Self(config)
    }

    pub fn get(&self) -> Arc<MapGenConfig> {
        self.0.clone()
    }
}

impl Default for MapGenConfigHandle {
    fn default() -> Self {
        Self::new(MapGenConfig::builtin())
    }
}

/// Where the active config came from; `None` for the builtin document.
#[derive(Resource, Debug, Clone, Default)]
pub struct MapGenConfigMetadata {
    path: Option<PathBuf>,
}

impl MapGenConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Load the config named by `MAPGEN_CONFIG_PATH`, or the builtin one.
pub fn load_config_from_env() -> (Arc<MapGenConfig>, MapGenConfigMetadata) {
    if let Some(path) = env::var("MAPGEN_CONFIG_PATH").ok().map(PathBuf::from) {
        match MapGenConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "core_mapgen::config",
                    path = %path.display(),
                    "mapgen_config.loaded=file"
                );
                return (Arc::new(config), MapGenConfigMetadata::new(Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "core_mapgen::config",
                    path = %path.display(),
                    error = %err,
                    "mapgen_config.load_failed"
                );
            }
        }
    }

    let config = MapGenConfig::builtin();
    tracing::info!(target: "core_mapgen::config", "mapgen_config.loaded=builtin");
    (config, MapGenConfigMetadata::default())
}
