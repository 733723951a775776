//! Procedural hex-world generation core.
//!
//! Builds a deterministic map from a seed and a [`MapGenConfig`]: sections
//! and homeland chunks, regions, topology, climate, biomes, coasts,
//! vegetation, rivers, resources and yield balancing. Use
//! [`MapGenerator`] directly, or [`build_generation_app`] to run the same
//! pipeline inside a Bevy [`App`].

pub mod balance;
pub mod biomes;
pub mod cell;
pub mod climate;
pub mod coast;
pub mod config;
pub mod crawl;
pub mod distribution;
pub mod error;
pub mod grid;
pub mod metrics;
mod noise;
pub mod partition;
pub mod pipeline;
pub mod region;
pub mod resources;
pub mod rivers;
pub mod rng;
pub mod sampling;
pub mod templates;
pub mod topology;
pub mod vegetation;
pub mod yields;

use bevy::prelude::*;

pub use balance::{
    BalanceConfig, BalanceContext, BalanceReport, BalanceStrategy, StrategyId, StrategyOutcome,
    StrategyRegistry, YieldBalancer,
};
pub use cell::{CellSnapshot, Feature, ResourceNode, RiverFlow, Shape, Terrain, Vegetation};
pub use climate::{ClimateConfig, ClimateMap, ClimateSimulator, Hemisphere};
pub use config::{
    load_config_from_env, MapGenConfig, MapGenConfigHandle, MapGenConfigMetadata, MapSettings,
};
pub use crawl::{AxisBiasedDistance, ClumpPlacementCost, Crawl, CrawlWeight, WaterMembership};
pub use error::{ConfigError, ErrorKind, MapGenError};
pub use grid::{
    CellId, CellMutation, HexDirection, HexMap, HexTopology, MapGrid, ResourceNodes, RiverCanon,
};
pub use metrics::{collect_generation_metrics, GenerationMetrics};
pub use partition::{
    divide_into_chunks, ChunkRequest, ChunkWeight, CompactChunkWeight, GridPartition, MapBorder,
    Section, SectionId,
};
pub use pipeline::{
    generate_map, GeneratedMap, GenerationReport, Homeland, MapGenerator, MapSeed, RegionTemplates,
};
pub use region::{HomelandData, Region, RegionData};
pub use resources::{ResourceCatalog, ResourceDefinition, ResourceId, ResourceKind};
pub use rivers::{River, RiverConfig, RiverGenerator, RiverPath, RiverTermination, TurnGeometry};
pub use rng::GenerationRng;
pub use templates::{
    BalanceTemplate, BiomeTemplate, HomelandTemplate, TemplateSet, TopologyTemplate,
};
pub use yields::{TerrainYieldTable, YieldEstimator, YieldScorer, YieldSummary, YieldType};

/// Construct a Bevy [`App`] that generates a map on startup and keeps
/// [`GenerationMetrics`] in sync with it.
///
/// The config comes from `MAPGEN_CONFIG_PATH` or the builtin document; the
/// seed is `seed`.
pub fn build_generation_app(seed: u64) -> App {
    let mut app = App::new();

    let (config, metadata) = load_config_from_env();
    app.insert_resource(MapGenConfigHandle::new(config))
        .insert_resource(metadata)
        .insert_resource(MapSeed(seed))
        .insert_resource(GenerationMetrics::default())
        .add_plugins(MinimalPlugins)
        .add_systems(Startup, generate_on_startup)
        .add_systems(Update, collect_generation_metrics);

    app
}

fn generate_on_startup(world: &mut World) {
    if let Err(err) = generate_map(world) {
        tracing::error!(
            target: "core_mapgen::pipeline",
            error = %err,
            kind = ?err.kind(),
            "pipeline.failed"
        );
    }
}
