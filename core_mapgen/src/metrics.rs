use bevy::prelude::*;

use crate::{
    balance::StrategyId,
    cell::{Shape, Terrain, Vegetation},
    grid::HexTopology,
    pipeline::GeneratedMap,
};

/// Summary of the current [`GeneratedMap`], refreshed by
/// [`collect_generation_metrics`].
#[derive(Resource, Default, Debug, Clone)]
pub struct GenerationMetrics {
    pub seed: u64,
    pub grid_size: (u32, u32),
    pub land_cells: usize,
    pub water_cells: usize,
    pub lake_cells: usize,
    pub mountain_cells: usize,
    pub hill_cells: usize,
    pub vegetated_cells: usize,
    pub rivered_cells: usize,
    pub rivers_built: usize,
    pub river_attempts_failed: usize,
    pub resource_nodes: usize,
    pub resource_shortfall: u32,
    pub unbalanced_scopes: usize,
    pub strategy_applications: [u32; StrategyId::COUNT],
}

impl GenerationMetrics {
    pub fn from_map(generated: &GeneratedMap) -> Self {
        let map = &generated.map;
        let dims = map.dimensions();
        let mut metrics = Self {
            seed: generated.seed,
            grid_size: (dims.x, dims.y),
            rivers_built: generated.report.rivers_built(),
            river_attempts_failed: generated.report.river_attempts_failed(),
            resource_shortfall: generated.report.resource_shortfall(),
            unbalanced_scopes: generated.report.unbalanced_scopes(),
            strategy_applications: generated.report.strategy_applications(),
            ..Self::default()
        };

        for cell in map.snapshots() {
            if cell.is_water() {
                metrics.water_cells += 1;
                if cell.terrain == Terrain::FreshWater {
                    metrics.lake_cells += 1;
                }
            } else {
                metrics.land_cells += 1;
            }
            match cell.shape {
                Shape::Mountains => metrics.mountain_cells += 1,
                Shape::Hills => metrics.hill_cells += 1,
                Shape::Flatlands => {}
            }
            if cell.vegetation != Vegetation::None {
                metrics.vegetated_cells += 1;
            }
            if cell.resource.is_some() {
                metrics.resource_nodes += 1;
            }
            if cell.has_river() {
                metrics.rivered_cells += 1;
            }
        }
        metrics
    }
}

pub fn collect_generation_metrics(
    generated: Option<Res<GeneratedMap>>,
    mut metrics: ResMut<GenerationMetrics>,
) {
    let Some(generated) = generated else {
        return;
    };
    if generated.is_changed() {
        *metrics = GenerationMetrics::from_map(&generated);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::MapGenConfig, pipeline::MapGenerator};

    #[test]
    fn metrics_add_up_to_the_grid() {
        let mut config = MapGenConfig::default();
        config.map.width = 20;
        config.map.height = 14;
        config.map.civilization_count = 1;
        config.map.min_seed_separation = 0;
        config.map.border = 1;
        config.map.erosion_threshold = 0.0;
        config.climate.ticks = 4;
        let generated = MapGenerator::new(Arc::new(config))
            .unwrap()
            .generate(21)
            .unwrap();

        let metrics = GenerationMetrics::from_map(&generated);
        assert_eq!(metrics.grid_size, (20, 14));
        assert_eq!(metrics.land_cells + metrics.water_cells, 20 * 14);
        assert_eq!(metrics.land_cells, generated.report.land_cells);
        assert!(metrics.lake_cells <= metrics.water_cells);
        assert_eq!(metrics.seed, 21);
    }
}
