//! Forest, jungle and marsh clumps.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    cell::{Terrain, Vegetation},
    crawl::{ClumpPlacementCost, Crawl},
    error::MapGenError,
    grid::{CellId, MapGrid},
    region::Region,
    rng::GenerationRng,
    templates::BiomeTemplate,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    pub min_clump: u32,
    pub max_clump: u32,
    /// Seed attempts allowed per cell of quota.
    pub attempts_per_cell: u32,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            min_clump: 2,
            max_clump: 6,
            attempts_per_cell: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VegetationReport {
    pub forest: usize,
    pub jungle: usize,
    pub marsh: usize,
    pub clumps: usize,
}

fn preferred_terrain(vegetation: Vegetation) -> &'static [Terrain] {
    match vegetation {
        Vegetation::Forest => &[Terrain::Plains, Terrain::Tundra],
        Vegetation::Jungle | Vegetation::Marsh => &[Terrain::Grassland],
        Vegetation::None => &[],
    }
}

/// Grow vegetation clumps over the region's land until each template quota
/// is met or the attempt budget runs out.
pub fn paint_vegetation<G: MapGrid + ?Sized>(
    grid: &mut G,
    region: &Region,
    template: &BiomeTemplate,
    config: &VegetationConfig,
    rng: &mut GenerationRng,
) -> Result<VegetationReport, MapGenError> {
    let land: Vec<CellId> = region
        .land()
        .iter()
        .copied()
        .filter(|c| !grid.is_water(*c))
        .collect();
    let available: HashSet<CellId> = land.iter().copied().collect();
    let mut report = VegetationReport::default();

    for (vegetation, fraction) in [
        (Vegetation::Forest, template.forest),
        (Vegetation::Jungle, template.jungle),
        (Vegetation::Marsh, template.marsh),
    ] {
        let quota = (land.len() as f32 * fraction.clamp(0.0, 1.0)).round() as usize;
        let mut placed = 0;
        let mut attempts = 0;
        let budget = quota * config.attempts_per_cell as usize;
        while placed < quota && attempts < budget {
            attempts += 1;
            let Some(&seed) = rng.choose(&land) else {
                break;
            };
            let snapshot = grid.cell(seed);
            if snapshot.vegetation != Vegetation::None
                || snapshot.resource.is_some()
                || !grid.can_change_vegetation(seed, vegetation)
            {
                continue;
            }
            let low = config.min_clump.max(1);
            let size = rng.range_inclusive(low, config.max_clump.max(low)) as usize;
            let size = size.min(quota - placed);
            let clump: Vec<CellId> = {
                let cost = ClumpPlacementCost {
                    grid: &*grid,
                    vegetation,
                    preferred: preferred_terrain(vegetation),
                };
                Crawl::new(&*grid, seed, &available, cost).take(size).collect()
            };
            for cell in clump {
                if grid.can_change_vegetation(cell, vegetation) {
                    grid.change_vegetation(cell, vegetation)?;
                    placed += 1;
                }
            }
            report.clumps += 1;
        }
        if placed < quota {
            warn!(
                target: "core_mapgen::vegetation",
                region = region.id(),
                vegetation = ?vegetation,
                placed,
                quota,
                "vegetation.quota_shortfall"
            );
        }
        match vegetation {
            Vegetation::Forest => report.forest = placed,
            Vegetation::Jungle => report.jungle = placed,
            Vegetation::Marsh => report.marsh = placed,
            Vegetation::None => {}
        }
    }

    debug!(
        target: "core_mapgen::vegetation",
        region = region.id(),
        forest = report.forest,
        jungle = report.jungle,
        marsh = report.marsh,
        clumps = report.clumps,
        "vegetation.region_painted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::{CellSnapshot, Shape},
        grid::{CellMutation, HexMap, HexTopology},
    };

    #[test]
    fn quotas_are_met_on_open_grassland() {
        let mut map = HexMap::new(10, 10, CellSnapshot::new(Terrain::Grassland, Shape::Flatlands));
        let region = Region::new(&map, 0, map.all_cells(), Vec::new());
        let template = BiomeTemplate {
            forest: 0.2,
            jungle: 0.1,
            marsh: 0.05,
            ..BiomeTemplate::default()
        };
        let mut rng = GenerationRng::new(31);

        let report =
            paint_vegetation(&mut map, &region, &template, &VegetationConfig::default(), &mut rng)
                .unwrap();
        assert_eq!(report.forest, 20);
        assert_eq!(report.jungle, 10);
        assert_eq!(report.marsh, 5);
        let count = |v| map.snapshots().iter().filter(|c| c.vegetation == v).count();
        assert_eq!(count(Vegetation::Forest), 20);
        assert_eq!(count(Vegetation::Jungle), 10);
        assert_eq!(count(Vegetation::Marsh), 5);
    }

    #[test]
    fn vegetation_respects_terrain_rules() {
        let mut map = HexMap::new(8, 8, CellSnapshot::new(Terrain::Desert, Shape::Flatlands));
        let region = Region::new(&map, 0, map.all_cells(), Vec::new());
        let template = BiomeTemplate {
            forest: 0.5,
            jungle: 0.5,
            marsh: 0.5,
            ..BiomeTemplate::default()
        };
        let mut rng = GenerationRng::new(2);

        let report =
            paint_vegetation(&mut map, &region, &template, &VegetationConfig::default(), &mut rng)
                .unwrap();
        assert_eq!(report, VegetationReport::default());
        assert!(map
            .all_cells()
            .into_iter()
            .all(|c| map.cell(c).vegetation == Vegetation::None));
    }
}
