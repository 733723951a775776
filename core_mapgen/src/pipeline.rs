//! Whole-map generation.
//!
//! [`MapGenerator::generate`] runs every pass in a fixed order over a fresh
//! [`HexMap`], threading one [`GenerationRng`] through all of them:
//!
//! 1. partition the grid into sections and group them into one chunk per
//!    homeland;
//! 2. raise the chunks as land and split each homeland into regions;
//! 3. per region topology, then climate over the whole map, then biomes;
//! 4. coastline and lakes, vegetation, rivers;
//! 5. initial resources, region balancing, homeland balancing;
//! 6. one starting location per homeland.
//!
//! Caller mistakes are rejected before the grid is touched; structural
//! failures abort; shortfalls are logged and collected in the
//! [`GenerationReport`].

use std::{cmp::Reverse, collections::HashSet, sync::Arc};

use bevy::prelude::{Resource, World};
use tracing::{debug, info, warn};

use crate::{
    balance::{BalanceContext, BalanceReport, StrategyId, StrategyRegistry, YieldBalancer},
    biomes::{paint_biomes, BiomeReport},
    cell::{CellSnapshot, Shape, Terrain},
    climate::{ClimateMap, ClimateSimulator},
    coast::{shape_coastline, CoastReport},
    config::{MapGenConfig, MapGenConfigHandle},
    crawl::{AxisBiasedDistance, Crawl},
    distribution::{
        distribute_homeland_luxuries, distribute_region_resources, DistributionReport,
    },
    error::MapGenError,
    grid::{CellId, CellMutation, HexMap, HexTopology, RiverCanon},
    noise::NoiseField,
    partition::{
        divide_into_chunks, ChunkRequest, CompactChunkWeight, GridPartition, MapBorder, SectionId,
    },
    region::{HomelandData, Region, RegionData},
    resources::{ResourceCatalog, ResourceRestrictions},
    rivers::{River, RiverGenerator},
    rng::GenerationRng,
    sampling,
    topology::{generate_region_topology, TopologyReport},
    vegetation::{paint_vegetation, VegetationReport},
    yields::{TerrainYieldTable, YieldScorer},
};

const LAND_NOISE_SALT: u32 = 0x4c41_4e44;
const LAND_NOISE_OCTAVES: u32 = 3;

/// Seed used by [`generate_map`].
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapSeed(pub u64);

/// Template indices chosen for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionTemplates {
    pub biome: usize,
    pub topology: usize,
}

#[derive(Debug, Clone)]
pub struct Homeland {
    pub id: usize,
    pub sections: Vec<SectionId>,
    /// Indices into [`GeneratedMap::regions`].
    pub regions: Vec<usize>,
    pub starting_location: CellId,
}

#[derive(Debug, Clone, Default)]
pub struct RegionReport {
    pub region: usize,
    pub topology: TopologyReport,
    pub biomes: BiomeReport,
    pub vegetation: VegetationReport,
    pub rivers_built: usize,
    pub river_attempts_failed: usize,
    pub resources: DistributionReport,
    pub balance: BalanceReport,
}

#[derive(Debug, Clone, Default)]
pub struct HomelandReport {
    pub homeland: usize,
    pub luxuries: DistributionReport,
    pub balance: BalanceReport,
}

/// Everything a run measured, including every soft shortfall.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub seed: u64,
    pub sections: usize,
    pub land_cells: usize,
    pub water_cells: usize,
    pub coast: CoastReport,
    pub regions: Vec<RegionReport>,
    pub homelands: Vec<HomelandReport>,
}

impl GenerationReport {
    pub fn rivers_built(&self) -> usize {
        self.regions.iter().map(|r| r.rivers_built).sum()
    }

    pub fn river_attempts_failed(&self) -> usize {
        self.regions.iter().map(|r| r.river_attempts_failed).sum()
    }

    fn balance_reports(&self) -> impl Iterator<Item = &BalanceReport> {
        self.regions
            .iter()
            .map(|r| &r.balance)
            .chain(self.homelands.iter().map(|h| &h.balance))
    }

    /// Successful strategy applications across both balancing scopes.
    pub fn strategy_applications(&self) -> [u32; StrategyId::COUNT] {
        let mut totals = [0u32; StrategyId::COUNT];
        for report in self.balance_reports() {
            for (total, count) in totals.iter_mut().zip(report.applications.iter()) {
                *total += count;
            }
        }
        totals
    }

    /// Scopes (regions and homelands) that ended outside their band.
    pub fn unbalanced_scopes(&self) -> usize {
        self.balance_reports().filter(|r| !r.is_balanced()).count()
    }

    pub fn resource_shortfall(&self) -> u32 {
        self.regions
            .iter()
            .map(|r| r.resources.shortfall)
            .chain(self.homelands.iter().map(|h| h.luxuries.shortfall))
            .sum()
    }
}

/// Result of a successful run.
#[derive(Resource, Debug, Clone)]
pub struct GeneratedMap {
    pub seed: u64,
    pub map: HexMap,
    /// Homeland regions first, the ocean region last.
    pub regions: Vec<Region>,
    /// Templates per homeland region, parallel to the front of `regions`.
    pub region_templates: Vec<RegionTemplates>,
    pub homelands: Vec<Homeland>,
    pub climate: ClimateMap,
    pub rivers: Vec<River>,
    pub report: GenerationReport,
}

impl GeneratedMap {
    /// Region holding `cell`; every cell belongs to exactly one.
    pub fn region_of(&self, cell: CellId) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(cell))
    }
}

struct Layout {
    partition: GridPartition,
    homelands: Vec<Vec<SectionId>>,
    regions: Vec<Region>,
    /// Region indices per homeland.
    members: Vec<Vec<usize>>,
}

pub struct MapGenerator {
    config: Arc<MapGenConfig>,
    catalog: ResourceCatalog,
    estimator: TerrainYieldTable,
    scorer: YieldScorer,
    registry: StrategyRegistry,
}

impl MapGenerator {
    pub fn new(config: Arc<MapGenConfig>) -> Result<Self, MapGenError> {
        config.validate()?;
        let catalog = ResourceCatalog::new(config.resources.clone());
        let estimator = TerrainYieldTable::new(&config.yields, &catalog);
        let scorer = YieldScorer::new(&config.scoring);
        Ok(Self {
            config,
            catalog,
            estimator,
            scorer,
            registry: StrategyRegistry::builtin(),
        })
    }

    pub fn config(&self) -> &MapGenConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn generate(&self, seed: u64) -> Result<GeneratedMap, MapGenError> {
        let settings = &self.config.map;
        let templates = &self.config.templates;
        let mut rng = GenerationRng::new(seed);
        let mut map = HexMap::ocean(settings.width, settings.height);
        let mut report = GenerationReport {
            seed,
            ..GenerationReport::default()
        };

        let layout = self.lay_out(&mut map, &mut rng)?;
        report.sections = layout.partition.len();
        let homeland_regions: usize = layout.members.iter().map(Vec::len).sum();

        let region_templates: Vec<RegionTemplates> = (0..homeland_regions)
            .map(|_| self.pick_templates(&mut rng))
            .collect();
        let mut region_reports: Vec<RegionReport> = (0..homeland_regions)
            .map(|region| RegionReport {
                region,
                ..RegionReport::default()
            })
            .collect();

        for (idx, chosen) in region_templates.iter().enumerate() {
            region_reports[idx].topology = generate_region_topology(
                &mut map,
                &layout.regions[idx],
                &templates.topologies[chosen.topology],
                &mut rng,
            )?;
        }

        let climate = ClimateSimulator::simulate(&map, &self.config.climate, &mut rng);
        for (idx, chosen) in region_templates.iter().enumerate() {
            region_reports[idx].biomes = paint_biomes(
                &mut map,
                &layout.regions[idx],
                &templates.biomes[chosen.biome],
                &climate,
            )?;
        }

        report.coast = shape_coastline(&mut map, settings.lake_max_size)?;

        for (idx, chosen) in region_templates.iter().enumerate() {
            region_reports[idx].vegetation = paint_vegetation(
                &mut map,
                &layout.regions[idx],
                &templates.biomes[chosen.biome],
                &self.config.vegetation,
                &mut rng,
            )?;
        }

        let mut rivers = Vec::new();
        let river_generator = RiverGenerator::new(&self.config.rivers);
        for idx in 0..homeland_regions {
            let outcome =
                river_generator.generate(&mut map, layout.regions[idx].land(), &mut rng)?;
            let built = outcome.rivers.iter().filter(|r| r.reached_water()).count();
            region_reports[idx].rivers_built = built;
            region_reports[idx].river_attempts_failed = outcome.failed_attempts;
            rivers.extend(outcome.rivers);
        }

        let data: Vec<RegionData<'_>> = region_templates
            .iter()
            .map(|chosen| {
                RegionData::new(
                    &templates.biomes[chosen.biome],
                    &templates.topologies[chosen.topology],
                    &templates.homeland,
                    &self.catalog,
                )
            })
            .collect();
        report.homelands = self.populate_and_balance(
            &mut map,
            &mut rng,
            &layout,
            &data,
            &mut region_reports,
        );
        report.regions = region_reports;

        let mut homelands = Vec::with_capacity(layout.homelands.len());
        for (id, (sections, members)) in layout
            .homelands
            .into_iter()
            .zip(layout.members)
            .enumerate()
        {
            let starting_location = self.starting_location(&map, &layout.regions, &members, id)?;
            homelands.push(Homeland {
                id,
                sections,
                regions: members,
                starting_location,
            });
        }

        report.land_cells = map.land_cells().len();
        report.water_cells = map.cell_count() - report.land_cells;
        info!(
            target: "core_mapgen::pipeline",
            seed,
            sections = report.sections,
            homelands = homelands.len(),
            regions = layout.regions.len(),
            land = report.land_cells,
            rivers = report.rivers_built(),
            unbalanced = report.unbalanced_scopes(),
            "pipeline.generated"
        );

        Ok(GeneratedMap {
            seed,
            map,
            regions: layout.regions,
            region_templates,
            homelands,
            climate,
            rivers,
            report,
        })
    }

    /// Partition, homeland chunks, land mask and regions.
    fn lay_out(&self, map: &mut HexMap, rng: &mut GenerationRng) -> Result<Layout, MapGenError> {
        let settings = &self.config.map;
        let partition = GridPartition::build(&*map, settings.section_size, rng)?;
        if settings.civilization_count > partition.len() {
            return Err(MapGenError::ChunkCountOutOfRange {
                requested: settings.civilization_count,
                available: partition.len(),
            });
        }

        let border = MapBorder::new(settings.border);
        let request = ChunkRequest {
            chunk_count: settings.civilization_count,
            max_cells_per_chunk: settings.max_cells_per_chunk,
            min_seed_separation: settings.min_seed_separation,
            border,
            assign_orphans: false,
        };
        let homelands = divide_into_chunks(
            &*map,
            &partition,
            &partition.section_ids(),
            &request,
            &CompactChunkWeight::new(border),
            rng,
        )?;

        let noise = NoiseField::new(
            rng.next_u64(),
            LAND_NOISE_SALT,
            settings.erosion_frequency,
            LAND_NOISE_OCTAVES,
        );
        let dims = map.dimensions();
        let mut homeland_land: Vec<Vec<CellId>> = Vec::with_capacity(homelands.len());
        for sections in &homelands {
            let mut land = Vec::new();
            for cell in partition.cells_of(sections) {
                let offset = map.offset_of(cell);
                if border.contains(dims, offset)
                    || noise.sample(offset.x, offset.y) < settings.erosion_threshold
                {
                    continue;
                }
                map.set_cell(cell, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
                land.push(cell);
            }
            land.sort_unstable();
            homeland_land.push(land);
        }

        let per_homeland = self.config.templates.homeland.regions_per_homeland as usize;
        let mut regions = Vec::new();
        let mut members = Vec::with_capacity(homelands.len());
        let mut claimed: HashSet<CellId> = HashSet::new();
        for land in &homeland_land {
            let mut indices = Vec::new();
            for cells in split_into_regions(&*map, land, per_homeland, rng) {
                let water: Vec<CellId> = adjacent_water(&*map, &cells, &claimed);
                claimed.extend(cells.iter().copied());
                claimed.extend(water.iter().copied());
                indices.push(regions.len());
                regions.push(Region::new(&*map, regions.len(), cells, water));
            }
            members.push(indices);
        }

        let ocean: Vec<CellId> = map
            .all_cells()
            .into_iter()
            .filter(|c| !claimed.contains(c))
            .collect();
        if !ocean.is_empty() {
            regions.push(Region::new(&*map, regions.len(), Vec::new(), ocean));
        }

        debug!(
            target: "core_mapgen::pipeline",
            homelands = homelands.len(),
            regions = regions.len(),
            "pipeline.layout_ready"
        );
        Ok(Layout {
            partition,
            homelands,
            regions,
            members,
        })
    }

    fn pick_templates(&self, rng: &mut GenerationRng) -> RegionTemplates {
        let templates = &self.config.templates;
        let biomes: Vec<usize> = (0..templates.biomes.len()).collect();
        let topologies: Vec<usize> = (0..templates.topologies.len()).collect();
        RegionTemplates {
            biome: sampling::sample_one(rng, &biomes, |i| f64::from(templates.biomes[*i].weight))
                .unwrap_or(0),
            topology: sampling::sample_one(rng, &topologies, |i| {
                f64::from(templates.topologies[*i].weight)
            })
            .unwrap_or(0),
        }
    }

    /// Initial resources, then balancing per region and per homeland.
    fn populate_and_balance(
        &self,
        map: &mut HexMap,
        rng: &mut GenerationRng,
        layout: &Layout,
        data: &[RegionData<'_>],
        region_reports: &mut [RegionReport],
    ) -> Vec<HomelandReport> {
        let homeland_template = &self.config.templates.homeland;
        let homeland_data = HomelandData::new(homeland_template);
        let balancer = YieldBalancer::new(&self.registry);
        let mut ctx = BalanceContext {
            grid: map,
            rng,
            estimator: &self.estimator,
            scorer: &self.scorer,
            catalog: &self.catalog,
            restrictions: ResourceRestrictions,
            config: &self.config.balance,
        };

        let mut homeland_reports = Vec::with_capacity(layout.members.len());
        for (homeland, indices) in layout.members.iter().enumerate() {
            let members: Vec<(&Region, &RegionData<'_>)> = indices
                .iter()
                .map(|idx| (&layout.regions[*idx], &data[*idx]))
                .collect();
            for (region, region_data) in &members {
                region_reports[region.id()].resources =
                    distribute_region_resources(&mut ctx, region, region_data);
            }
            let luxuries = distribute_homeland_luxuries(&mut ctx, homeland_template, &members);
            for (region, region_data) in &members {
                region_reports[region.id()].balance =
                    balancer.balance_region(&mut ctx, region, region_data);
            }
            let balance = balancer.balance_homeland(&mut ctx, &homeland_data, &members);
            if !balance.is_balanced() {
                warn!(
                    target: "core_mapgen::pipeline",
                    homeland,
                    score = balance.final_score,
                    "pipeline.homeland_unbalanced"
                );
            }
            homeland_reports.push(HomelandReport {
                homeland,
                luxuries,
                balance,
            });
        }
        homeland_reports
    }

    /// Best flat land cell away from coasts and rivers in the homeland's
    /// first region, scored over the cell and its neighbors.
    fn starting_location(
        &self,
        map: &HexMap,
        regions: &[Region],
        members: &[usize],
        homeland: usize,
    ) -> Result<CellId, MapGenError> {
        let Some(first) = members.first().map(|idx| &regions[*idx]) else {
            return Err(MapGenError::NoStartingLocation { homeland });
        };
        let score = |cell: CellId| -> f32 {
            std::iter::once(cell)
                .chain(map.neighbors(cell))
                .map(|c| {
                    self.scorer
                        .score_of_snapshot(&map.cell(c), &self.estimator, &self.catalog)
                })
                .sum()
        };
        let mut best: Option<(f32, CellId)> = None;
        for cell in first.land().iter().copied() {
            let snapshot = map.cell(cell);
            if !snapshot.is_land()
                || snapshot.shape != Shape::Flatlands
                || map.has_water_neighbor(cell)
                || map.has_river(cell)
            {
                continue;
            }
            let value = score(cell);
            // Ties keep the lower cell id.
            if best.map_or(true, |(top, _)| value > top) {
                best = Some((value, cell));
            }
        }
        match best {
            Some((value, cell)) => {
                debug!(
                    target: "core_mapgen::pipeline",
                    homeland,
                    cell = cell.0,
                    score = value,
                    "pipeline.starting_location"
                );
                Ok(cell)
            }
            None => Err(MapGenError::NoStartingLocation { homeland }),
        }
    }
}

/// Split one homeland's land into up to `count` regions.
///
/// Each region is grown by a crawl from the cell farthest from earlier
/// seeds, alternately stretched along `x` and `z`, and takes an even share
/// of what is left. Cells no crawl reached join the region with the nearest
/// seed.
fn split_into_regions<T: HexTopology + ?Sized>(
    topology: &T,
    land: &[CellId],
    count: usize,
    rng: &mut GenerationRng,
) -> Vec<Vec<CellId>> {
    let count = count.min(land.len());
    let mut available: HashSet<CellId> = land.iter().copied().collect();
    let mut seeds: Vec<CellId> = Vec::with_capacity(count);
    let mut regions: Vec<Vec<CellId>> = Vec::with_capacity(count);

    for idx in 0..count {
        let mut remaining: Vec<CellId> = available.iter().copied().collect();
        remaining.sort_unstable();
        let seed = if seeds.is_empty() {
            remaining.get(rng.index(remaining.len().max(1))).copied()
        } else {
            remaining.iter().copied().max_by_key(|cell| {
                let nearest = seeds
                    .iter()
                    .map(|seed| topology.distance(*cell, *seed))
                    .min()
                    .unwrap_or(0);
                (nearest, Reverse(*cell))
            })
        };
        let Some(seed) = seed else {
            break;
        };
        let share = (remaining.len() / (count - idx)).max(1);
        let (x_bias, z_bias) = if idx % 2 == 0 { (0.0, 1.0) } else { (1.0, 0.0) };
        let weight = AxisBiasedDistance {
            topology,
            x_bias,
            z_bias,
        };
        let cells: Vec<CellId> = Crawl::new(topology, seed, &available, weight)
            .take(share)
            .collect();
        for cell in &cells {
            available.remove(cell);
        }
        seeds.push(seed);
        regions.push(cells);
    }

    let mut leftovers: Vec<CellId> = available.into_iter().collect();
    leftovers.sort_unstable();
    for cell in leftovers {
        let nearest =
            (0..seeds.len()).min_by_key(|idx| (topology.distance(cell, seeds[*idx]), *idx));
        if let Some(idx) = nearest {
            regions[idx].push(cell);
        }
    }
    regions
}

/// Unclaimed water cells touching any of `land`.
fn adjacent_water<T: CellMutation + ?Sized>(
    grid: &T,
    land: &[CellId],
    claimed: &HashSet<CellId>,
) -> Vec<CellId> {
    let mut seen: HashSet<CellId> = HashSet::new();
    let mut water = Vec::new();
    for cell in land {
        for neighbor in grid.neighbors(*cell) {
            if grid.is_water(neighbor) && !claimed.contains(&neighbor) && seen.insert(neighbor) {
                water.push(neighbor);
            }
        }
    }
    water
}

/// Generate a map from the [`MapGenConfigHandle`] and [`MapSeed`] resources
/// and insert it as a [`GeneratedMap`] resource.
///
/// Missing resources fall back to the builtin config and seed 0.
pub fn generate_map(world: &mut World) -> Result<(), MapGenError> {
    let config = world
        .get_resource::<MapGenConfigHandle>()
        .map(MapGenConfigHandle::get)
        .unwrap_or_else(MapGenConfig::builtin);
    let seed = world.get_resource::<MapSeed>().copied().unwrap_or_default();
    let generated = MapGenerator::new(config)?.generate(seed.0)?;
    world.insert_resource(generated);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn small_config() -> MapGenConfig {
        let mut config = MapGenConfig::default();
        config.map.width = 24;
        config.map.height = 16;
        config.map.civilization_count = 1;
        config.map.min_seed_separation = 0;
        config.map.border = 1;
        config.map.erosion_threshold = 0.0;
        config.climate.ticks = 8;
        config
    }

    #[test]
    fn regions_cover_every_cell_once() {
        let generator = MapGenerator::new(Arc::new(small_config())).unwrap();
        let generated = generator.generate(11).unwrap();

        let mut owners = vec![0usize; generated.map.cell_count()];
        for region in &generated.regions {
            for cell in region.cells() {
                owners[cell.index()] += 1;
            }
        }
        assert!(owners.iter().all(|count| *count == 1));
        assert_eq!(generated.homelands.len(), 1);
        assert_eq!(
            generated.region_templates.len(),
            generated.homelands[0].regions.len()
        );
    }

    #[test]
    fn border_stays_ocean() {
        let generator = MapGenerator::new(Arc::new(small_config())).unwrap();
        let generated = generator.generate(3).unwrap();
        let border = MapBorder::new(1);
        let dims = generated.map.dimensions();
        for cell in generated.map.all_cells() {
            if border.contains(dims, generated.map.offset_of(cell)) {
                assert!(generated.map.is_water(cell), "border cell {cell:?} is land");
            }
        }
    }

    #[test]
    fn starting_location_is_flat_inland_and_dry() {
        let generator = MapGenerator::new(Arc::new(small_config())).unwrap();
        let generated = generator.generate(5).unwrap();
        let start = generated.homelands[0].starting_location;
        let snapshot = generated.map.cell(start);
        assert!(snapshot.is_land());
        assert_eq!(snapshot.shape, Shape::Flatlands);
        assert!(!generated.map.has_water_neighbor(start));
        assert!(!generated.map.has_river(start));
        let first = generated.homelands[0].regions[0];
        assert!(generated.regions[first].contains(start));
    }

    #[test]
    fn too_many_civilizations_is_rejected_before_generation() {
        let mut config = small_config();
        config.map.section_size = 64;
        config.map.civilization_count = 2;
        let generator = MapGenerator::new(Arc::new(config)).unwrap();
        let err = generator.generate(1).unwrap_err();
        assert!(matches!(
            err,
            MapGenError::ChunkCountOutOfRange {
                requested: 2,
                available: 1
            }
        ));
        assert_eq!(err.kind(), ErrorKind::CallerInput);
    }

    #[test]
    fn split_regions_partition_the_land() {
        let map = HexMap::new(12, 8, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
        let land = map.all_cells();
        let mut rng = GenerationRng::new(4);
        let regions = split_into_regions(&map, &land, 3, &mut rng);
        assert_eq!(regions.len(), 3);
        let mut all: Vec<CellId> = regions.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, land);
        assert!(regions.iter().all(|region| !region.is_empty()));
    }

    #[test]
    fn generate_map_inserts_resource() {
        let mut world = World::new();
        world.insert_resource(MapGenConfigHandle::new(Arc::new(small_config())));
        world.insert_resource(MapSeed(9));
        generate_map(&mut world).unwrap();
        let generated = world.resource::<GeneratedMap>();
        assert_eq!(generated.seed, 9);
        assert_eq!(generated.report.seed, 9);
    }
}
