//! Cloud and moisture diffusion plus latitude temperature.
//!
//! The simulation runs over the whole grid with two buffers: every tick
//! reads `current` and accumulates into `next`, then the buffers swap.
//! Temperature is not diffused; it is computed once from latitude, elevation
//! and a noise jitter.

use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    cell::Shape,
    grid::{CellId, HexDirection, MapGrid},
    noise::{lerp, NoiseField},
    rng::GenerationRng,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    /// Equator across the middle row, poles at both edges.
    #[default]
    Both,
    /// Equator along the southern edge.
    North,
    /// Equator along the northern edge.
    South,
}

/// Maximum clouds a cell can hold before the rest rains out.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CloudCeilings {
    pub flatlands: f32,
    pub hills: f32,
    pub mountains: f32,
}

impl Default for CloudCeilings {
    fn default() -> Self {
        Self {
            flatlands: 1.0,
            hills: 0.6,
            mountains: 0.3,
        }
    }
}

impl CloudCeilings {
    pub fn for_shape(&self, shape: Shape) -> f32 {
        match shape {
            Shape::Flatlands => self.flatlands,
            Shape::Hills => self.hills,
            Shape::Mountains => self.mountains,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClimateConfig {
    pub ticks: u32,
    /// Clouds emitted by a water cell per tick.
    pub evaporation: f32,
    /// Fraction of a land cell's moisture that evaporates per tick.
    pub land_evaporation: f32,
    pub precipitation: f32,
    pub runoff: f32,
    pub seepage: f32,
    pub starting_moisture: f32,
    /// Direction the wind blows from.
    pub wind_direction: HexDirection,
    pub wind_strength: f32,
    pub cloud_ceilings: CloudCeilings,
    pub hemisphere: Hemisphere,
    pub low_temperature: f32,
    pub high_temperature: f32,
    /// Temperature lost per elevation step above flatlands.
    pub elevation_falloff: f32,
    pub temperature_jitter: f32,
    pub jitter_frequency: f32,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            ticks: default_ticks(),
            evaporation: 0.5,
            land_evaporation: 0.5,
            precipitation: 0.25,
            runoff: 0.25,
            seepage: 0.125,
            starting_moisture: 0.1,
            wind_direction: HexDirection::NW,
            wind_strength: 4.0,
            cloud_ceilings: CloudCeilings::default(),
            hemisphere: Hemisphere::Both,
            low_temperature: 0.0,
            high_temperature: 1.0,
            elevation_falloff: 0.2,
            temperature_jitter: 0.1,
            jitter_frequency: 0.1,
        }
    }
}

const fn default_ticks() -> u32 {
    40
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ClimateCell {
    clouds: f32,
    moisture: f32,
}

/// Per-cell climate outcome, indexed by [`CellId`].
#[derive(Debug, Clone, Default)]
pub struct ClimateMap {
    pub moisture: Vec<f32>,
    pub temperature: Vec<f32>,
    /// Mean precipitation per tick.
    pub precipitation: Vec<f32>,
}

impl ClimateMap {
    pub fn moisture(&self, cell: CellId) -> f32 {
        self.moisture.get(cell.index()).copied().unwrap_or(0.0)
    }

    pub fn temperature(&self, cell: CellId) -> f32 {
        self.temperature.get(cell.index()).copied().unwrap_or(0.0)
    }

    pub fn precipitation(&self, cell: CellId) -> f32 {
        self.precipitation.get(cell.index()).copied().unwrap_or(0.0)
    }
}

pub struct ClimateSimulator {
    config: ClimateConfig,
    water: Vec<bool>,
    elevation: Vec<u8>,
    ceiling: Vec<f32>,
    neighbors: Vec<[Option<CellId>; 6]>,
    current: Vec<ClimateCell>,
    next: Vec<ClimateCell>,
    precipitation: Vec<f32>,
    ticks_run: u32,
}

impl ClimateSimulator {
    pub fn new<G: MapGrid + ?Sized>(grid: &G, config: &ClimateConfig) -> Self {
        let cells = grid.all_cells();
        let mut water = Vec::with_capacity(cells.len());
        let mut elevation = Vec::with_capacity(cells.len());
        let mut ceiling = Vec::with_capacity(cells.len());
        let mut neighbors = Vec::with_capacity(cells.len());
        for cell in &cells {
            let snapshot = grid.cell(*cell);
            water.push(snapshot.is_water());
            elevation.push(snapshot.elevation());
            ceiling.push(config.cloud_ceilings.for_shape(snapshot.shape));
            neighbors.push(HexDirection::ALL.map(|dir| grid.neighbor(*cell, dir)));
        }
        let start = ClimateCell {
            clouds: 0.0,
            moisture: config.starting_moisture.clamp(0.0, 1.0),
        };
        Self {
            config: config.clone(),
            water,
            elevation,
            ceiling,
            neighbors,
            current: vec![start; cells.len()],
            next: vec![ClimateCell::default(); cells.len()],
            precipitation: vec![0.0; cells.len()],
            ticks_run: 0,
        }
    }

    /// Run the configured number of ticks and bake temperature.
    pub fn simulate<G: MapGrid + ?Sized>(
        grid: &G,
        config: &ClimateConfig,
        rng: &mut GenerationRng,
    ) -> ClimateMap {
        let mut simulator = Self::new(grid, config);
        for _ in 0..config.ticks {
            simulator.step();
        }
        let temperature = temperatures(grid, config, rng.next_u64());
        let map = simulator.finish(temperature);

        let count = map.moisture.len().max(1) as f32;
        info!(
            target: "core_mapgen::climate",
            ticks = config.ticks,
            mean_moisture = map.moisture.iter().sum::<f32>() / count,
            mean_temperature = map.temperature.iter().sum::<f32>() / count,
            "climate.simulated"
        );
        map
    }

    /// Advance one tick. Returns the mass injected by water cells (moisture
    /// reset to 1 plus emitted clouds).
    pub fn step(&mut self) -> f32 {
        let cfg = &self.config;
        let downwind = cfg.wind_direction.opposite();
        let wind = cfg.wind_strength.max(0.0);
        let mut injected = 0.0;

        for idx in 0..self.current.len() {
            let mut cell = self.current[idx];
            if self.water[idx] {
                injected += (1.0 - cell.moisture) + cfg.evaporation;
                cell.moisture = 1.0;
                cell.clouds += cfg.evaporation;
            } else {
                let evaporated = cell.moisture * cfg.land_evaporation;
                cell.moisture -= evaporated;
                cell.clouds += evaporated;
            }

            let rain = cell.clouds * cfg.precipitation;
            cell.clouds -= rain;
            cell.moisture += rain;

            let ceiling = self.ceiling[idx];
            if cell.clouds > ceiling {
                let overflow = cell.clouds - ceiling;
                cell.moisture += overflow;
                cell.clouds = ceiling;
                self.precipitation[idx] += overflow;
            }
            self.precipitation[idx] += rain;

            let dispersal = cell.clouds / (5.0 + wind);
            let runoff = cell.moisture * cfg.runoff / 6.0;
            let seepage = cell.moisture * cfg.seepage / 6.0;
            let own_elevation = self.elevation[idx];

            for dir in HexDirection::ALL {
                let Some(neighbor) = self.neighbors[idx][dir.index()] else {
                    continue;
                };
                let target = &mut self.next[neighbor.index()];
                target.clouds += if dir == downwind {
                    dispersal * wind
                } else {
                    dispersal
                };

                let other_elevation = self.elevation[neighbor.index()];
                if other_elevation < own_elevation {
                    cell.moisture -= runoff;
                    target.moisture += runoff;
                } else if other_elevation == own_elevation {
                    cell.moisture -= seepage;
                    target.moisture += seepage;
                }
            }

            let own = &mut self.next[idx];
            own.moisture += cell.moisture;
        }

        for cell in &mut self.next {
            cell.moisture = cell.moisture.clamp(0.0, 1.0);
        }
        std::mem::swap(&mut self.current, &mut self.next);
        self.next.fill(ClimateCell::default());
        self.ticks_run += 1;

        debug!(
            target: "core_mapgen::climate",
            tick = self.ticks_run,
            injected,
            "climate.tick"
        );
        injected
    }

    /// Sum of clouds and moisture over every cell.
    pub fn total_mass(&self) -> f32 {
        self.current.iter().map(|c| c.clouds + c.moisture).sum()
    }

    pub fn moisture(&self, cell: CellId) -> f32 {
        self.current
            .get(cell.index())
            .map(|c| c.moisture)
            .unwrap_or(0.0)
    }

    pub fn clouds(&self, cell: CellId) -> f32 {
        self.current
            .get(cell.index())
            .map(|c| c.clouds)
            .unwrap_or(0.0)
    }

    fn finish(self, temperature: Vec<f32>) -> ClimateMap {
        let ticks = self.ticks_run.max(1) as f32;
        ClimateMap {
            moisture: self.current.iter().map(|c| c.moisture).collect(),
            temperature,
            precipitation: self.precipitation.iter().map(|p| p / ticks).collect(),
        }
    }
}

fn temperatures<G: MapGrid + ?Sized>(grid: &G, config: &ClimateConfig, seed: u64) -> Vec<f32> {
    let dims = grid.dimensions();
    let rows = dims.y.max(2) as f32 - 1.0;
    let jitter = NoiseField::new(seed, 0x7E3A, config.jitter_frequency, 2);

    grid.all_cells()
        .into_iter()
        .map(|cell| {
            let offset = grid.offset_of(cell);
            let mut latitude = offset.y as f32 / rows;
            match config.hemisphere {
                Hemisphere::Both => {
                    latitude *= 2.0;
                    if latitude > 1.0 {
                        latitude = 2.0 - latitude;
                    }
                }
                Hemisphere::North => latitude = 1.0 - latitude,
                Hemisphere::South => {}
            }
            let mut temperature = lerp(config.low_temperature, config.high_temperature, latitude);
            let above_flat = grid.cell(cell).elevation().saturating_sub(1) as f32;
            temperature *= (1.0 - config.elevation_falloff * above_flat).max(0.0);
            temperature += jitter.signed(offset.x, offset.y) * config.temperature_jitter;
            temperature.clamp(0.0, 1.0)
        })
        .collect()
}
