//! River synthesis along hex edges.
//!
//! A river is laid cell by cell along a land route ending next to water.
//! On every cell it walks part of the cell outline, entering at the corner
//! where the previous cell's walk stopped and leaving at a corner of the edge
//! shared with the next cell.

mod path;
mod pathfinding;

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{debug, info, warn};

pub use path::{Corner, RiverPath, TurnGeometry};

use crate::{
    cell::{RiverFlow, Shape, Terrain},
    error::MapGenError,
    grid::{CellId, HexDirection, MapGrid},
    rng::GenerationRng,
    sampling,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiverConfig {
    /// Share of a region's land cells that should end up touching a river.
    pub rivered_cell_fraction: f32,
    pub base_weight: f32,
    /// Extra source/endpoint weight per desert, tundra or snow cell within
    /// one step.
    pub extreme_weight: f32,
    /// Turn touched flat desert into flood plains.
    pub flood_plains: bool,
    /// Attempt cap per land cell in the region.
    pub attempts_per_land_cell: usize,
}

impl Default for RiverConfig {
    fn default() -> Self {
        Self {
            rivered_cell_fraction: 0.12,
            base_weight: 1.0,
            extreme_weight: 4.0,
            flood_plains: true,
            attempts_per_land_cell: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiverEdge {
    pub cell: CellId,
    pub direction: HexDirection,
    pub flow: RiverFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiverTermination {
    /// Reached water or joined an existing river.
    Water,
    /// No candidate path fit; edges laid before the failing cell remain.
    Fail,
}

/// Progress of a river being laid along its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiverState {
    NoRiver,
    /// The source cell is laid and the walk left it at `exit`.
    Started { exit: Corner },
    /// Route cells before `next` are laid; the last of them was left at
    /// `exit`.
    InProgress { next: usize, exit: Corner },
    Terminated(RiverTermination),
}

impl RiverEdge {
    /// Corner of `cell` the edge is walked from.
    pub fn start(&self) -> Corner {
        Corner::before(self.direction, self.flow)
    }

    /// Corner of `cell` the edge is walked to.
    pub fn end(&self) -> Corner {
        Corner::after(self.direction, self.flow)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct River {
    /// Route cells the river was laid on, in flow order.
    pub cells: Vec<CellId>,
    /// Edges newly added by this river.
    pub edges: Vec<RiverEdge>,
    pub termination: RiverTermination,
}

impl River {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn reached_water(&self) -> bool {
        self.termination == RiverTermination::Water
    }
}

/// Corner of `cell` that touches water, looking at both cells that share it.
fn corner_touches_water<G: MapGrid + ?Sized>(grid: &G, cell: CellId, corner: Corner) -> bool {
    corner
        .edges()
        .iter()
        .filter_map(|dir| grid.neighbor(cell, *dir))
        .any(|n| grid.is_water(n))
}

/// Outcome of checking one path on one cell without touching the grid.
struct Fit {
    to_add: Vec<HexDirection>,
    reached_water: bool,
}

fn fit_path<G: MapGrid + ?Sized>(
    grid: &G,
    cell: CellId,
    path: &RiverPath,
    check_entry: bool,
) -> Option<Fit> {
    if check_entry && corner_touches_water(grid, cell, path.entry) {
        return Some(Fit {
            to_add: Vec::new(),
            reached_water: true,
        });
    }
    let mut to_add = Vec::new();
    for edge in &path.edges {
        match grid.flow_at_edge(cell, *edge) {
            Some(existing) if existing == path.flow => {}
            Some(_) => return None,
            None if grid.can_add_river(cell, *edge, path.flow) => to_add.push(*edge),
            None => return None,
        }
        if corner_touches_water(grid, cell, Corner::after(*edge, path.flow)) {
            return Some(Fit {
                to_add,
                reached_water: true,
            });
        }
    }
    Some(Fit {
        to_add,
        reached_water: false,
    })
}

/// Lays a river along `route`, which must be a chain of adjacent land cells
/// whose last cell borders water (or an existing river).
struct RiverWalker<'g, G: MapGrid + ?Sized> {
    grid: &'g mut G,
    river: River,
}

impl<'g, G: MapGrid + ?Sized> RiverWalker<'g, G> {
    fn new(grid: &'g mut G) -> Self {
        Self {
            grid,
            river: River {
                cells: Vec::new(),
                edges: Vec::new(),
                termination: RiverTermination::Fail,
            },
        }
    }

    fn commit(&mut self, cell: CellId, flow: RiverFlow, fit: &Fit) -> Result<(), MapGenError> {
        for direction in &fit.to_add {
            self.grid.add_river(cell, *direction, flow)?;
            self.river.edges.push(RiverEdge {
                cell,
                direction: *direction,
                flow,
            });
        }
        self.river.cells.push(cell);
        Ok(())
    }

    fn finish(mut self, termination: RiverTermination) -> River {
        self.river.termination = termination;
        debug!(
            target: "core_mapgen::rivers",
            termination = ?termination,
            cells = self.river.cells.len(),
            edges = self.river.edges.len(),
            "rivers.walk_finished"
        );
        self.river
    }

    fn walk(mut self, route: &[CellId], rng: &mut GenerationRng) -> Result<River, MapGenError> {
        let mut state = RiverState::NoRiver;
        loop {
            state = match state {
                RiverState::NoRiver => self.begin(route, rng)?,
                RiverState::Started { exit } => self.advance(route, 1, exit)?,
                RiverState::InProgress { next, exit } => self.advance(route, next, exit)?,
                RiverState::Terminated(termination) => return Ok(self.finish(termination)),
            };
        }
    }

    fn begin(
        &mut self,
        route: &[CellId],
        rng: &mut GenerationRng,
    ) -> Result<RiverState, MapGenError> {
        let (first, second) = match route {
            [] => return Ok(RiverState::Terminated(RiverTermination::Fail)),
            [only] => return self.lone(*only),
            [first, second, ..] => (*first, *second),
        };
        let Some(to_next) = self.grid.direction_to(first, second) else {
            return Ok(RiverState::Terminated(RiverTermination::Fail));
        };
        Ok(match self.start(first, to_next, rng)? {
            Some(Step::Continue(exit)) => RiverState::Started { exit },
            Some(Step::Water) => RiverState::Terminated(RiverTermination::Water),
            None => RiverState::Terminated(RiverTermination::Fail),
        })
    }

    /// Lay route cell `index`, entered at the vertex the previous cell was
    /// left at.
    fn advance(
        &mut self,
        route: &[CellId],
        index: usize,
        exit: Corner,
    ) -> Result<RiverState, MapGenError> {
        let previous = index.checked_sub(1).and_then(|i| route.get(i));
        let (Some(&cell), Some(&previous)) = (route.get(index), previous) else {
            return Ok(RiverState::Terminated(RiverTermination::Fail));
        };
        let (Some(to_previous), Some(shared)) = (
            self.grid.direction_to(cell, previous),
            self.grid.direction_to(previous, cell),
        ) else {
            return Ok(RiverState::Terminated(RiverTermination::Fail));
        };
        let entry = exit.across(shared);
        let flow = entry.departing_flow(to_previous);

        let step = match route.get(index + 1).copied() {
            Some(next) => match self.grid.direction_to(cell, next) {
                Some(to_next) => self.cross(cell, to_previous, to_next, flow)?,
                None => None,
            },
            None => self.end(cell, to_previous, flow)?,
        };
        Ok(match step {
            Some(Step::Water) => RiverState::Terminated(RiverTermination::Water),
            Some(Step::Continue(exit)) => RiverState::InProgress {
                next: index + 1,
                exit,
            },
            None => {
                debug!(
                    target: "core_mapgen::rivers",
                    cell = cell.0,
                    "rivers.no_fitting_path"
                );
                RiverState::Terminated(RiverTermination::Fail)
            }
        })
    }

    /// First cell: one edge beside the edge toward the next cell, the
    /// orientation picked by a coin flip with the other as fallback.
    fn start(
        &mut self,
        cell: CellId,
        to_next: HexDirection,
        rng: &mut GenerationRng,
    ) -> Result<Option<Step>, MapGenError> {
        let flows = if rng.coin_flip() {
            [RiverFlow::Clockwise, RiverFlow::Counterclockwise]
        } else {
            [RiverFlow::Counterclockwise, RiverFlow::Clockwise]
        };
        for flow in flows {
            let path = RiverPath::source(to_next, flow);
            if let Some(fit) = fit_path(&*self.grid, cell, &path, false) {
                self.commit(cell, flow, &fit)?;
                return Ok(Some(if fit.reached_water {
                    Step::Water
                } else {
                    Step::Continue(path.exit())
                }));
            }
        }
        Ok(None)
    }

    fn cross(
        &mut self,
        cell: CellId,
        to_previous: HexDirection,
        to_next: HexDirection,
        flow: RiverFlow,
    ) -> Result<Option<Step>, MapGenError> {
        for path in RiverPath::through(to_previous, to_next, flow) {
            let Some(fit) = fit_path(&*self.grid, cell, &path, true) else {
                continue;
            };
            self.commit(cell, flow, &fit)?;
            return Ok(Some(if fit.reached_water {
                Step::Water
            } else {
                Step::Continue(path.exit())
            }));
        }
        Ok(None)
    }

    /// Last cell: bend toward water or an existing river, trying turn
    /// geometries in [`TurnGeometry::ENDPOINT_PRIORITY`] order.
    fn end(
        &mut self,
        cell: CellId,
        to_previous: HexDirection,
        flow: RiverFlow,
    ) -> Result<Option<Step>, MapGenError> {
        for geometry in TurnGeometry::ENDPOINT_PRIORITY {
            let to_next = geometry.next_direction(to_previous);
            let Some(target) = self.grid.neighbor(cell, to_next) else {
                continue;
            };
            let joins_river = self.grid.has_river_along_edge(cell, to_next);
            if !self.grid.is_water(target) && !joins_river {
                continue;
            }
            for path in RiverPath::through(to_previous, to_next, flow) {
                let Some(fit) = fit_path(&*self.grid, cell, &path, true) else {
                    continue;
                };
                if !fit.reached_water && !joins_river {
                    continue;
                }
                self.commit(cell, flow, &fit)?;
                debug!(
                    target: "core_mapgen::rivers",
                    cell = cell.0,
                    geometry = ?geometry,
                    joins_river,
                    "rivers.endpoint_resolved"
                );
                return Ok(Some(Step::Water));
            }
        }
        Ok(None)
    }

    /// A route of one cell: a single edge to a land neighbor whose far
    /// corner touches water.
    fn lone(&mut self, cell: CellId) -> Result<RiverState, MapGenError> {
        for direction in HexDirection::ALL {
            let Some(neighbor) = self.grid.neighbor(cell, direction) else {
                continue;
            };
            if self.grid.is_water(neighbor) {
                continue;
            }
            for flow in [RiverFlow::Clockwise, RiverFlow::Counterclockwise] {
                if !corner_touches_water(&*self.grid, cell, Corner::after(direction, flow)) {
                    continue;
                }
                let path = RiverPath {
                    entry: Corner::before(direction, flow),
                    flow,
                    edges: vec![direction],
                };
                if let Some(fit) = fit_path(&*self.grid, cell, &path, false) {
                    self.commit(cell, flow, &fit)?;
                    return Ok(RiverState::Terminated(RiverTermination::Water));
                }
            }
        }
        Ok(RiverState::Terminated(RiverTermination::Fail))
    }
}

enum Step {
    Water,
    Continue(Corner),
}

/// Lay a river along an explicit route of adjacent land cells.
///
/// The grid is mutated cell by cell; a [`RiverTermination::Fail`] keeps the
/// edges laid on earlier cells.
pub fn trace_river<G: MapGrid + ?Sized>(
    grid: &mut G,
    route: &[CellId],
    rng: &mut GenerationRng,
) -> Result<River, MapGenError> {
    RiverWalker::new(grid).walk(route, rng)
}

#[derive(Debug, Clone, Default)]
pub struct RiverReport {
    pub rivers: Vec<River>,
    pub failed_attempts: usize,
    pub attempts: usize,
    pub rivered_cells: usize,
    pub target_cells: usize,
}

/// Picks sources and endpoints inside one region and lays rivers between
/// them until enough cells border a river.
pub struct RiverGenerator<'c> {
    config: &'c RiverConfig,
}

impl<'c> RiverGenerator<'c> {
    pub fn new(config: &'c RiverConfig) -> Self {
        Self { config }
    }

    fn weight<G: MapGrid + ?Sized>(&self, grid: &G, cell: CellId) -> f64 {
        let extreme = std::iter::once(cell)
            .chain(grid.neighbors(cell))
            .filter(|c| grid.cell(*c).terrain.is_extreme())
            .count();
        f64::from(self.config.base_weight + self.config.extreme_weight * extreme as f32)
    }

    pub fn generate<G: MapGrid + ?Sized>(
        &self,
        grid: &mut G,
        land: &[CellId],
        rng: &mut GenerationRng,
    ) -> Result<RiverReport, MapGenError> {
        let target = (land.len() as f32 * self.config.rivered_cell_fraction).ceil() as usize;
        let mut report = RiverReport {
            target_cells: target,
            ..RiverReport::default()
        };
        if target == 0 {
            return Ok(report);
        }
        let allowed: HashSet<CellId> = land.iter().copied().collect();
        let max_attempts = land.len() * self.config.attempts_per_land_cell;
        let reach = (target / 3).max(2) as u32;
        let mut rivered: HashSet<CellId> = land
            .iter()
            .copied()
            .filter(|c| grid.has_river(*c))
            .collect();

        let sources: Vec<CellId> = land
            .iter()
            .copied()
            .filter(|c| {
                let snapshot = grid.cell(*c);
                snapshot.is_land()
                    && snapshot.shape != Shape::Flatlands
                    && !grid.has_water_neighbor(*c)
            })
            .collect();
        let ordered = sampling::sample(rng, &sources, sources.len(), |c| self.weight(&*grid, *c));

        'sources: for source in ordered {
            if report.rivered_cells >= target || report.attempts >= max_attempts {
                break;
            }
            if rivered.contains(&source) {
                continue;
            }
            let endpoints: Vec<CellId> = land
                .iter()
                .copied()
                .filter(|c| {
                    *c != source
                        && !rivered.contains(c)
                        && grid.distance(source, *c) <= reach
                        && !grid.is_water(*c)
                        && grid.has_water_neighbor(*c)
                })
                .collect();
            let endpoints =
                sampling::sample(rng, &endpoints, endpoints.len(), |c| self.weight(&*grid, *c));

            for endpoint in endpoints {
                if report.attempts >= max_attempts {
                    break 'sources;
                }
                report.attempts += 1;
                let Some(route) =
                    pathfinding::shortest_land_path(&*grid, source, endpoint, &allowed)
                else {
                    continue;
                };
                let river = trace_river(grid, &route, rng)?;
                if !river.reached_water() {
                    report.failed_attempts += 1;
                    warn!(
                        target: "core_mapgen::rivers",
                        source = source.0,
                        endpoint = endpoint.0,
                        laid = river.edges.len(),
                        "rivers.attempt_failed"
                    );
                    for edge in &river.edges {
                        rivered.insert(edge.cell);
                    }
                    continue;
                }
                let touched = self.settle(grid, &river)?;
                for cell in touched {
                    if allowed.contains(&cell) && rivered.insert(cell) {
                        report.rivered_cells += 1;
                    }
                }
                report.rivers.push(river);
                continue 'sources;
            }
        }

        info!(
            target: "core_mapgen::rivers",
            rivers = report.rivers.len(),
            failed = report.failed_attempts,
            attempts = report.attempts,
            rivered = report.rivered_cells,
            target,
            "rivers.generated"
        );
        Ok(report)
    }

    /// Cells on both sides of every new edge, turned into flood plains where
    /// the grid allows it.
    fn settle<G: MapGrid + ?Sized>(
        &self,
        grid: &mut G,
        river: &River,
    ) -> Result<Vec<CellId>, MapGenError> {
        let mut touched = Vec::new();
        for edge in &river.edges {
            touched.push(edge.cell);
            if let Some(neighbor) = grid.neighbor(edge.cell, edge.direction) {
                touched.push(neighbor);
            }
        }
        touched.sort_unstable();
        touched.dedup();
        if self.config.flood_plains {
            for cell in &touched {
                if grid.cell(*cell).terrain != Terrain::FloodPlains
                    && grid.can_change_terrain(*cell, Terrain::FloodPlains)
                {
                    grid.change_terrain(*cell, Terrain::FloodPlains)?;
                }
            }
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::CellSnapshot,
        grid::{CellMutation, HexMap, HexTopology, RiverCanon},
    };

    fn hills(terrain: Terrain) -> CellSnapshot {
        CellSnapshot::new(terrain, Shape::Hills)
    }

    #[test]
    fn lone_source_beside_water_gives_single_cell_river() {
        let mut map = HexMap::ocean(5, 5);
        let source = map.cell_at_offset(2, 2).unwrap();
        let land = map.neighbor(source, HexDirection::E).unwrap();
        map.set_cell(source, hills(Terrain::Plains));
        map.set_cell(land, hills(Terrain::Plains));
        let mut rng = GenerationRng::new(3);

        let river = trace_river(&mut map, &[source], &mut rng).unwrap();
        assert_eq!(river.termination, RiverTermination::Water);
        assert_eq!(river.len(), 1);
        assert_eq!(river.edges.len(), 1);
        assert_eq!(river.edges[0].direction, HexDirection::E);
        assert!(map.has_river_along_edge(land, HexDirection::W));
    }

    #[test]
    fn straight_route_reaches_the_sea() {
        // Land strip along row 2 with sea on every side.
        let mut map = HexMap::ocean(8, 5);
        let route: Vec<CellId> = (1..7).map(|x| map.cell_at_offset(x, 2).unwrap()).collect();
        for x in 1..7 {
            let cell = map.cell_at_offset(x, 2).unwrap();
            map.set_cell(cell, hills(Terrain::Plains));
        }
        for x in 1..7 {
            for z in [1, 3] {
                let cell = map.cell_at_offset(x, z).unwrap();
                map.set_cell(cell, hills(Terrain::Plains));
            }
        }
        let mut rng = GenerationRng::new(9);

        let river = trace_river(&mut map, &route, &mut rng).unwrap();
        assert!(river.reached_water());
        assert!(!river.edges.is_empty());
        for edge in &river.edges {
            let neighbor = map.neighbor(edge.cell, edge.direction).unwrap();
            assert!(map.cell(edge.cell).is_land());
            assert!(map.cell(neighbor).is_land());
            assert_eq!(map.flow_at_edge(edge.cell, edge.direction), Some(edge.flow));
            assert_eq!(
                map.flow_at_edge(neighbor, edge.direction.opposite()),
                Some(edge.flow.opposite())
            );
        }
    }

    /// A vertex named by the cells around it, so both sides agree on it.
    fn vertex(map: &HexMap, cell: CellId, corner: Corner) -> [Option<CellId>; 3] {
        let [a, b] = corner.edges();
        let mut key = [Some(cell), map.neighbor(cell, a), map.neighbor(cell, b)];
        key.sort();
        key
    }

    #[test]
    fn laid_edges_chain_corner_to_corner() {
        let mut map = HexMap::new(9, 9, hills(Terrain::Plains));
        for x in 0..9 {
            let cell = map.cell_at_offset(x, 8).unwrap();
            map.set_cell(cell, CellSnapshot::ocean());
        }
        let route: Vec<CellId> = (2..8).map(|z| map.cell_at_offset(4, z).unwrap()).collect();
        let allowed: HashSet<CellId> = map.all_cells().into_iter().collect();
        let start = route[0];
        let goal = *route.last().unwrap();
        let path = pathfinding::shortest_land_path(&map, start, goal, &allowed).unwrap();
        let mut rng = GenerationRng::new(21);

        let river = trace_river(&mut map, &path, &mut rng).unwrap();
        assert!(river.reached_water());
        assert_eq!(river.cells.first(), Some(&start));
        assert!(!river.edges.is_empty());
        for pair in river.edges.windows(2) {
            assert_eq!(
                vertex(&map, pair[0].cell, pair[0].end()),
                vertex(&map, pair[1].cell, pair[1].start()),
                "gap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
        let last = river.edges.last().unwrap();
        assert!(corner_touches_water(&map, last.cell, last.end()));
        for cell in &river.cells {
            assert!(map.has_river(*cell));
        }
    }

    #[test]
    fn lone_cell_without_water_fails() {
        let mut map = HexMap::new(3, 1, hills(Terrain::Plains));
        let mut rng = GenerationRng::new(1);
        let river = trace_river(&mut map, &[CellId(1)], &mut rng).unwrap();
        assert_eq!(river.termination, RiverTermination::Fail);
        assert!(river.edges.is_empty());
    }

    #[test]
    fn generator_reaches_water_and_floods_desert() {
        let mut map = HexMap::ocean(14, 14);
        let mut land = Vec::new();
        for z in 1..13 {
            for x in 1..13 {
                let cell = map.cell_at_offset(x, z).unwrap();
                let shape = if (x + z) % 3 == 0 { Shape::Flatlands } else { Shape::Hills };
                map.set_cell(cell, CellSnapshot::new(Terrain::Desert, shape));
                land.push(cell);
            }
        }
        let config = RiverConfig {
            rivered_cell_fraction: 0.2,
            ..RiverConfig::default()
        };
        let mut rng = GenerationRng::new(44);

        let report = RiverGenerator::new(&config)
            .generate(&mut map, &land, &mut rng)
            .unwrap();
        assert!(!report.rivers.is_empty());
        assert!(report.rivers.iter().all(River::reached_water));
        assert!(report.attempts <= land.len() * config.attempts_per_land_cell);
        let flooded = land
            .iter()
            .filter(|c| map.cell(**c).terrain == Terrain::FloodPlains)
            .count();
        assert!(flooded > 0);
        for cell in &land {
            let snapshot = map.cell(*cell);
            if snapshot.terrain == Terrain::FloodPlains {
                assert_eq!(snapshot.shape, Shape::Flatlands);
            }
        }
    }

    #[test]
    fn no_sources_on_flat_land() {
        let mut map = HexMap::ocean(8, 8);
        let mut land = Vec::new();
        for z in 1..7 {
            for x in 1..7 {
                let cell = map.cell_at_offset(x, z).unwrap();
                map.set_cell(cell, CellSnapshot::new(Terrain::Grassland, Shape::Flatlands));
                land.push(cell);
            }
        }
        let mut rng = GenerationRng::new(5);
        let report = RiverGenerator::new(&RiverConfig::default())
            .generate(&mut map, &land, &mut rng)
            .unwrap();
        assert!(report.rivers.is_empty());
        assert_eq!(report.attempts, 0);
        assert!(land.iter().all(|c| !map.has_river(*c)));
    }
}
