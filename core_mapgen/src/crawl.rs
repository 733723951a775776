//! Weighted outward growth from a seed cell.
//!
//! A [`Crawl`] is a lazy iterator: callers pull cells one at a time and stop
//! whenever their own budget is met. Frontier priorities come from a
//! [`CrawlWeight`]; lower priorities are yielded first.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
};

use crate::{
    cell::{Shape, Terrain, Vegetation},
    grid::{CellId, HexTopology, MapGrid},
};

/// Priority of offering `neighbor` to a crawl's frontier.
///
/// A negative result excludes the neighbor from the rest of the crawl.
pub trait CrawlWeight {
    fn weight(&self, neighbor: CellId, seed: CellId, accepted: &[CellId]) -> i32;
}

#[derive(Clone, Copy)]
struct FrontierEntry {
    priority: i32,
    order: u64,
    cell: CellId,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.order == other.order
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the lowest priority pops first
        // and earlier offers win ties.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.order.cmp(&self.order))
    }
}

pub struct Crawl<'a, T: HexTopology + ?Sized, W: CrawlWeight> {
    topology: &'a T,
    available: &'a HashSet<CellId>,
    weight: W,
    seed: CellId,
    frontier: BinaryHeap<FrontierEntry>,
    accepted: Vec<CellId>,
    visited: HashSet<CellId>,
    excluded: HashSet<CellId>,
    offers: u64,
}

impl<'a, T: HexTopology + ?Sized, W: CrawlWeight> Crawl<'a, T, W> {
    pub fn new(
        topology: &'a T,
        seed: CellId,
        available: &'a HashSet<CellId>,
        weight: W,
    ) -> Self {
        let mut frontier = BinaryHeap::new();
        frontier.push(FrontierEntry {
            priority: 0,
            order: 0,
            cell: seed,
        });
        Self {
            topology,
            available,
            weight,
            seed,
            frontier,
            accepted: Vec::new(),
            visited: HashSet::new(),
            excluded: HashSet::new(),
            offers: 1,
        }
    }

    /// Cells yielded so far, in yield order.
    pub fn accepted(&self) -> &[CellId] {
        &self.accepted
    }
}

impl<T: HexTopology + ?Sized, W: CrawlWeight> Iterator for Crawl<'_, T, W> {
    type Item = CellId;

    fn next(&mut self) -> Option<CellId> {
        while let Some(entry) = self.frontier.pop() {
            let cell = entry.cell;
            if self.visited.contains(&cell)
                || self.excluded.contains(&cell)
                || !self.available.contains(&cell)
            {
                continue;
            }
            self.visited.insert(cell);
            self.accepted.push(cell);

            for neighbor in self.topology.neighbors(cell) {
                if self.visited.contains(&neighbor) || self.excluded.contains(&neighbor) {
                    continue;
                }
                if !self.available.contains(&neighbor) {
                    continue;
                }
                let priority = self.weight.weight(neighbor, self.seed, &self.accepted);
                if priority < 0 {
                    self.excluded.insert(neighbor);
                    continue;
                }
                self.frontier.push(FrontierEntry {
                    priority,
                    order: self.offers,
                    cell: neighbor,
                });
                self.offers += 1;
            }
            return Some(cell);
        }
        None
    }
}

/// Hex distance from the seed, stretched along one offset axis.
///
/// Used to split a homeland into regions that are long along `x` or `z`.
pub struct AxisBiasedDistance<'a, T: HexTopology + ?Sized> {
    pub topology: &'a T,
    /// Multiplier applied to the `x` component of the offset distance.
    pub x_bias: f32,
    /// Multiplier applied to the `z` component of the offset distance.
    pub z_bias: f32,
}

impl<T: HexTopology + ?Sized> CrawlWeight for AxisBiasedDistance<'_, T> {
    fn weight(&self, neighbor: CellId, seed: CellId, _accepted: &[CellId]) -> i32 {
        let a = self.topology.offset_of(neighbor);
        let b = self.topology.offset_of(seed);
        let dx = (a.x - b.x).abs() as f32 * self.x_bias;
        let dz = (a.y - b.y).abs() as f32 * self.z_bias;
        let hex = self.topology.distance(neighbor, seed) as f32;
        (hex + dx + dz).round() as i32
    }
}

/// Placement cost for growing a vegetation clump.
///
/// Cells that cannot take the vegetation are excluded; hills cost more than
/// flatlands, and the preferred terrain is cheaper than the rest.
pub struct ClumpPlacementCost<'a, G: MapGrid + ?Sized> {
    pub grid: &'a G,
    pub vegetation: Vegetation,
    pub preferred: &'a [Terrain],
}

impl<G: MapGrid + ?Sized> CrawlWeight for ClumpPlacementCost<'_, G> {
    fn weight(&self, neighbor: CellId, seed: CellId, _accepted: &[CellId]) -> i32 {
        if !self.grid.can_change_vegetation(neighbor, self.vegetation) {
            return -1;
        }
        let snapshot = self.grid.cell(neighbor);
        if snapshot.vegetation != Vegetation::None || snapshot.resource.is_some() {
            return -1;
        }
        let terrain_cost = if self.preferred.contains(&snapshot.terrain) {
            0
        } else {
            2
        };
        let shape_cost = match snapshot.shape {
            Shape::Flatlands => 0,
            Shape::Hills => 1,
            Shape::Mountains => 5,
        };
        terrain_cost + shape_cost + self.grid.distance(neighbor, seed) as i32
    }
}

/// Binary in/out weight for discovering connected water bodies.
pub struct WaterMembership<'a, G: MapGrid + ?Sized> {
    pub grid: &'a G,
}

impl<G: MapGrid + ?Sized> CrawlWeight for WaterMembership<'_, G> {
    fn weight(&self, neighbor: CellId, _seed: CellId, _accepted: &[CellId]) -> i32 {
        if self.grid.is_water(neighbor) {
            0
        } else {
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::CellSnapshot,
        grid::{HexMap, HexTopology},
    };

    struct Uniform;

    impl CrawlWeight for Uniform {
        fn weight(&self, _: CellId, _: CellId, _: &[CellId]) -> i32 {
            1
        }
    }

    struct ExcludeEven;

    impl CrawlWeight for ExcludeEven {
        fn weight(&self, neighbor: CellId, _: CellId, _: &[CellId]) -> i32 {
            if neighbor.0 % 2 == 0 {
                -1
            } else {
                1
            }
        }
    }

    fn grass(width: u32, height: u32) -> HexMap {
        HexMap::new(width, height, CellSnapshot::new(Terrain::Grassland, Shape::Flatlands))
    }

    #[test]
    fn crawl_yields_unique_adjacent_subset() {
        let map = grass(9, 7);
        let available: HashSet<CellId> = map
            .all_cells()
            .into_iter()
            .filter(|c| c.0 % 5 != 0 || c.0 == 12)
            .collect();
        let seed = CellId(12);
        let yielded: Vec<CellId> = Crawl::new(&map, seed, &available, Uniform).collect();

        assert_eq!(yielded[0], seed);
        let unique: HashSet<_> = yielded.iter().copied().collect();
        assert_eq!(unique.len(), yielded.len());
        assert!(unique.is_subset(&available));
        for (i, cell) in yielded.iter().enumerate().skip(1) {
            assert!(
                yielded[..i].iter().any(|prev| map.distance(*prev, *cell) == 1),
                "cell {cell:?} was not adjacent to anything yielded before it"
            );
        }
    }

    #[test]
    fn negative_weight_excludes_permanently() {
        let map = grass(6, 6);
        let available: HashSet<CellId> = map.all_cells().into_iter().collect();
        let seed = CellId(7);
        let yielded: Vec<CellId> = Crawl::new(&map, seed, &available, ExcludeEven).collect();
        assert!(yielded.iter().skip(1).all(|c| c.0 % 2 == 1));
    }

    #[test]
    fn crawl_is_lazy_and_ordered_by_distance() {
        let map = grass(11, 11);
        let available: HashSet<CellId> = map.all_cells().into_iter().collect();
        let seed = map.cell_at_offset(5, 5).unwrap();
        let weight = AxisBiasedDistance {
            topology: &map,
            x_bias: 0.0,
            z_bias: 0.0,
        };
        let first: Vec<CellId> = Crawl::new(&map, seed, &available, weight).take(7).collect();
        assert_eq!(first.len(), 7);
        assert!(first.iter().all(|c| map.distance(*c, seed) <= 1));
    }

    #[test]
    fn water_membership_stays_inside_water_body() {
        let mut map = grass(8, 8);
        let lake = [CellId(18), CellId(19), CellId(20)];
        for cell in lake {
            map.set_cell(cell, CellSnapshot::new(Terrain::FreshWater, Shape::Flatlands));
        }
        let available: HashSet<CellId> = map.all_cells().into_iter().collect();
        let body: HashSet<CellId> =
            Crawl::new(&map, lake[0], &available, WaterMembership { grid: &map }).collect();
        assert_eq!(body, HashSet::from(lake));
    }
}
