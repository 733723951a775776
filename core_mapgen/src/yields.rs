//! Yield vectors, per-cell yield estimation and the scalar score projection.

use std::{
    collections::HashMap,
    fmt,
    ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign},
};

use serde::Deserialize;

use crate::{
    cell::{CellSnapshot, Feature, Shape, Terrain, Vegetation},
    grid::{CellId, MapGrid},
    resources::{ResourceCatalog, ResourceId, ResourceKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldType {
    Food,
    Production,
    Gold,
    Science,
    Culture,
    Faith,
}

impl YieldType {
    pub const COUNT: usize = 6;
    pub const ALL: [YieldType; YieldType::COUNT] = [
        YieldType::Food,
        YieldType::Production,
        YieldType::Gold,
        YieldType::Science,
        YieldType::Culture,
        YieldType::Faith,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Yield amounts keyed by [`YieldType`].
#[derive(Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "NamedYields")]
pub struct YieldSummary([f32; YieldType::COUNT]);

impl YieldSummary {
    pub const ZERO: YieldSummary = YieldSummary([0.0; YieldType::COUNT]);

    pub fn single(yield_type: YieldType, amount: f32) -> Self {
        let mut summary = Self::ZERO;
        summary[yield_type] = amount;
        summary
    }

    pub fn get(&self, yield_type: YieldType) -> f32 {
        self.0[yield_type.index()]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| v.abs() < f32::EPSILON)
    }

    /// Weighted sum of every component.
    pub fn dot(&self, weights: &YieldSummary) -> f32 {
        self.0.iter().zip(weights.0.iter()).map(|(a, b)| a * b).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (YieldType, f32)> + '_ {
        YieldType::ALL.iter().map(move |&t| (t, self.get(t)))
    }
}

impl fmt::Debug for YieldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (yield_type, amount) in self.iter() {
            if amount.abs() >= f32::EPSILON {
                map.entry(&yield_type, &amount);
            }
        }
        map.finish()
    }
}

impl Index<YieldType> for YieldSummary {
    type Output = f32;

    fn index(&self, index: YieldType) -> &Self::Output {
        &self.0[index.index()]
    }
}

impl IndexMut<YieldType> for YieldSummary {
    fn index_mut(&mut self, index: YieldType) -> &mut Self::Output {
        &mut self.0[index.index()]
    }
}

impl Add for YieldSummary {
    type Output = YieldSummary;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for YieldSummary {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl Sub for YieldSummary {
    type Output = YieldSummary;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl SubAssign for YieldSummary {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a -= b;
        }
    }
}

impl Mul<f32> for YieldSummary {
    type Output = YieldSummary;

    fn mul(mut self, rhs: f32) -> Self::Output {
        for v in &mut self.0 {
            *v *= rhs;
        }
        self
    }
}

impl Neg for YieldSummary {
    type Output = YieldSummary;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl std::iter::Sum for YieldSummary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(YieldSummary::ZERO, |acc, y| acc + y)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct NamedYields {
    food: f32,
    production: f32,
    gold: f32,
    science: f32,
    culture: f32,
    faith: f32,
}

impl From<NamedYields> for YieldSummary {
    fn from(named: NamedYields) -> Self {
        YieldSummary([
            named.food,
            named.production,
            named.gold,
            named.science,
            named.culture,
            named.faith,
        ])
    }
}

/// Produces per-cell yield estimates; strategies diff two estimates to get
/// the delta of a change before committing it.
pub trait YieldEstimator {
    fn yield_of_snapshot(&self, snapshot: &CellSnapshot) -> YieldSummary;

    fn yield_of_resource(&self, resource: ResourceId) -> YieldSummary;

    fn yield_of_cell(&self, grid: &dyn MapGrid, cell: CellId) -> YieldSummary {
        self.yield_of_snapshot(&grid.cell(cell))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct YieldsConfig {
    pub terrain: HashMap<Terrain, YieldSummary>,
    pub shape: HashMap<Shape, YieldSummary>,
    pub vegetation: HashMap<Vegetation, YieldSummary>,
    pub oasis: YieldSummary,
    pub river: YieldSummary,
}

impl Default for YieldsConfig {
    fn default() -> Self {
        let y = |food: f32, production: f32, gold: f32| {
            YieldSummary::from(NamedYields {
                food,
                production,
                gold,
                ..NamedYields::default()
            })
        };
        let terrain = HashMap::from([
            (Terrain::Grassland, y(2.0, 0.0, 0.0)),
            (Terrain::Plains, y(1.0, 1.0, 0.0)),
            (Terrain::Desert, y(0.0, 0.0, 0.0)),
            (Terrain::Tundra, y(1.0, 0.0, 0.0)),
            (Terrain::Snow, y(0.0, 0.0, 0.0)),
            (Terrain::FloodPlains, y(2.0, 0.0, 0.0)),
            (Terrain::ShallowWater, y(1.0, 0.0, 1.0)),
            (Terrain::DeepWater, y(1.0, 0.0, 0.0)),
            (Terrain::FreshWater, y(2.0, 0.0, 1.0)),
        ]);
        let shape = HashMap::from([
            (Shape::Flatlands, YieldSummary::ZERO),
            (Shape::Hills, y(0.0, 2.0, 0.0)),
            (Shape::Mountains, y(0.0, 1.0, 0.0)),
        ]);
        let vegetation = HashMap::from([
            (Vegetation::None, YieldSummary::ZERO),
            (Vegetation::Forest, y(0.0, 1.0, 0.0)),
            (Vegetation::Jungle, y(1.0, -1.0, 0.0)),
            (Vegetation::Marsh, y(-1.0, 0.0, 0.0)),
        ]);
        Self {
            terrain,
            shape,
            vegetation,
            oasis: y(3.0, 0.0, 1.0),
            river: y(0.0, 0.0, 1.0),
        }
    }
}

/// Table-driven [`YieldEstimator`].
#[derive(Debug, Clone)]
pub struct TerrainYieldTable {
    terrain: [YieldSummary; 9],
    shape: [YieldSummary; 3],
    vegetation: [YieldSummary; 4],
    oasis: YieldSummary,
    river: YieldSummary,
    resources: Vec<YieldSummary>,
}

impl TerrainYieldTable {
    pub fn new(config: &YieldsConfig, catalog: &ResourceCatalog) -> Self {
        let lookup = |summary: Option<&YieldSummary>| summary.copied().unwrap_or_default();
        Self {
            terrain: Terrain::ALL.map(|t| lookup(config.terrain.get(&t))),
            shape: Shape::ALL.map(|s| lookup(config.shape.get(&s))),
            vegetation: Vegetation::ALL.map(|v| lookup(config.vegetation.get(&v))),
            oasis: config.oasis,
            river: config.river,
            resources: catalog.iter().map(|def| def.yields).collect(),
        }
    }
}

impl YieldEstimator for TerrainYieldTable {
    fn yield_of_snapshot(&self, snapshot: &CellSnapshot) -> YieldSummary {
        let mut total = self.terrain[snapshot.terrain as usize];
        if snapshot.is_land() {
            total += self.shape[snapshot.shape as usize];
            total += self.vegetation[snapshot.vegetation as usize];
            if snapshot.feature == Feature::Oasis {
                total += self.oasis;
            }
            if snapshot.has_river() {
                total += self.river;
            }
        }
        if let Some(node) = snapshot.resource {
            total += self.yield_of_resource(node.resource);
        }
        // Mountains are impassable; nothing grows there.
        if snapshot.shape == Shape::Mountains && snapshot.is_land() {
            total[YieldType::Food] = 0.0;
        }
        total
    }

    fn yield_of_resource(&self, resource: ResourceId) -> YieldSummary {
        self.resources
            .get(resource.index())
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub yield_weights: YieldSummary,
    pub resource_scores: HashMap<ResourceKind, f32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            yield_weights: YieldSummary([1.0, 1.0, 0.75, 0.75, 0.75, 0.5]),
            resource_scores: HashMap::from([
                (ResourceKind::Bonus, 0.0),
                (ResourceKind::Strategic, 2.0),
                (ResourceKind::Luxury, 3.0),
            ]),
        }
    }
}

/// Scalar projection of yields used as the balancing objective.
#[derive(Debug, Clone)]
pub struct YieldScorer {
    weights: YieldSummary,
    resource_scores: [f32; 3],
}

impl YieldScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            weights: config.yield_weights,
            resource_scores: ResourceKind::ALL
                .map(|kind| config.resource_scores.get(&kind).copied().unwrap_or(0.0)),
        }
    }

    pub fn score_of_yield(&self, yields: &YieldSummary) -> f32 {
        yields.dot(&self.weights)
    }

    /// Score of a hypothetical cell state.
    pub fn score_of_snapshot(
        &self,
        snapshot: &CellSnapshot,
        estimator: &dyn YieldEstimator,
        catalog: &ResourceCatalog,
    ) -> f32 {
        let base = self.score_of_yield(&estimator.yield_of_snapshot(snapshot));
        let bonus = snapshot
            .resource
            .and_then(|node| catalog.get(node.resource))
            .map(|def| self.resource_scores[def.kind as usize])
            .unwrap_or(0.0);
        base + bonus
    }

    pub fn score_of_cell(
        &self,
        grid: &dyn MapGrid,
        estimator: &dyn YieldEstimator,
        catalog: &ResourceCatalog,
        cell: CellId,
    ) -> f32 {
        self.score_of_snapshot(&grid.cell(cell), estimator, catalog)
    }
}
