//! Built-in balance strategies.
//!
//! Every strategy here lists [`Proposal`]s: feasible cell changes with a
//! preview of the cell after the change. The shared driver keeps the
//! proposals whose previewed delta moves in the wanted direction, commits one
//! chosen by weight, and reports the delta between the real before and after
//! snapshots.

mod hills;
mod jungle;
mod oasis;
mod resource;
mod water;

pub use hills::RaiseHills;
pub use jungle::Jungle;
pub use oasis::Oasis;
pub use resource::ResourcePlacement;
pub use water::{ExpandOcean, Lake};

use tracing::debug;

use super::{BalanceContext, BalanceStrategy, StrategyId, StrategyOutcome};
use crate::{
    cell::{CellSnapshot, Feature, ResourceNode, Shape, Terrain, Vegetation},
    error::MapGenError,
    grid::CellId,
    region::{Region, RegionData},
    resources::ResourceId,
    sampling,
    yields::{YieldSummary, YieldType},
};

/// What a strategy is currently trying to achieve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Goal {
    IncreaseYield(YieldType),
    IncreaseScore,
    DecreaseScore,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellChange {
    Terrain(Terrain),
    Shape(Shape),
    Vegetation(Vegetation),
    Feature(Feature),
    PlaceResource { resource: ResourceId, copies: u32 },
    RemoveResource,
}

impl CellChange {
    /// The cell as the grid would store it after this change.
    pub fn preview(&self, before: CellSnapshot) -> CellSnapshot {
        match *self {
            CellChange::Terrain(terrain) if terrain.is_water() => {
                before.with_terrain(terrain).with_shape(Shape::Flatlands)
            }
            CellChange::Terrain(terrain) => before.with_terrain(terrain),
            CellChange::Shape(shape) => before.with_shape(shape),
            CellChange::Vegetation(vegetation) => before.with_vegetation(vegetation),
            CellChange::Feature(feature) => before.with_feature(feature),
            CellChange::PlaceResource { resource, copies } => {
                before.with_resource(Some(ResourceNode { resource, copies }))
            }
            CellChange::RemoveResource => before.with_resource(None),
        }
    }

    fn apply(&self, ctx: &mut BalanceContext<'_>, cell: CellId) -> Result<(), MapGenError> {
        match *self {
            CellChange::Terrain(terrain) => ctx.grid.change_terrain(cell, terrain),
            CellChange::Shape(shape) => ctx.grid.change_shape(cell, shape),
            CellChange::Vegetation(vegetation) => ctx.grid.change_vegetation(cell, vegetation),
            CellChange::Feature(feature) => ctx.grid.change_feature(cell, feature),
            CellChange::PlaceResource { resource, copies } => {
                let catalog = ctx.catalog;
                let restrictions = ctx.restrictions;
                let definition = catalog.get(resource).ok_or(MapGenError::MutationRejected {
                    cell,
                    change: "unknown resource",
                })?;
                restrictions.build_node(&mut *ctx.grid, cell, definition, copies)
            }
            CellChange::RemoveResource => {
                ctx.grid.set_resource_node(cell, None);
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    pub cell: CellId,
    pub change: CellChange,
    pub after: CellSnapshot,
    pub weight: f64,
}

impl Proposal {
    pub fn new(ctx: &BalanceContext<'_>, cell: CellId, change: CellChange) -> Self {
        Self {
            cell,
            change,
            after: change.preview(ctx.snapshot(cell)),
            weight: 1.0,
        }
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// A strategy expressed as a list of candidate cell changes.
pub trait ProposalStrategy {
    fn id(&self) -> StrategyId;

    fn proposals(
        &self,
        ctx: &BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
        goal: Goal,
    ) -> Vec<Proposal>;
}

impl<S: ProposalStrategy> BalanceStrategy for S {
    fn id(&self) -> StrategyId {
        ProposalStrategy::id(self)
    }

    fn try_increase_yield(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
        yield_type: YieldType,
    ) -> StrategyOutcome<YieldSummary> {
        let eligible: Vec<Proposal> = self
            .proposals(ctx, region, data, Goal::IncreaseYield(yield_type))
            .into_iter()
            .filter(|p| keeps_resource_valid(ctx, p) && ctx.yield_delta(p.cell, &p.after)[yield_type] > 0.0)
            .collect();
        match commit(ctx, ProposalStrategy::id(self), eligible) {
            Some((before, after)) => {
                StrategyOutcome::Applied(ctx.yield_of_snapshot(&after) - ctx.yield_of_snapshot(&before))
            }
            None => StrategyOutcome::NoChange,
        }
    }

    fn try_increase_score(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
    ) -> StrategyOutcome<f32> {
        let eligible: Vec<Proposal> = self
            .proposals(ctx, region, data, Goal::IncreaseScore)
            .into_iter()
            .filter(|p| keeps_resource_valid(ctx, p) && ctx.score_delta(p.cell, &p.after) > 0.0)
            .collect();
        let committed = commit(ctx, ProposalStrategy::id(self), eligible);
        score_outcome(ctx, committed)
    }

    fn try_decrease_score(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
    ) -> StrategyOutcome<f32> {
        let eligible: Vec<Proposal> = self
            .proposals(ctx, region, data, Goal::DecreaseScore)
            .into_iter()
            .filter(|p| keeps_resource_valid(ctx, p) && ctx.score_delta(p.cell, &p.after) < 0.0)
            .collect();
        let committed = commit(ctx, ProposalStrategy::id(self), eligible);
        score_outcome(ctx, committed)
    }
}

/// A change may not strand an existing resource node on a cell its
/// definition no longer accepts.
fn keeps_resource_valid(ctx: &BalanceContext<'_>, proposal: &Proposal) -> bool {
    if matches!(
        proposal.change,
        CellChange::PlaceResource { .. } | CellChange::RemoveResource
    ) {
        return true;
    }
    let after = &proposal.after;
    let Some(node) = after.resource else {
        return true;
    };
    ctx.catalog.get(node.resource).is_some_and(|definition| {
        after.feature == Feature::None
            && definition.valid_terrains.contains(&after.terrain)
            && definition.valid_shapes.contains(&after.shape)
            && definition.valid_vegetation.contains(&after.vegetation)
    })
}

fn score_outcome(
    ctx: &BalanceContext<'_>,
    committed: Option<(CellSnapshot, CellSnapshot)>,
) -> StrategyOutcome<f32> {
    match committed {
        Some((before, after)) => {
            StrategyOutcome::Applied(ctx.score_of_snapshot(&after) - ctx.score_of_snapshot(&before))
        }
        None => StrategyOutcome::NoChange,
    }
}

/// Apply one weighted pick from `proposals`; a proposal the grid rejects is
/// dropped and another is drawn. Returns the real before/after snapshots.
fn commit(
    ctx: &mut BalanceContext<'_>,
    strategy: StrategyId,
    mut proposals: Vec<Proposal>,
) -> Option<(CellSnapshot, CellSnapshot)> {
    while let Some(pick) = sampling::sample_one(ctx.rng, &proposals, |p| p.weight) {
        let before = ctx.snapshot(pick.cell);
        match pick.change.apply(ctx, pick.cell) {
            Ok(()) => {
                let after = ctx.snapshot(pick.cell);
                debug!(
                    target: "core_mapgen::balance",
                    strategy = %strategy,
                    cell = pick.cell.0,
                    change = ?pick.change,
                    "balance.strategy_applied"
                );
                return Some((before, after));
            }
            Err(err) => {
                debug!(
                    target: "core_mapgen::balance",
                    strategy = %strategy,
                    error = %err,
                    "balance.proposal_rejected"
                );
                proposals.retain(|p| p != &pick);
            }
        }
    }
    None
}

/// Number of neighbors of `cell` for which `predicate` holds.
pub(crate) fn count_neighbors(
    ctx: &BalanceContext<'_>,
    cell: CellId,
    mut predicate: impl FnMut(&CellSnapshot) -> bool,
) -> usize {
    ctx.grid
        .neighbors(cell)
        .into_iter()
        .filter(|n| predicate(&ctx.snapshot(*n)))
        .count()
}
