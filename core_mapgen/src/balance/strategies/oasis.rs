use super::{count_neighbors, CellChange, Goal, Proposal, ProposalStrategy};
use crate::{
    balance::{BalanceContext, StrategyId},
    cell::{Feature, Shape, Terrain},
    region::{Region, RegionData},
};

/// Places an oasis on flat desert away from other oases.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oasis;

impl ProposalStrategy for Oasis {
    fn id(&self) -> StrategyId {
        StrategyId::Oasis
    }

    fn proposals(
        &self,
        ctx: &BalanceContext<'_>,
        region: &Region,
        _data: &RegionData<'_>,
        goal: Goal,
    ) -> Vec<Proposal> {
        if goal == Goal::DecreaseScore {
            return Vec::new();
        }
        region
            .land()
            .iter()
            .copied()
            .filter(|cell| {
                let snapshot = ctx.snapshot(*cell);
                snapshot.terrain == Terrain::Desert
                    && snapshot.shape == Shape::Flatlands
                    && count_neighbors(ctx, *cell, |n| n.feature == Feature::Oasis) == 0
                    && ctx.grid.can_change_feature(*cell, Feature::Oasis)
            })
            .map(|cell| Proposal::new(ctx, cell, CellChange::Feature(Feature::Oasis)))
            .collect()
    }
}
