use super::{CellChange, Goal, Proposal, ProposalStrategy};
use crate::{
    balance::{BalanceContext, StrategyId},
    cell::{Feature, Shape},
    region::{Region, RegionData},
};

/// Lifts flat desert, tundra or snow into hills for extra production.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaiseHills;

impl ProposalStrategy for RaiseHills {
    fn id(&self) -> StrategyId {
        StrategyId::RaiseHills
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
                snapshot.is_land()
                    && snapshot.terrain.is_extreme()
                    && snapshot.shape == Shape::Flatlands
                    && snapshot.feature == Feature::None
                    && ctx.grid.can_change_shape(*cell, Shape::Hills)
            })
            .map(|cell| Proposal::new(ctx, cell, CellChange::Shape(Shape::Hills)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        balance::{strategies::fixture::*, BalanceStrategy, StrategyOutcome},
        cell::{CellSnapshot, Terrain},
        grid::{CellId, CellMutation, HexMap},
        yields::YieldType,
    };

    #[test]
    fn only_extreme_flatlands_are_raised() {
        let mut map = HexMap::new(3, 3, CellSnapshot::new(Terrain::Grassland, Shape::Flatlands));
        map.set_cell(CellId(4), CellSnapshot::new(Terrain::Tundra, Shape::Flatlands));
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let templates = Templates::default();
        let data = templates.data();

        let first =
            harness.run(|ctx| RaiseHills.try_increase_yield(ctx, &region, &data, YieldType::Production));
        assert!(first.is_applied());
        assert_eq!(harness.map.cell(CellId(4)).shape, Shape::Hills);

        let second =
            harness.run(|ctx| RaiseHills.try_increase_yield(ctx, &region, &data, YieldType::Production));
        assert_eq!(second, StrategyOutcome::NoChange);
    }

    #[test]
    fn raising_hills_never_lowers_score() {
        let map = HexMap::new(4, 4, CellSnapshot::new(Terrain::Snow, Shape::Flatlands));
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let templates = Templates::default();
        let data = templates.data();
        let outcome = harness.run(|ctx| RaiseHills.try_decrease_score(ctx, &region, &data));
        assert_eq!(outcome, StrategyOutcome::NoChange);
        let outcome = harness.run(|ctx| RaiseHills.try_increase_score(ctx, &region, &data));
        assert!(outcome.applied().is_some_and(|delta| delta > 0.0));
    }
}
