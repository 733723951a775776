use super::{count_neighbors, CellChange, Goal, Proposal, ProposalStrategy};
use crate::{
    balance::{BalanceContext, StrategyId},
    cell::{Feature, Shape, Terrain, Vegetation},
    grid::{CellId, HexTopology},
    region::{Region, RegionData},
};

/// Turns a bare land cell into a fresh-water lake.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lake;

impl Lake {
    fn is_candidate(ctx: &BalanceContext<'_>, cell: CellId) -> bool {
        let snapshot = ctx.snapshot(cell);
        if !snapshot.is_land()
            || snapshot.resource.is_some()
            || snapshot.has_river()
            || snapshot.vegetation != Vegetation::None
            || snapshot.feature != Feature::None
            || snapshot.shape == Shape::Mountains
        {
            return false;
        }
        if count_neighbors(ctx, cell, |n| n.terrain == Terrain::Desert) > 0 {
            return false;
        }
        let nearby_lakes = ctx
            .grid
            .cells_in_radius(cell, ctx.config.lake_radius)
            .into_iter()
            .filter(|c| *c != cell && ctx.snapshot(*c).terrain == Terrain::FreshWater)
            .count();
        if nearby_lakes >= ctx.config.max_nearby_lakes as usize {
            return false;
        }
        ctx.grid.can_change_terrain(cell, Terrain::FreshWater)
    }
}

impl ProposalStrategy for Lake {
    fn id(&self) -> StrategyId {
        StrategyId::Lake
    }

    fn proposals(
        &self,
        ctx: &BalanceContext<'_>,
        region: &Region,
        _data: &RegionData<'_>,
        _goal: Goal,
    ) -> Vec<Proposal> {
        region
            .land()
            .iter()
            .copied()
            .filter(|cell| Self::is_candidate(ctx, *cell))
            .map(|cell| Proposal::new(ctx, cell, CellChange::Terrain(Terrain::FreshWater)))
            .collect()
    }
}

/// Submerges a coastal land cell into shallow water. Only ever used to
/// bring a region's score down.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandOcean;

impl ProposalStrategy for ExpandOcean {
    fn id(&self) -> StrategyId {
        StrategyId::ExpandOcean
    }

    fn proposals(
        &self,
        ctx: &BalanceContext<'_>,
        region: &Region,
        _data: &RegionData<'_>,
        goal: Goal,
    ) -> Vec<Proposal> {
        if goal != Goal::DecreaseScore {
            return Vec::new();
        }
        let remaining_land = region
            .land()
            .iter()
            .filter(|c| ctx.snapshot(**c).is_land())
            .count();
        if remaining_land <= 1 {
            return Vec::new();
        }
        region
            .land()
            .iter()
            .copied()
            .filter(|cell| {
                let snapshot = ctx.snapshot(*cell);
                snapshot.is_land()
                    && count_neighbors(ctx, *cell, |n| {
                        matches!(n.terrain, Terrain::ShallowWater | Terrain::DeepWater)
                    }) > 0
                    && ctx.grid.can_change_terrain(*cell, Terrain::ShallowWater)
            })
            .map(|cell| Proposal::new(ctx, cell, CellChange::Terrain(Terrain::ShallowWater)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        balance::{strategies::fixture::*, BalanceStrategy, StrategyOutcome},
        cell::CellSnapshot,
        grid::{CellMutation, HexMap},
        yields::YieldType,
    };

    #[test]
    fn lake_turns_plains_into_food() {
        let map = HexMap::new(5, 5, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let templates = Templates::default();
        let data = templates.data();

        let delta = harness
            .run(|ctx| Lake.try_increase_yield(ctx, &region, &data, YieldType::Food))
            .applied()
            .expect("plains can hold a lake");
        assert_eq!(delta[YieldType::Food], 1.0);
        assert_eq!(delta[YieldType::Production], -1.0);
        let lakes = harness
            .map
            .snapshots()
            .iter()
            .filter(|c| c.terrain == Terrain::FreshWater)
            .count();
        assert_eq!(lakes, 1);
    }

    #[test]
    fn lakes_avoid_desert_and_each_other() {
        let mut map = HexMap::new(3, 1, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
        map.set_cell(CellId(0), CellSnapshot::new(Terrain::FreshWater, Shape::Flatlands));
        map.set_cell(CellId(2), CellSnapshot::new(Terrain::Desert, Shape::Flatlands));
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let templates = Templates::default();
        let data = templates.data();

        // Cell 1 neighbors both an existing lake and desert; cell 2 is desert
        // itself next to a lake within range.
        let outcome = harness.run(|ctx| Lake.try_increase_score(ctx, &region, &data));
        assert_eq!(outcome, StrategyOutcome::NoChange);
        let outcome =
            harness.run(|ctx| Lake.try_increase_yield(ctx, &region, &data, YieldType::Food));
        assert_eq!(outcome, StrategyOutcome::NoChange);
    }

    #[test]
    fn expand_ocean_only_decreases_score() {
        let mut map = HexMap::new(4, 4, CellSnapshot::new(Terrain::Grassland, Shape::Hills));
        map.set_cell(CellId(0), CellSnapshot::ocean());
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let templates = Templates::default();
        let data = templates.data();

        let up = harness.run(|ctx| ExpandOcean.try_increase_score(ctx, &region, &data));
        assert_eq!(up, StrategyOutcome::NoChange);
        let down = harness
            .run(|ctx| ExpandOcean.try_decrease_score(ctx, &region, &data))
            .applied()
            .expect("coastal hills can be submerged");
        assert!(down < 0.0);
        let submerged = harness
            .map
            .snapshots()
            .iter()
            .filter(|c| c.terrain == Terrain::ShallowWater)
            .count();
        assert_eq!(submerged, 1);
    }
}
