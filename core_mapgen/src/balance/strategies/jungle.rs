use super::{count_neighbors, CellChange, Goal, Proposal, ProposalStrategy};
use crate::{
    balance::{BalanceContext, StrategyId},
    cell::Vegetation,
    region::{Region, RegionData},
};

/// Neighbors that must already agree before jungle grows or recedes.
const MATCHING_NEIGHBORS: usize = 3;

/// Grows jungle into cells surrounded by jungle and clears jungle cells
/// that are mostly surrounded by open land.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jungle;

impl ProposalStrategy for Jungle {
    fn id(&self) -> StrategyId {
        StrategyId::Jungle
    }

    fn proposals(
        &self,
        ctx: &BalanceContext<'_>,
        region: &Region,
        _data: &RegionData<'_>,
        _goal: Goal,
    ) -> Vec<Proposal> {
        let mut proposals = Vec::new();
        for &cell in region.land() {
            let snapshot = ctx.snapshot(cell);
            if !snapshot.is_land() {
                continue;
            }
            let jungle_neighbors =
                count_neighbors(ctx, cell, |n| n.vegetation == Vegetation::Jungle);
            let other_neighbors = ctx.grid.neighbors(cell).len() - jungle_neighbors;

            match snapshot.vegetation {
                Vegetation::None
                    if jungle_neighbors >= MATCHING_NEIGHBORS
                        && ctx.grid.can_change_vegetation(cell, Vegetation::Jungle) =>
                {
                    proposals.push(Proposal::new(
                        ctx,
                        cell,
                        CellChange::Vegetation(Vegetation::Jungle),
                    ));
                }
                Vegetation::Jungle
                    if other_neighbors >= MATCHING_NEIGHBORS
                        && ctx.grid.can_change_vegetation(cell, Vegetation::None) =>
                {
                    proposals.push(Proposal::new(
                        ctx,
                        cell,
                        CellChange::Vegetation(Vegetation::None),
                    ));
                }
                _ => {}
            }
        }
        proposals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        balance::{strategies::fixture::*, BalanceStrategy, StrategyOutcome},
        cell::{CellSnapshot, Shape, Terrain},
        grid::{CellMutation, HexMap, HexTopology},
        yields::YieldType,
    };

    #[test]
    fn jungle_grows_only_into_surrounded_cells() {
        let mut map = HexMap::new(5, 5, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
        let center = map.cell_at_offset(2, 2).unwrap();
        let jungle = CellSnapshot::new(Terrain::Plains, Shape::Flatlands)
            .with_vegetation(Vegetation::Jungle);
        for neighbor in map.neighbors(center).into_iter().take(3) {
            map.set_cell(neighbor, jungle);
        }
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let templates = Templates::default();
        let data = templates.data();

        let outcome =
            harness.run(|ctx| Jungle.try_increase_yield(ctx, &region, &data, YieldType::Food));
        assert!(outcome.is_applied());
        assert_eq!(harness.map.cell(center).vegetation, Vegetation::Jungle);
    }

    #[test]
    fn isolated_jungle_is_cleared_for_production() {
        let mut map = HexMap::new(5, 5, CellSnapshot::new(Terrain::Grassland, Shape::Flatlands));
        let center = map.cell_at_offset(2, 2).unwrap();
        map.set_cell(
            center,
            CellSnapshot::new(Terrain::Grassland, Shape::Flatlands)
                .with_vegetation(Vegetation::Jungle),
        );
        let mut harness = Harness::new(map);
        let region = harness.whole_region();
        let templates = Templates::default();
        let data = templates.data();

        let outcome = harness
            .run(|ctx| Jungle.try_increase_yield(ctx, &region, &data, YieldType::Production));
        let delta = outcome.applied().expect("jungle should be cleared");
        assert_eq!(delta[YieldType::Production], 1.0);
        assert_eq!(harness.map.cell(center).vegetation, Vegetation::None);

        let again = harness
            .run(|ctx| Jungle.try_increase_yield(ctx, &region, &data, YieldType::Production));
        assert_eq!(again, StrategyOutcome::NoChange);
    }
}
