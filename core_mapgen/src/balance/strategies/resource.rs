use super::{commit, CellChange, Goal, Proposal, ProposalStrategy};
use crate::{
    balance::{BalanceContext, StrategyId, StrategyOutcome},
    region::{Region, RegionData},
    resources::ResourceKind,
    yields::YieldSummary,
};

/// Places (or, to lower a score, removes) resource nodes of one kind.
///
/// Each (resource, cell) pair is weighted by the region's resource weight
/// times the cell's placement weight.
#[derive(Debug, Clone, Copy)]
pub struct ResourcePlacement {
    kind: ResourceKind,
}

impl ResourcePlacement {
    pub fn bonus() -> Self {
        Self {
            kind: ResourceKind::Bonus,
        }
    }

    pub fn strategic() -> Self {
        Self {
            kind: ResourceKind::Strategic,
        }
    }

    pub fn luxury() -> Self {
        Self {
            kind: ResourceKind::Luxury,
        }
    }

    pub fn for_kind(kind: ResourceKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Place one node regardless of its yield effect; used for the initial
    /// distribution.
    pub fn place_one(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
    ) -> StrategyOutcome<YieldSummary> {
        let proposals = self.placements(ctx, region, data);
        match commit(ctx, ProposalStrategy::id(self), proposals) {
            Some((before, after)) => StrategyOutcome::Applied(
                ctx.yield_of_snapshot(&after) - ctx.yield_of_snapshot(&before),
            ),
            None => StrategyOutcome::NoChange,
        }
    }

    fn placements(
        &self,
        ctx: &BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
    ) -> Vec<Proposal> {
        let catalog = ctx.catalog;
        let mut proposals = Vec::new();
        for definition in catalog.of_kind(self.kind) {
            let resource_weight = data.resource_weight(definition.id);
            if resource_weight <= 0.0 {
                continue;
            }
            for cell in region.cells() {
                let cell_weight = ctx
                    .restrictions
                    .placement_weight(&*ctx.grid, definition, cell);
                if cell_weight <= 0.0 {
                    continue;
                }
                let change = CellChange::PlaceResource {
                    resource: definition.id,
                    copies: definition.copies,
                };
                proposals.push(
                    Proposal::new(ctx, cell, change)
                        .weighted(f64::from(resource_weight * cell_weight)),
                );
            }
        }
        proposals
    }

    fn removals(&self, ctx: &BalanceContext<'_>, region: &Region) -> Vec<Proposal> {
        region
            .cells()
            .filter(|cell| {
                ctx.grid
                    .resource_node(*cell)
                    .and_then(|node| ctx.catalog.get(node.resource))
                    .is_some_and(|def| def.kind == self.kind)
            })
            .map(|cell| Proposal::new(ctx, cell, CellChange::RemoveResource))
            .collect()
    }
}

impl ProposalStrategy for ResourcePlacement {
    fn id(&self) -> StrategyId {
        match self.kind {
            ResourceKind::Bonus => StrategyId::BonusResource,
            ResourceKind::Strategic => StrategyId::StrategicResource,
            ResourceKind::Luxury => StrategyId::LuxuryResource,
        }
    }

    fn proposals(
        &self,
        ctx: &BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
        goal: Goal,
    ) -> Vec<Proposal> {
        match goal {
            Goal::IncreaseYield(_) | Goal::IncreaseScore => self.placements(ctx, region, data),
            Goal::DecreaseScore => self.removals(ctx, region),
        }
    }
}
