use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{BalanceContext, BalanceStrategy, StrategyId, StrategyOutcome, StrategyRegistry};
use crate::{
    region::{HomelandData, Region, RegionData},
    rng::GenerationRng,
    sampling,
    templates::BalanceTemplate,
    yields::{YieldSummary, YieldType},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Yield-phase iterations allowed per unit of scope, where a unit is a
    /// member region or `cells_per_yield_unit` cells, whichever gives more.
    pub yield_iterations_per_unit: u32,
    pub cells_per_yield_unit: u32,
    /// Score-phase iterations allowed per region in scope.
    pub score_iterations_per_unit: u32,
    /// Fresh-water cells tolerated within `lake_radius` of a new lake.
    pub max_nearby_lakes: u32,
    pub lake_radius: u32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            yield_iterations_per_unit: 10,
            cells_per_yield_unit: 8,
            score_iterations_per_unit: 50,
            max_nearby_lakes: 1,
            lake_radius: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldShortfall {
    pub yield_type: YieldType,
    pub target: f32,
    pub achieved: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreShortfall {
    pub min: f32,
    pub max: f32,
    pub achieved: f32,
}

#[derive(Debug, Clone, Default)]
pub struct BalanceReport {
    pub cell_count: usize,
    pub yield_shortfalls: Vec<YieldShortfall>,
    pub score_shortfall: Option<ScoreShortfall>,
    /// Successful applications per strategy, indexed by [`StrategyId`].
    pub applications: [u32; StrategyId::COUNT],
    pub yield_iterations: u32,
    pub score_iterations: u32,
    pub final_yield: YieldSummary,
    pub final_score: f32,
}

impl BalanceReport {
    pub fn is_balanced(&self) -> bool {
        self.yield_shortfalls.is_empty() && self.score_shortfall.is_none()
    }

    pub fn applications_of(&self, id: StrategyId) -> u32 {
        self.applications[id.index()]
    }

    pub fn total_applications(&self) -> u32 {
        self.applications.iter().sum()
    }
}

/// Round-robin over scope members in shuffled order, reshuffled each lap.
struct RegionPool {
    order: Vec<usize>,
    cursor: usize,
}

impl RegionPool {
    fn new(len: usize) -> Self {
        Self {
            order: (0..len).collect(),
            cursor: len,
        }
    }

    fn next(&mut self, rng: &mut GenerationRng) -> usize {
        if self.cursor >= self.order.len() {
            rng.shuffle(&mut self.order);
            self.cursor = 0;
        }
        let slot = self.order[self.cursor];
        self.cursor += 1;
        slot
    }

    /// Next member not flagged in `skip`; `skip` must not be all true.
    fn next_open(&mut self, rng: &mut GenerationRng, skip: &[bool]) -> usize {
        loop {
            let slot = self.next(rng);
            if !skip[slot] {
                return slot;
            }
        }
    }
}

struct Scope<'s, 'd> {
    label: &'static str,
    members: &'s [(&'s Region, &'s RegionData<'d>)],
    weights: [u32; StrategyId::COUNT],
    targets: &'s BalanceTemplate,
    units: u32,
}

/// Brings a region or a homeland into its yield minimums and score band.
pub struct YieldBalancer<'r> {
    registry: &'r StrategyRegistry,
}

impl<'r> YieldBalancer<'r> {
    pub fn new(registry: &'r StrategyRegistry) -> Self {
        Self { registry }
    }

    pub fn balance_region(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
    ) -> BalanceReport {
        let members = [(region, data)];
        self.run(
            ctx,
            Scope {
                label: "region",
                members: &members,
                weights: *data.strategy_weights(),
                targets: data.balance,
                units: 1,
            },
        )
    }

    /// Balance a homeland as a whole. Strategies act on one member region at
    /// a time, with the homeland's own strategy weights and targets.
    pub fn balance_homeland(
        &self,
        ctx: &mut BalanceContext<'_>,
        homeland: &HomelandData<'_>,
        members: &[(&Region, &RegionData<'_>)],
    ) -> BalanceReport {
        self.run(
            ctx,
            Scope {
                label: "homeland",
                members,
                weights: *homeland.strategy_weights(),
                targets: homeland.balance(),
                units: members.len() as u32,
            },
        )
    }

    fn run(&self, ctx: &mut BalanceContext<'_>, scope: Scope<'_, '_>) -> BalanceReport {
        let mut report = BalanceReport {
            cell_count: scope.members.iter().map(|(r, _)| r.cell_count()).sum(),
            ..BalanceReport::default()
        };
        if scope.members.is_empty() {
            return report;
        }
        let cells = report.cell_count as f32;
        let mut pool = RegionPool::new(scope.members.len());

        let mut aggregate: YieldSummary = scope
            .members
            .iter()
            .map(|(region, _)| ctx.region_yield(region))
            .sum();

        let yield_units = scope
            .units
            .max(report.cell_count as u32 / ctx.config.cells_per_yield_unit.max(1));
        let yield_budget = ctx.config.yield_iterations_per_unit * yield_units;
        for yield_type in YieldType::ALL {
            let per_cell = scope.targets.min_yield_per_cell[yield_type];
            if per_cell <= 0.0 {
                continue;
            }
            let target = per_cell * cells;
            let mut stuck = vec![false; scope.members.len()];
            let mut iterations = 0;
            while aggregate[yield_type] < target
                && iterations < yield_budget
                && !stuck.iter().all(|s| *s)
            {
                iterations += 1;
                let slot = pool.next_open(ctx.rng, &stuck);
                let (region, data) = scope.members[slot];
                let applied = self.attempt(ctx, &scope.weights, |strategy, ctx| {
                    strategy.try_increase_yield(ctx, region, data, yield_type)
                });
                match applied {
                    Some((id, delta)) => {
                        aggregate += delta;
                        report.applications[id.index()] += 1;
                    }
                    None => stuck[slot] = true,
                }
            }
            report.yield_iterations += iterations;

            if aggregate[yield_type] < target {
                warn!(
                    target: "core_mapgen::balance",
                    scope = scope.label,
                    yield_type = ?yield_type,
                    target,
                    achieved = aggregate[yield_type],
                    iterations,
                    "balance.yield_shortfall"
                );
                report.yield_shortfalls.push(YieldShortfall {
                    yield_type,
                    target,
                    achieved: aggregate[yield_type],
                });
            }
        }

        let min = scope.targets.min_score_per_cell * cells;
        let max = scope.targets.max_score_per_cell * cells;
        let mut score: f32 = scope
            .members
            .iter()
            .map(|(region, _)| ctx.region_score(region))
            .sum();
        let score_budget = ctx.config.score_iterations_per_unit * scope.units;
        let mut stuck = vec![false; scope.members.len()];
        let mut raising = score < min;
        let mut iterations = 0;
        while (score < min || score > max)
            && iterations < score_budget
            && !stuck.iter().all(|s| *s)
        {
            let below = score < min;
            if below != raising {
                raising = below;
                stuck.iter_mut().for_each(|s| *s = false);
            }
            iterations += 1;
            let slot = pool.next_open(ctx.rng, &stuck);
            let (region, data) = scope.members[slot];
            let applied = self.attempt(ctx, &scope.weights, |strategy, ctx| {
                if below {
                    strategy.try_increase_score(ctx, region, data)
                } else {
                    strategy.try_decrease_score(ctx, region, data)
                }
            });
            match applied {
                Some((id, delta)) => {
                    score += delta;
                    report.applications[id.index()] += 1;
                }
                None => stuck[slot] = true,
            }
        }
        report.score_iterations = iterations;

        report.final_yield = scope
            .members
            .iter()
            .map(|(region, _)| ctx.region_yield(region))
            .sum();
        report.final_score = scope
            .members
            .iter()
            .map(|(region, _)| ctx.region_score(region))
            .sum();

        if report.final_score < min || report.final_score > max {
            warn!(
                target: "core_mapgen::balance",
                scope = scope.label,
                min,
                max,
                achieved = report.final_score,
                iterations,
                "balance.score_shortfall"
            );
            report.score_shortfall = Some(ScoreShortfall {
                min,
                max,
                achieved: report.final_score,
            });
        }

        info!(
            target: "core_mapgen::balance",
            scope = scope.label,
            cells = report.cell_count,
            applications = report.total_applications(),
            yield_iterations = report.yield_iterations,
            score_iterations = report.score_iterations,
            score = report.final_score,
            "balance.scope_balanced"
        );
        report
    }

    /// Try strategies in weighted random order until one applies.
    fn attempt<T>(
        &self,
        ctx: &mut BalanceContext<'_>,
        weights: &[u32; StrategyId::COUNT],
        mut call: impl FnMut(&dyn BalanceStrategy, &mut BalanceContext<'_>) -> StrategyOutcome<T>,
    ) -> Option<(StrategyId, T)> {
        let order = sampling::sample(ctx.rng, &StrategyId::ALL, StrategyId::COUNT, |id| {
            f64::from(weights[id.index()])
        });
        for id in order {
            if let StrategyOutcome::Applied(delta) = call(self.registry.get(id), ctx) {
                return Some((id, delta));
            }
            debug!(target: "core_mapgen::balance", strategy = %id, "balance.strategy_no_change");
        }
        None
    }
}
