//! Yield and score balancing.
//!
//! A [`BalanceStrategy`] is one stateless tactic for nudging a region's
//! yields. Strategies compute the delta of a change on a hypothetical cell
//! snapshot, apply it through the grid's guarded mutation API, and report
//! [`StrategyOutcome::Applied`] with exactly that delta, or
//! [`StrategyOutcome::NoChange`] when nothing was written.

mod balancer;
pub mod strategies;

use std::fmt;

use serde::Deserialize;

pub use balancer::{
    BalanceConfig, BalanceReport, ScoreShortfall, YieldBalancer, YieldShortfall,
};

use crate::{
    cell::CellSnapshot,
    grid::{CellId, MapGrid},
    region::{Region, RegionData},
    resources::{ResourceCatalog, ResourceRestrictions},
    rng::GenerationRng,
    yields::{YieldEstimator, YieldScorer, YieldSummary, YieldType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    RaiseHills,
    Jungle,
    Lake,
    Oasis,
    ExpandOcean,
    BonusResource,
    StrategicResource,
    LuxuryResource,
}

impl StrategyId {
    pub const COUNT: usize = 8;
    pub const ALL: [StrategyId; StrategyId::COUNT] = [
        StrategyId::RaiseHills,
        StrategyId::Jungle,
        StrategyId::Lake,
        StrategyId::Oasis,
        StrategyId::ExpandOcean,
        StrategyId::BonusResource,
        StrategyId::StrategicResource,
        StrategyId::LuxuryResource,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable name used by template weight tables.
    pub fn name(self) -> &'static str {
        match self {
            StrategyId::RaiseHills => "raise_hills",
            StrategyId::Jungle => "jungle",
            StrategyId::Lake => "lake",
            StrategyId::Oasis => "oasis",
            StrategyId::ExpandOcean => "expand_ocean",
            StrategyId::BonusResource => "bonus_resource",
            StrategyId::StrategicResource => "strategic_resource",
            StrategyId::LuxuryResource => "luxury_resource",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one strategy attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyOutcome<T> {
    /// The grid was changed; carries the exact delta of that change.
    Applied(T),
    /// Nothing was written.
    NoChange,
}

impl<T> StrategyOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, StrategyOutcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            StrategyOutcome::Applied(delta) => Some(delta),
            StrategyOutcome::NoChange => None,
        }
    }
}

/// Collaborators shared by every strategy call during one balancing run.
pub struct BalanceContext<'a> {
    pub grid: &'a mut dyn MapGrid,
    pub rng: &'a mut GenerationRng,
    pub estimator: &'a dyn YieldEstimator,
    pub scorer: &'a YieldScorer,
    pub catalog: &'a ResourceCatalog,
    pub restrictions: ResourceRestrictions,
    pub config: &'a BalanceConfig,
}

impl BalanceContext<'_> {
    pub fn snapshot(&self, cell: CellId) -> CellSnapshot {
        self.grid.cell(cell)
    }

    pub fn yield_of_snapshot(&self, snapshot: &CellSnapshot) -> YieldSummary {
        self.estimator.yield_of_snapshot(snapshot)
    }

    pub fn score_of_snapshot(&self, snapshot: &CellSnapshot) -> f32 {
        self.scorer
            .score_of_snapshot(snapshot, self.estimator, self.catalog)
    }

    /// Yield delta of replacing the cell's current state with `after`.
    pub fn yield_delta(&self, cell: CellId, after: &CellSnapshot) -> YieldSummary {
        self.yield_of_snapshot(after) - self.yield_of_snapshot(&self.snapshot(cell))
    }

    pub fn score_delta(&self, cell: CellId, after: &CellSnapshot) -> f32 {
        self.score_of_snapshot(after) - self.score_of_snapshot(&self.snapshot(cell))
    }

    pub fn region_yield(&self, region: &Region) -> YieldSummary {
        region
            .cells()
            .map(|cell| self.yield_of_snapshot(&self.snapshot(cell)))
            .sum()
    }

    pub fn region_score(&self, region: &Region) -> f32 {
        region
            .cells()
            .map(|cell| self.score_of_snapshot(&self.snapshot(cell)))
            .sum()
    }
}

/// One interchangeable balancing tactic.
pub trait BalanceStrategy {
    fn id(&self) -> StrategyId;

    fn try_increase_yield(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
        yield_type: YieldType,
    ) -> StrategyOutcome<YieldSummary>;

    fn try_increase_score(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
    ) -> StrategyOutcome<f32>;

    fn try_decrease_score(
        &self,
        ctx: &mut BalanceContext<'_>,
        region: &Region,
        data: &RegionData<'_>,
    ) -> StrategyOutcome<f32>;
}

/// Strategy instances indexed by [`StrategyId`].
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn BalanceStrategy>>,
}

impl StrategyRegistry {
    /// Registry holding one instance of every built-in strategy.
    pub fn builtin() -> Self {
        use strategies::*;
        let strategies: Vec<Box<dyn BalanceStrategy>> = vec![
            Box::new(RaiseHills),
            Box::new(Jungle),
            Box::new(Lake),
            Box::new(Oasis),
            Box::new(ExpandOcean),
            Box::new(ResourcePlacement::bonus()),
            Box::new(ResourcePlacement::strategic()),
            Box::new(ResourcePlacement::luxury()),
        ];
        debug_assert!(strategies
            .iter()
            .enumerate()
            .all(|(idx, s)| s.id().index() == idx));
        Self { strategies }
    }

    pub fn get(&self, id: StrategyId) -> &dyn BalanceStrategy {
        self.strategies[id.index()].as_ref()
    }

    pub fn find(&self, name: &str) -> Option<&dyn BalanceStrategy> {
        StrategyId::ALL
            .iter()
            .find(|id| id.name() == name)
            .map(|id| self.get(*id))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_dense_and_named() {
        let registry = StrategyRegistry::builtin();
        for id in StrategyId::ALL {
            assert_eq!(registry.get(id).id(), id);
            assert_eq!(registry.find(id.name()).map(|s| s.id()), Some(id));
        }
        assert!(registry.find("terraform").is_none());
    }

    #[test]
    fn strategy_names_match_serde() {
        for id in StrategyId::ALL {
            let parsed: StrategyId = serde_json::from_str(&format!("\"{}\"", id.name())).unwrap();
            assert_eq!(parsed, id);
        }
    }

    #[test]
    fn outcome_helpers() {
        assert_eq!(StrategyOutcome::Applied(2.5).applied(), Some(2.5));
        assert!(!StrategyOutcome::<f32>::NoChange.is_applied());
    }
}
