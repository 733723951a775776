//! Biome, topology and homeland templates.
//!
//! Templates are plain data loaded with the rest of the config. Weight tables
//! are keyed by strategy id or resource name here and resolved into dense
//! arrays by [`RegionData`](crate::region::RegionData).

use std::collections::HashMap;

use serde::Deserialize;

use crate::{balance::StrategyId, yields::YieldSummary};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BiomeTemplate {
    pub name: String,
    /// Relative chance of a region drawing this template.
    pub weight: u32,
    /// Fractions of the region's land; plains take whatever is left.
    pub snow: f32,
    pub tundra: f32,
    pub desert: f32,
    pub grassland: f32,
    pub forest: f32,
    pub jungle: f32,
    pub marsh: f32,
    pub strategy_weights: HashMap<StrategyId, u32>,
    pub resource_weights: HashMap<String, f32>,
}

impl Default for BiomeTemplate {
    fn default() -> Self {
        Self {
            name: "temperate".to_string(),
            weight: 1,
            snow: 0.0,
            tundra: 0.05,
            desert: 0.1,
            grassland: 0.45,
            forest: 0.2,
            jungle: 0.05,
            marsh: 0.03,
            strategy_weights: HashMap::new(),
            resource_weights: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopologyTemplate {
    pub name: String,
    pub weight: u32,
    pub hills: f32,
    pub mountains: f32,
    /// Extra weight per adjacent mountain already placed.
    pub mountain_clustering: f64,
    /// Weight removed per adjacent hill already placed.
    pub hills_spread: f64,
    pub strategic_per_region: u32,
    pub bonus_per_region: u32,
    pub strategy_weights: HashMap<StrategyId, u32>,
    pub resource_weights: HashMap<String, f32>,
}

impl Default for TopologyTemplate {
    fn default() -> Self {
        Self {
            name: "rolling".to_string(),
            weight: 1,
            hills: 0.15,
            mountains: 0.06,
            mountain_clustering: 3.0,
            hills_spread: 0.4,
            strategic_per_region: 1,
            bonus_per_region: 2,
            strategy_weights: HashMap::new(),
            resource_weights: HashMap::new(),
        }
    }
}

/// Per-cell yield minimums and score band.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BalanceTemplate {
    pub min_yield_per_cell: YieldSummary,
    pub min_score_per_cell: f32,
    pub max_score_per_cell: f32,
}

impl Default for BalanceTemplate {
    fn default() -> Self {
        Self {
            min_yield_per_cell: YieldSummary::ZERO,
            min_score_per_cell: 0.0,
            max_score_per_cell: f32::MAX,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HomelandTemplate {
    pub name: String,
    pub regions_per_homeland: u32,
    pub luxury_per_homeland: u32,
    pub luxury_weights: HashMap<String, f32>,
    /// Strategy weights for homeland-scoped balancing.
    pub strategy_weights: HashMap<StrategyId, u32>,
    pub region_balance: BalanceTemplate,
    pub homeland_balance: BalanceTemplate,
}

impl Default for HomelandTemplate {
    fn default() -> Self {
        Self {
            name: "standard".to_string(),
            regions_per_homeland: 3,
            luxury_per_homeland: 2,
            luxury_weights: HashMap::new(),
            strategy_weights: HashMap::new(),
            region_balance: BalanceTemplate::default(),
            homeland_balance: BalanceTemplate::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateSet {
    pub biomes: Vec<BiomeTemplate>,
    pub topologies: Vec<TopologyTemplate>,
    pub homeland: HomelandTemplate,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            biomes: vec![BiomeTemplate::default()],
            topologies: vec![TopologyTemplate::default()],
            homeland: HomelandTemplate::default(),
        }
    }
}
