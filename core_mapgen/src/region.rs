//! Regions and their per-region balancing data.

use std::{
    cell::OnceCell,
    collections::{HashMap, HashSet},
};

use tracing::warn;

use crate::{
    balance::StrategyId,
    grid::{CellId, HexTopology},
    partition::centroid_of,
    resources::{ResourceCatalog, ResourceId},
    templates::{BalanceTemplate, BiomeTemplate, HomelandTemplate, TopologyTemplate},
};

/// Fixed set of land and water cells; the unit of topology, biome, river,
/// resource generation and balancing.
#[derive(Debug, Clone)]
pub struct Region {
    id: usize,
    land: Vec<CellId>,
    water: Vec<CellId>,
    centroid: CellId,
    members: HashSet<CellId>,
}

impl Region {
    pub fn new<T: HexTopology + ?Sized>(
        topology: &T,
        id: usize,
        land: Vec<CellId>,
        water: Vec<CellId>,
    ) -> Self {
        let centroid = if land.is_empty() {
            centroid_of(topology, &water)
        } else {
            centroid_of(topology, &land)
        };
        let members = land.iter().chain(water.iter()).copied().collect();
        Self {
            id,
            land,
            water,
            centroid,
            members,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Cells that were land when the region was built.
    pub fn land(&self) -> &[CellId] {
        &self.land
    }

    pub fn water(&self) -> &[CellId] {
        &self.water
    }

    pub fn centroid(&self) -> CellId {
        self.centroid
    }

    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.land.iter().chain(self.water.iter()).copied()
    }

    pub fn cell_count(&self) -> usize {
        self.land.len() + self.water.len()
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.members.contains(&cell)
    }
}

/// Template references for one region plus lazily resolved weight tables.
///
/// Resource weights are resolved against the catalog given at construction.
pub struct RegionData<'a> {
    pub biome: &'a BiomeTemplate,
    pub topology: &'a TopologyTemplate,
    pub balance: &'a BalanceTemplate,
    catalog: &'a ResourceCatalog,
    luxury_weights: &'a HashMap<String, f32>,
    strategy_weights: OnceCell<[u32; StrategyId::COUNT]>,
    resource_weights: OnceCell<Vec<f32>>,
}

impl<'a> RegionData<'a> {
    pub fn new(
        biome: &'a BiomeTemplate,
        topology: &'a TopologyTemplate,
        homeland: &'a HomelandTemplate,
        catalog: &'a ResourceCatalog,
    ) -> Self {
        Self {
            biome,
            topology,
            balance: &homeland.region_balance,
            catalog,
            luxury_weights: &homeland.luxury_weights,
            strategy_weights: OnceCell::new(),
            resource_weights: OnceCell::new(),
        }
    }

    /// Biome and topology strategy weights summed per strategy. Templates
    /// that name no strategy at all enable every strategy equally.
    pub fn strategy_weights(&self) -> &[u32; StrategyId::COUNT] {
        self.strategy_weights.get_or_init(|| {
            dense_strategy_weights(&[
                &self.biome.strategy_weights,
                &self.topology.strategy_weights,
            ])
        })
    }

    /// Selection weight of every catalog resource, indexed by [`ResourceId`].
    ///
    /// Resources default to 1; each table that names a resource multiplies
    /// its weight. The homeland's luxury table is one of them.
    pub fn resource_weights(&self) -> &[f32] {
        self.resource_weights.get_or_init(|| {
            dense_resource_weights(
                self.catalog,
                &[
                    &self.biome.resource_weights,
                    &self.topology.resource_weights,
                    self.luxury_weights,
                ],
            )
        })
    }

    pub fn resource_weight(&self, resource: ResourceId) -> f32 {
        self.resource_weights()
            .get(resource.index())
            .copied()
            .unwrap_or(0.0)
    }
}

/// Homeland-scoped template and strategy weights.
///
/// Holds no resource weights: homeland-scope placement goes through each
/// member's [`RegionData`], which already folds in the luxury table.
pub struct HomelandData<'a> {
    pub template: &'a HomelandTemplate,
    strategy_weights: OnceCell<[u32; StrategyId::COUNT]>,
}

impl<'a> HomelandData<'a> {
    pub fn new(template: &'a HomelandTemplate) -> Self {
        Self {
            template,
            strategy_weights: OnceCell::new(),
        }
    }

    pub fn balance(&self) -> &'a BalanceTemplate {
        &self.template.homeland_balance
    }

    pub fn strategy_weights(&self) -> &[u32; StrategyId::COUNT] {
        self.strategy_weights
            .get_or_init(|| dense_strategy_weights(&[&self.template.strategy_weights]))
    }
}

fn dense_strategy_weights(tables: &[&HashMap<StrategyId, u32>]) -> [u32; StrategyId::COUNT] {
    if tables.iter().all(|table| table.is_empty()) {
        return [1; StrategyId::COUNT];
    }
    let mut dense = [0u32; StrategyId::COUNT];
    for table in tables {
        for (id, weight) in table.iter() {
            dense[id.index()] = dense[id.index()].saturating_add(*weight);
        }
    }
    dense
}

fn dense_resource_weights(catalog: &ResourceCatalog, tables: &[&HashMap<String, f32>]) -> Vec<f32> {
    for table in tables {
        for name in table.keys() {
            if catalog.find(name).is_none() {
                warn!(
                    target: "core_mapgen::config",
                    resource = %name,
                    "templates.unknown_resource"
                );
            }
        }
    }
    catalog
        .iter()
        .map(|def| {
            tables
                .iter()
                .filter_map(|table| table.get(&def.name))
                .fold(1.0f32, |acc, w| acc * w.max(0.0))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::HexMap;

    #[test]
    fn region_membership_and_centroid() {
        let map = HexMap::ocean(6, 6);
        let land = vec![CellId(7), CellId(8), CellId(9)];
        let water = vec![CellId(13)];
        let region = Region::new(&map, 0, land, water);
        assert_eq!(region.cell_count(), 4);
        assert_eq!(region.centroid(), CellId(8));
        assert!(region.contains(CellId(13)));
        assert!(!region.contains(CellId(14)));
    }

    #[test]
    fn strategy_weights_merge_and_default() {
        let homeland = HomelandTemplate::default();
        let topology = TopologyTemplate::default();
        let mut biome = BiomeTemplate::default();

        let catalog = ResourceCatalog::builtin();
        let data = RegionData::new(&biome, &topology, &homeland, &catalog);
        assert_eq!(data.strategy_weights(), &[1; StrategyId::COUNT]);

        biome.strategy_weights.insert(StrategyId::Lake, 3);
        let mut hilly = TopologyTemplate::default();
        hilly.strategy_weights.insert(StrategyId::Lake, 2);
        hilly.strategy_weights.insert(StrategyId::RaiseHills, 5);
        let data = RegionData::new(&biome, &hilly, &homeland, &catalog);
        let weights = data.strategy_weights();
        assert_eq!(weights[StrategyId::Lake.index()], 5);
        assert_eq!(weights[StrategyId::RaiseHills.index()], 5);
        assert_eq!(weights[StrategyId::Oasis.index()], 0);
    }

    #[test]
    fn resource_weights_multiply_across_tables() {
        let catalog = ResourceCatalog::builtin();
        let mut biome = BiomeTemplate::default();
        biome.resource_weights.insert("wheat".into(), 2.0);
        biome.resource_weights.insert("oil".into(), 0.0);
        let mut homeland = HomelandTemplate::default();
        homeland.luxury_weights.insert("wheat".into(), 1.5);
        let topology = TopologyTemplate::default();
        let data = RegionData::new(&biome, &topology, &homeland, &catalog);

        let wheat = catalog.find("wheat").unwrap().id;
        let oil = catalog.find("oil").unwrap().id;
        let iron = catalog.find("iron").unwrap().id;
        assert_eq!(data.resource_weight(wheat), 3.0);
        assert_eq!(data.resource_weight(oil), 0.0);
        assert_eq!(data.resource_weight(iron), 1.0);
    }

    #[test]
    fn resource_weights_follow_the_construction_catalog() {
        let wheat_only = ResourceCatalog::new(
            ResourceCatalog::builtin()
                .iter()
                .filter(|def| def.name == "wheat")
                .cloned()
                .collect(),
        );
        let mut biome = BiomeTemplate::default();
        biome.resource_weights.insert("wheat".into(), 4.0);
        let topology = TopologyTemplate::default();
        let homeland = HomelandTemplate::default();
        let data = RegionData::new(&biome, &topology, &homeland, &wheat_only);

        let wheat = wheat_only.find("wheat").unwrap().id;
        assert_eq!(data.resource_weights().len(), 1);
        assert_eq!(data.resource_weight(wheat), 4.0);
    }
}
