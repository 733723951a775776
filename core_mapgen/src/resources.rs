//! Resource definitions and the placement restriction service.

use std::collections::HashMap;

use serde::Deserialize;

use crate::{
    cell::{Feature, ResourceNode, Shape, Terrain, Vegetation},
    error::MapGenError,
    grid::{CellId, MapGrid},
    yields::{YieldSummary, YieldType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u16);

impl ResourceId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Bonus,
    Strategic,
    Luxury,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Bonus,
        ResourceKind::Strategic,
        ResourceKind::Luxury,
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDefinition {
    #[serde(skip, default = "placeholder_id")]
    pub id: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub yields: YieldSummary,
    pub valid_terrains: Vec<Terrain>,
    #[serde(default = "default_valid_shapes")]
    pub valid_shapes: Vec<Shape>,
    #[serde(default = "default_valid_vegetation")]
    pub valid_vegetation: Vec<Vegetation>,
    #[serde(default = "default_copies")]
    pub copies: u32,
    /// Extra placement weight on cells with a river edge.
    #[serde(default)]
    pub river_bonus: f32,
}

const fn placeholder_id() -> ResourceId {
    ResourceId(u16::MAX)
}

fn default_valid_shapes() -> Vec<Shape> {
    vec![Shape::Flatlands]
}

fn default_valid_vegetation() -> Vec<Vegetation> {
    vec![Vegetation::None]
}

const fn default_copies() -> u32 {
    1
}

fn definition(
    name: &str,
    kind: ResourceKind,
    yields: &[(YieldType, f32)],
    valid_terrains: &[Terrain],
    valid_shapes: &[Shape],
    valid_vegetation: &[Vegetation],
    copies: u32,
) -> ResourceDefinition {
    ResourceDefinition {
        id: placeholder_id(),
        name: name.to_string(),
        kind,
        yields: yields
            .iter()
            .map(|&(t, amount)| YieldSummary::single(t, amount))
            .sum(),
        valid_terrains: valid_terrains.to_vec(),
        valid_shapes: valid_shapes.to_vec(),
        valid_vegetation: valid_vegetation.to_vec(),
        copies,
        river_bonus: 0.0,
    }
}

#[rustfmt::skip]
pub fn default_resource_definitions() -> Vec<ResourceDefinition> {
    use ResourceKind::*;
    use Shape::*;
    use Terrain::*;
    use YieldType::*;

    let none = [Vegetation::None];
    vec![
        definition("wheat", Bonus, &[(Food, 2.0)], &[Plains, FloodPlains, Grassland], &[Flatlands], &none, 1),
        definition("cattle", Bonus, &[(Food, 1.0), (Production, 1.0)], &[Grassland], &[Flatlands, Hills], &none, 1),
        definition("deer", Bonus, &[(Food, 1.0), (Production, 1.0)], &[Tundra, Plains, Grassland], &[Flatlands, Hills], &[Vegetation::Forest, Vegetation::None], 1),
        definition("fish", Bonus, &[(Food, 2.0)], &[ShallowWater, FreshWater], &[Flatlands], &none, 1),
        definition("stone", Bonus, &[(Production, 1.0)], &[Desert, Tundra, Plains, Snow], &[Flatlands, Hills], &none, 1),
        definition("iron", Strategic, &[(Production, 1.0)], &[Grassland, Plains, Desert, Tundra, Snow], &[Flatlands, Hills], &none, 2),
        definition("horses", Strategic, &[(Food, 1.0), (Production, 1.0)], &[Grassland, Plains], &[Flatlands], &none, 2),
        definition("coal", Strategic, &[(Production, 2.0)], &[Grassland, Plains], &[Hills], &[Vegetation::None, Vegetation::Forest], 2),
        definition("oil", Strategic, &[(Production, 1.0), (Gold, 1.0)], &[Desert, Tundra, Snow], &[Flatlands], &[Vegetation::None, Vegetation::Marsh], 2),
        definition("gold_ore", Luxury, &[(Gold, 3.0)], &[Desert, Plains, Grassland], &[Hills, Flatlands], &none, 1),
        definition("spices", Luxury, &[(Gold, 2.0), (Culture, 1.0)], &[Grassland, Plains], &[Flatlands], &[Vegetation::Jungle, Vegetation::None], 1),
        definition("furs", Luxury, &[(Gold, 2.0), (Food, 1.0)], &[Tundra, Snow], &[Flatlands, Hills], &[Vegetation::Forest, Vegetation::None], 1),
        definition("incense", Luxury, &[(Gold, 2.0), (Faith, 1.0)], &[Desert, Plains], &[Flatlands], &none, 1),
    ]
}

#[derive(Debug, Clone)]
pub struct ResourceCatalog {
    definitions: Vec<ResourceDefinition>,
    by_name: HashMap<String, ResourceId>,
}

impl ResourceCatalog {
    pub fn new(mut definitions: Vec<ResourceDefinition>) -> Self {
        let mut by_name = HashMap::with_capacity(definitions.len());
        for (idx, def) in definitions.iter_mut().enumerate() {
            def.id = ResourceId(idx as u16);
            by_name.insert(def.name.clone(), def.id);
        }
        Self {
            definitions,
            by_name,
        }
    }

    pub fn builtin() -> Self {
        Self::new(default_resource_definitions())
    }

    pub fn get(&self, id: ResourceId) -> Option<&ResourceDefinition> {
        self.definitions.get(id.index())
    }

    pub fn find(&self, name: &str) -> Option<&ResourceDefinition> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.definitions.iter()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDefinition> {
        self.definitions.iter().filter(move |def| def.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Placement feasibility and weighting of resource nodes on cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceRestrictions;

impl ResourceRestrictions {
    pub fn is_valid_placement(
        &self,
        grid: &dyn MapGrid,
        resource: &ResourceDefinition,
        cell: CellId,
    ) -> bool {
        let snapshot = grid.cell(cell);
        snapshot.resource.is_none()
            && snapshot.feature == Feature::None
            && resource.valid_terrains.contains(&snapshot.terrain)
            && resource.valid_shapes.contains(&snapshot.shape)
            && resource.valid_vegetation.contains(&snapshot.vegetation)
    }

    /// Relative likelihood of placing `resource` on `cell`; 0 when invalid.
    ///
    /// Cells next to a node of the same resource are discounted so copies
    /// spread out.
    pub fn placement_weight(
        &self,
        grid: &dyn MapGrid,
        resource: &ResourceDefinition,
        cell: CellId,
    ) -> f32 {
        if !self.is_valid_placement(grid, resource, cell) {
            return 0.0;
        }
        let mut weight = 1.0;
        if grid.has_river(cell) {
            weight += resource.river_bonus;
        }
        let same_nearby = grid
            .neighbors(cell)
            .into_iter()
            .filter(|&n| {
                grid.resource_node(n)
                    .is_some_and(|node| node.resource == resource.id)
            })
            .count();
        weight / (1.0 + same_nearby as f32)
    }

    pub fn can_build_node(
        &self,
        grid: &dyn MapGrid,
        cell: CellId,
        resource: &ResourceDefinition,
    ) -> bool {
        self.is_valid_placement(grid, resource, cell)
    }

    pub fn build_node(
        &self,
        grid: &mut dyn MapGrid,
        cell: CellId,
        resource: &ResourceDefinition,
        copies: u32,
    ) -> Result<(), MapGenError> {
        if !self.can_build_node(grid, cell, resource) {
            return Err(MapGenError::MutationRejected {
                cell,
                change: "resource node",
            });
        }
        grid.set_resource_node(
            cell,
            Some(ResourceNode {
                resource: resource.id,
                copies: copies.max(1),
            }),
        );
        Ok(())
    }
}
