use serde::Deserialize;

use crate::{grid::HexDirection, resources::ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Grassland,
    Plains,
    Desert,
    Tundra,
    Snow,
    FloodPlains,
    ShallowWater,
    DeepWater,
    FreshWater,
}

impl Terrain {
    pub const ALL: [Terrain; 9] = [
        Terrain::Grassland,
        Terrain::Plains,
        Terrain::Desert,
        Terrain::Tundra,
        Terrain::Snow,
        Terrain::FloodPlains,
        Terrain::ShallowWater,
        Terrain::DeepWater,
        Terrain::FreshWater,
    ];

    pub fn is_water(self) -> bool {
        matches!(
            self,
            Terrain::ShallowWater | Terrain::DeepWater | Terrain::FreshWater
        )
    }

    pub fn is_land(self) -> bool {
        !self.is_water()
    }

    /// Desert, tundra and snow: the biomes rivers and balancing try to relieve.
    pub fn is_extreme(self) -> bool {
        matches!(self, Terrain::Desert | Terrain::Tundra | Terrain::Snow)
    }

    pub fn is_arctic(self) -> bool {
        matches!(self, Terrain::Tundra | Terrain::Snow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Flatlands,
    Hills,
    Mountains,
}

impl Shape {
    pub const ALL: [Shape; 3] = [Shape::Flatlands, Shape::Hills, Shape::Mountains];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vegetation {
    None,
    Forest,
    Jungle,
    Marsh,
}

impl Vegetation {
    pub const ALL: [Vegetation; 4] = [
        Vegetation::None,
        Vegetation::Forest,
        Vegetation::Jungle,
        Vegetation::Marsh,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    None,
    Oasis,
}

/// Rotational sense a river edge travels relative to the cell that owns it.
///
/// The same physical edge seen from the neighboring cell has the opposite
/// flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiverFlow {
    Clockwise,
    Counterclockwise,
}

impl RiverFlow {
    pub fn opposite(self) -> Self {
        match self {
            RiverFlow::Clockwise => RiverFlow::Counterclockwise,
            RiverFlow::Counterclockwise => RiverFlow::Clockwise,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNode {
    pub resource: ResourceId,
    pub copies: u32,
}

/// Read-only view of everything the generator cares about on one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSnapshot {
    pub terrain: Terrain,
    pub shape: Shape,
    pub vegetation: Vegetation,
    pub feature: Feature,
    pub resource: Option<ResourceNode>,
    pub rivers: [Option<RiverFlow>; 6],
}

impl CellSnapshot {
    pub fn new(terrain: Terrain, shape: Shape) -> Self {
        Self {
            terrain,
            shape,
            vegetation: Vegetation::None,
            feature: Feature::None,
            resource: None,
            rivers: [None; 6],
        }
    }

    pub fn ocean() -> Self {
        Self::new(Terrain::DeepWater, Shape::Flatlands)
    }

    pub fn is_water(&self) -> bool {
        self.terrain.is_water()
    }

    pub fn is_land(&self) -> bool {
        self.terrain.is_land()
    }

    pub fn has_river(&self) -> bool {
        self.rivers.iter().any(Option::is_some)
    }

    pub fn river_at(&self, direction: HexDirection) -> Option<RiverFlow> {
        self.rivers[direction.index()]
    }

    /// Coarse elevation used for runoff and temperature falloff.
    pub fn elevation(&self) -> u8 {
        if self.is_water() {
            return 0;
        }
        match self.shape {
            Shape::Flatlands => 1,
            Shape::Hills => 2,
            Shape::Mountains => 3,
        }
    }

    pub fn with_terrain(mut self, terrain: Terrain) -> Self {
        self.terrain = terrain;
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_vegetation(mut self, vegetation: Vegetation) -> Self {
        self.vegetation = vegetation;
        self
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.feature = feature;
        self
    }

    pub fn with_resource(mut self, resource: Option<ResourceNode>) -> Self {
        self.resource = resource;
        self
    }
}
