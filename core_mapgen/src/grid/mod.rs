//! Grid collaborator contracts and the reference hex map.
//!
//! The generator never owns cells. Everything it reads or writes goes through
//! the traits below; [`HexMap`] is the in-crate implementation used by the
//! pipeline driver and the tests.

mod hex_map;

use bevy::prelude::{IVec2, UVec2};
use serde::Deserialize;

pub use hex_map::HexMap;

use crate::{
    cell::{CellSnapshot, Feature, ResourceNode, RiverFlow, Shape, Terrain, Vegetation},
    error::MapGenError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub u32);

impl CellId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Edge/neighbor direction of a pointy-top hex, listed clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HexDirection {
    NE,
    E,
    SE,
    SW,
    W,
    NW,
}

impl HexDirection {
    pub const ALL: [HexDirection; 6] = [
        HexDirection::NE,
        HexDirection::E,
        HexDirection::SE,
        HexDirection::SW,
        HexDirection::W,
        HexDirection::NW,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 6]
    }

    /// Rotate by `steps` clockwise (negative steps rotate counterclockwise).
    pub fn rotated(self, steps: i32) -> Self {
        Self::from_index((self.index() as i32 + steps).rem_euclid(6) as usize)
    }

    pub fn opposite(self) -> Self {
        self.rotated(3)
    }

    pub fn next(self) -> Self {
        self.rotated(1)
    }

    pub fn previous(self) -> Self {
        self.rotated(-1)
    }

    /// Clockwise steps needed to turn `self` into `other`, in `0..6`.
    pub fn steps_to(self, other: HexDirection) -> u8 {
        ((other.index() + 6 - self.index()) % 6) as u8
    }

    /// Axial `(q, r)` offset of the neighbor in this direction.
    pub fn axial_offset(self) -> IVec2 {
        match self {
            HexDirection::NE => IVec2::new(0, 1),
            HexDirection::E => IVec2::new(1, 0),
            HexDirection::SE => IVec2::new(1, -1),
            HexDirection::SW => IVec2::new(0, -1),
            HexDirection::W => IVec2::new(-1, 0),
            HexDirection::NW => IVec2::new(-1, 1),
        }
    }
}

/// Read-only adjacency, distance and coordinate queries.
pub trait HexTopology {
    /// Cell counts along the x (column) and z (row) axes.
    fn dimensions(&self) -> UVec2;

    fn neighbor(&self, cell: CellId, direction: HexDirection) -> Option<CellId>;

    fn distance(&self, a: CellId, b: CellId) -> u32;

    fn cell_at_offset(&self, x: i32, z: i32) -> Option<CellId>;

    fn offset_of(&self, cell: CellId) -> IVec2;

    fn cell_count(&self) -> usize {
        let dims = self.dimensions();
        dims.x as usize * dims.y as usize
    }

    fn all_cells(&self) -> Vec<CellId> {
        (0..self.cell_count() as u32).map(CellId).collect()
    }

    fn neighbors(&self, cell: CellId) -> Vec<CellId> {
        HexDirection::ALL
            .iter()
            .filter_map(|&dir| self.neighbor(cell, dir))
            .collect()
    }

    fn direction_to(&self, from: CellId, to: CellId) -> Option<HexDirection> {
        HexDirection::ALL
            .iter()
            .copied()
            .find(|&dir| self.neighbor(from, dir) == Some(to))
    }

    fn cells_in_radius(&self, center: CellId, radius: u32) -> Vec<CellId> {
        let origin = self.offset_of(center);
        let r = radius as i32;
        let mut cells = Vec::new();
        for dz in -r..=r {
            // Offset rows shift by half a cell, so scan a slightly wider band.
            for dx in -(r + 1)..=(r + 1) {
                if let Some(cell) = self.cell_at_offset(origin.x + dx, origin.y + dz) {
                    if self.distance(center, cell) <= radius {
                        cells.push(cell);
                    }
                }
            }
        }
        cells
    }
}

/// Cell state reads plus the guarded terrain/shape/vegetation/feature writes.
///
/// Every `change_*` call re-checks its `can_change_*` predicate and returns
/// [`MapGenError::MutationRejected`] instead of applying an invalid change.
pub trait CellMutation: HexTopology {
    fn cell(&self, cell: CellId) -> CellSnapshot;

    fn can_change_terrain(&self, cell: CellId, terrain: Terrain) -> bool;
    fn change_terrain(&mut self, cell: CellId, terrain: Terrain) -> Result<(), MapGenError>;

    fn can_change_shape(&self, cell: CellId, shape: Shape) -> bool;
    fn change_shape(&mut self, cell: CellId, shape: Shape) -> Result<(), MapGenError>;

    fn can_change_vegetation(&self, cell: CellId, vegetation: Vegetation) -> bool;
    fn change_vegetation(&mut self, cell: CellId, vegetation: Vegetation)
        -> Result<(), MapGenError>;

    fn can_change_feature(&self, cell: CellId, feature: Feature) -> bool;
    fn change_feature(&mut self, cell: CellId, feature: Feature) -> Result<(), MapGenError>;

    fn is_water(&self, cell: CellId) -> bool {
        self.cell(cell).is_water()
    }

    fn has_water_neighbor(&self, cell: CellId) -> bool {
        self.neighbors(cell).into_iter().any(|n| self.is_water(n))
    }
}

/// River edges. An edge is shared by two cells and seen with opposite flow
/// from either side.
pub trait RiverCanon: HexTopology {
    fn has_river(&self, cell: CellId) -> bool;
    fn flow_at_edge(&self, cell: CellId, direction: HexDirection) -> Option<RiverFlow>;
    fn can_add_river(&self, cell: CellId, direction: HexDirection, flow: RiverFlow) -> bool;
    fn add_river(
        &mut self,
        cell: CellId,
        direction: HexDirection,
        flow: RiverFlow,
    ) -> Result<(), MapGenError>;

    fn has_river_along_edge(&self, cell: CellId, direction: HexDirection) -> bool {
        self.flow_at_edge(cell, direction).is_some()
    }
}

/// Storage of placed resource nodes.
pub trait ResourceNodes: HexTopology {
    fn resource_node(&self, cell: CellId) -> Option<ResourceNode>;
    fn set_resource_node(&mut self, cell: CellId, node: Option<ResourceNode>);
}

/// Everything the generator needs from the grid.
pub trait MapGrid: CellMutation + RiverCanon + ResourceNodes {}

impl<T: CellMutation + RiverCanon + ResourceNodes> MapGrid for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_rotation_wraps() {
        assert_eq!(HexDirection::NW.next(), HexDirection::NE);
        assert_eq!(HexDirection::NE.previous(), HexDirection::NW);
        assert_eq!(HexDirection::E.opposite(), HexDirection::W);
        assert_eq!(HexDirection::SW.rotated(-4), HexDirection::NW);
        for dir in HexDirection::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.steps_to(dir.opposite()), 3);
            assert_eq!(dir.axial_offset() + dir.opposite().axial_offset(), IVec2::ZERO);
        }
    }
}
