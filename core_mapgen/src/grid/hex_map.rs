use bevy::prelude::{IVec2, UVec2};

use super::{CellId, CellMutation, HexDirection, HexTopology, ResourceNodes, RiverCanon};
use crate::{
    cell::{CellSnapshot, Feature, ResourceNode, RiverFlow, Shape, Terrain, Vegetation},
    error::MapGenError,
};

/// Odd-row offset hex grid holding every cell's state.
///
/// Rows (`z`) run south to north; odd rows are shifted half a cell east.
#[derive(Debug, Clone)]
pub struct HexMap {
    dimensions: UVec2,
    cells: Vec<CellSnapshot>,
}

impl HexMap {
    pub fn new(width: u32, height: u32, fill: CellSnapshot) -> Self {
        let total = (width as usize).saturating_mul(height as usize);
        Self {
            dimensions: UVec2::new(width, height),
            cells: vec![fill; total],
        }
    }

    pub fn ocean(width: u32, height: u32) -> Self {
        Self::new(width, height, CellSnapshot::ocean())
    }

    /// Overwrite a cell without any validation. Meant for fixtures and for
    /// stamping the initial land mask.
    pub fn set_cell(&mut self, cell: CellId, snapshot: CellSnapshot) {
        if let Some(slot) = self.cells.get_mut(cell.index()) {
            *slot = snapshot;
        }
    }

    pub fn snapshots(&self) -> &[CellSnapshot] {
        &self.cells
    }

    pub fn land_cells(&self) -> Vec<CellId> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_land())
            .map(|(idx, _)| CellId(idx as u32))
            .collect()
    }

    /// Axial `(q, r)` coordinates of a cell.
    pub fn axial_of(&self, cell: CellId) -> IVec2 {
        let offset = self.offset_of(cell);
        IVec2::new(offset.x - (offset.y >> 1), offset.y)
    }

    fn cell_at_axial(&self, axial: IVec2) -> Option<CellId> {
        self.cell_at_offset(axial.x + (axial.y >> 1), axial.y)
    }

    fn snapshot(&self, cell: CellId) -> CellSnapshot {
        self.cells
            .get(cell.index())
            .copied()
            .unwrap_or_else(CellSnapshot::ocean)
    }

    fn slot(&mut self, cell: CellId) -> Option<&mut CellSnapshot> {
        self.cells.get_mut(cell.index())
    }
}

pub(crate) fn vegetation_fits(vegetation: Vegetation, terrain: Terrain, shape: Shape) -> bool {
    if terrain.is_water() {
        return vegetation == Vegetation::None;
    }
    match vegetation {
        Vegetation::None => true,
        Vegetation::Forest => {
            matches!(terrain, Terrain::Grassland | Terrain::Plains | Terrain::Tundra)
                && shape != Shape::Mountains
        }
        Vegetation::Jungle => {
            matches!(terrain, Terrain::Grassland | Terrain::Plains) && shape != Shape::Mountains
        }
        Vegetation::Marsh => {
            matches!(terrain, Terrain::Grassland | Terrain::Plains) && shape == Shape::Flatlands
        }
    }
}

impl HexTopology for HexMap {
    fn dimensions(&self) -> UVec2 {
        self.dimensions
    }

    fn neighbor(&self, cell: CellId, direction: HexDirection) -> Option<CellId> {
        if cell.index() >= self.cells.len() {
            return None;
        }
        self.cell_at_axial(self.axial_of(cell) + direction.axial_offset())
    }

    fn distance(&self, a: CellId, b: CellId) -> u32 {
        let delta = self.axial_of(a) - self.axial_of(b);
        let s = -delta.x - delta.y;
        ((delta.x.abs() + delta.y.abs() + s.abs()) / 2) as u32
    }

    fn cell_at_offset(&self, x: i32, z: i32) -> Option<CellId> {
        if x < 0 || z < 0 || x >= self.dimensions.x as i32 || z >= self.dimensions.y as i32 {
            return None;
        }
        Some(CellId(z as u32 * self.dimensions.x + x as u32))
    }

    fn offset_of(&self, cell: CellId) -> IVec2 {
        let width = self.dimensions.x.max(1);
        IVec2::new((cell.0 % width) as i32, (cell.0 / width) as i32)
    }

    fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl CellMutation for HexMap {
    fn cell(&self, cell: CellId) -> CellSnapshot {
        self.snapshot(cell)
    }

    fn can_change_terrain(&self, cell: CellId, terrain: Terrain) -> bool {
        if cell.index() >= self.cells.len() {
            return false;
        }
        let current = self.snapshot(cell);
        if terrain.is_water() {
            return current.resource.is_none()
                && !current.has_river()
                && current.vegetation == Vegetation::None
                && current.feature == Feature::None;
        }
        if terrain == Terrain::FloodPlains {
            return matches!(current.terrain, Terrain::Desert | Terrain::FloodPlains)
                && current.shape == Shape::Flatlands
                && current.feature == Feature::None;
        }
        if current.feature == Feature::Oasis && terrain != Terrain::Desert {
            return false;
        }
        vegetation_fits(current.vegetation, terrain, current.shape)
    }

    fn change_terrain(&mut self, cell: CellId, terrain: Terrain) -> Result<(), MapGenError> {
        if !self.can_change_terrain(cell, terrain) {
            return Err(MapGenError::MutationRejected {
                cell,
                change: "terrain",
            });
        }
        if let Some(slot) = self.slot(cell) {
            slot.terrain = terrain;
            if terrain.is_water() {
                slot.shape = Shape::Flatlands;
            }
        }
        Ok(())
    }

    fn can_change_shape(&self, cell: CellId, shape: Shape) -> bool {
        if cell.index() >= self.cells.len() {
            return false;
        }
        let current = self.snapshot(cell);
        if shape == Shape::Flatlands {
            return true;
        }
        if current.is_water() || current.feature != Feature::None {
            return false;
        }
        if shape == Shape::Mountains && (current.resource.is_some() || current.has_river()) {
            return false;
        }
        current.terrain != Terrain::FloodPlains
            && vegetation_fits(current.vegetation, current.terrain, shape)
    }

    fn change_shape(&mut self, cell: CellId, shape: Shape) -> Result<(), MapGenError> {
        if !self.can_change_shape(cell, shape) {
            return Err(MapGenError::MutationRejected {
                cell,
                change: "shape",
            });
        }
        if let Some(slot) = self.slot(cell) {
            slot.shape = shape;
        }
        Ok(())
    }

    fn can_change_vegetation(&self, cell: CellId, vegetation: Vegetation) -> bool {
        if cell.index() >= self.cells.len() {
            return false;
        }
        let current = self.snapshot(cell);
        if vegetation != Vegetation::None && current.feature != Feature::None {
            return false;
        }
        vegetation_fits(vegetation, current.terrain, current.shape)
    }

    fn change_vegetation(
        &mut self,
        cell: CellId,
        vegetation: Vegetation,
    ) -> Result<(), MapGenError> {
        if !self.can_change_vegetation(cell, vegetation) {
            return Err(MapGenError::MutationRejected {
                cell,
                change: "vegetation",
            });
        }
        if let Some(slot) = self.slot(cell) {
            slot.vegetation = vegetation;
        }
        Ok(())
    }

    fn can_change_feature(&self, cell: CellId, feature: Feature) -> bool {
        if cell.index() >= self.cells.len() {
            return false;
        }
        let current = self.snapshot(cell);
        match feature {
            Feature::None => true,
            Feature::Oasis => {
                current.terrain == Terrain::Desert
                    && current.shape == Shape::Flatlands
                    && current.vegetation == Vegetation::None
                    && current.resource.is_none()
                    && !current.has_river()
            }
        }
    }

    fn change_feature(&mut self, cell: CellId, feature: Feature) -> Result<(), MapGenError> {
        if !self.can_change_feature(cell, feature) {
            return Err(MapGenError::MutationRejected {
                cell,
                change: "feature",
            });
        }
        if let Some(slot) = self.slot(cell) {
            slot.feature = feature;
        }
        Ok(())
    }
}

impl RiverCanon for HexMap {
    fn has_river(&self, cell: CellId) -> bool {
        self.snapshot(cell).has_river()
    }

    fn flow_at_edge(&self, cell: CellId, direction: HexDirection) -> Option<RiverFlow> {
        self.cells
            .get(cell.index())
            .and_then(|c| c.rivers[direction.index()])
    }

    fn can_add_river(&self, cell: CellId, direction: HexDirection, flow: RiverFlow) -> bool {
        let Some(neighbor) = self.neighbor(cell, direction) else {
            return false;
        };
        if self.snapshot(cell).is_water() || self.snapshot(neighbor).is_water() {
            return false;
        }
        match self.flow_at_edge(cell, direction) {
            None => true,
            Some(existing) => existing == flow,
        }
    }

    fn add_river(
        &mut self,
        cell: CellId,
        direction: HexDirection,
        flow: RiverFlow,
    ) -> Result<(), MapGenError> {
        let neighbor = match self.neighbor(cell, direction) {
            Some(n) if self.can_add_river(cell, direction, flow) => n,
            _ => return Err(MapGenError::RiverRejected { cell, direction }),
        };
        if let Some(slot) = self.slot(cell) {
            slot.rivers[direction.index()] = Some(flow);
        }
        if let Some(slot) = self.slot(neighbor) {
            slot.rivers[direction.opposite().index()] = Some(flow.opposite());
        }
        Ok(())
    }
}

impl ResourceNodes for HexMap {
    fn resource_node(&self, cell: CellId) -> Option<ResourceNode> {
        self.cells.get(cell.index()).and_then(|c| c.resource)
    }

    fn set_resource_node(&mut self, cell: CellId, node: Option<ResourceNode>) {
        if let Some(slot) = self.slot(cell) {
            slot.resource = node;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn land_map(width: u32, height: u32) -> HexMap {
        HexMap::new(
            width,
            height,
            CellSnapshot::new(Terrain::Grassland, Shape::Flatlands),
        )
    }

    #[test]
    fn neighbors_are_symmetric() {
        let map = land_map(7, 6);
        for cell in map.all_cells() {
            for dir in HexDirection::ALL {
                if let Some(n) = map.neighbor(cell, dir) {
                    assert_eq!(map.neighbor(n, dir.opposite()), Some(cell));
                    assert_eq!(map.distance(cell, n), 1);
                }
            }
        }
    }

    #[test]
    fn interior_cell_has_six_neighbors() {
        let map = land_map(5, 5);
        let center = map.cell_at_offset(2, 2).unwrap();
        assert_eq!(map.neighbors(center).len(), 6);
        let corner = map.cell_at_offset(0, 0).unwrap();
        assert!(map.neighbors(corner).len() < 6);
    }

    #[test]
    fn radius_matches_hex_count() {
        let map = land_map(11, 11);
        let center = map.cell_at_offset(5, 5).unwrap();
        assert_eq!(map.cells_in_radius(center, 0), vec![center]);
        assert_eq!(map.cells_in_radius(center, 1).len(), 7);
        assert_eq!(map.cells_in_radius(center, 2).len(), 19);
    }

    #[test]
    fn river_edge_is_shared_with_opposite_flow() {
        let mut map = land_map(4, 4);
        let cell = map.cell_at_offset(1, 1).unwrap();
        let neighbor = map.neighbor(cell, HexDirection::E).unwrap();
        map.add_river(cell, HexDirection::E, RiverFlow::Clockwise)
            .unwrap();
        assert_eq!(
            map.flow_at_edge(neighbor, HexDirection::W),
            Some(RiverFlow::Counterclockwise)
        );
        assert!(!map.can_add_river(cell, HexDirection::E, RiverFlow::Counterclockwise));
        assert!(map.can_add_river(cell, HexDirection::E, RiverFlow::Clockwise));
    }

    #[test]
    fn rivers_need_land_on_both_sides() {
        let mut map = land_map(4, 4);
        let cell = map.cell_at_offset(1, 1).unwrap();
        let neighbor = map.neighbor(cell, HexDirection::E).unwrap();
        map.set_cell(neighbor, CellSnapshot::ocean());
        assert!(map
            .add_river(cell, HexDirection::E, RiverFlow::Clockwise)
            .is_err());
    }

    #[test]
    fn flood_plains_only_on_flat_desert() {
        let mut map = land_map(3, 3);
        let cell = CellId(4);
        assert!(!map.can_change_terrain(cell, Terrain::FloodPlains));
        map.change_terrain(cell, Terrain::Desert).unwrap();
        assert!(map.can_change_terrain(cell, Terrain::FloodPlains));
        map.change_shape(cell, Shape::Hills).unwrap();
        assert!(!map.can_change_terrain(cell, Terrain::FloodPlains));
    }

    #[test]
    fn rejected_mutation_leaves_cell_untouched() {
        let mut map = land_map(3, 3);
        let cell = CellId(4);
        let before = map.cell(cell);
        assert!(map.change_feature(cell, Feature::Oasis).is_err());
        assert_eq!(map.cell(cell), before);
    }
}
