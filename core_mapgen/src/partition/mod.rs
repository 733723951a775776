//! Section partition of the grid and the section-to-chunk grouping.

mod chunks;

use std::collections::{BTreeSet, VecDeque};

use bevy::prelude::{IVec2, UVec2};
use tracing::debug;

pub use chunks::{divide_into_chunks, ChunkRequest, ChunkWeight, CompactChunkWeight};

use crate::{
    error::MapGenError,
    grid::{CellId, HexTopology},
    rng::GenerationRng,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub u32);

impl SectionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Smallest spatial partition unit.
#[derive(Debug, Clone)]
pub struct Section {
    pub id: SectionId,
    pub cells: Vec<CellId>,
    /// Member cell closest to the mean offset of all members.
    pub centroid: CellId,
}

impl Section {
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

/// Soft band along the map edge that chunk seeds avoid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapBorder {
    pub soft: u32,
}

impl MapBorder {
    pub fn new(soft: u32) -> Self {
        Self { soft }
    }

    pub fn contains(&self, dimensions: UVec2, offset: IVec2) -> bool {
        let soft = self.soft as i32;
        offset.x < soft
            || offset.y < soft
            || offset.x >= dimensions.x as i32 - soft
            || offset.y >= dimensions.y as i32 - soft
    }

    pub fn contains_cell<T: HexTopology + ?Sized>(&self, topology: &T, cell: CellId) -> bool {
        self.contains(topology.dimensions(), topology.offset_of(cell))
    }
}

/// Graph of sections covering every cell of the grid exactly once.
#[derive(Debug, Clone)]
pub struct GridPartition {
    sections: Vec<Section>,
    cell_section: Vec<SectionId>,
    neighbors: Vec<Vec<SectionId>>,
}

impl GridPartition {
    /// Seed one jittered point per `section_size` block and grow all seeds
    /// breadth-first until every cell is claimed.
    pub fn build<T: HexTopology + ?Sized>(
        topology: &T,
        section_size: u32,
        rng: &mut GenerationRng,
    ) -> Result<Self, MapGenError> {
        if section_size == 0 {
            return Err(MapGenError::InvalidRequest("section size must be positive"));
        }
        let dims = topology.dimensions();
        let total = topology.cell_count();
        if total == 0 {
            return Err(MapGenError::InvalidRequest("grid has no cells"));
        }

        let mut owner: Vec<Option<SectionId>> = vec![None; total];
        let mut growth = VecDeque::new();
        let mut members: Vec<Vec<CellId>> = Vec::new();

        for block_z in (0..dims.y).step_by(section_size as usize) {
            for block_x in (0..dims.x).step_by(section_size as usize) {
                let span_x = section_size.min(dims.x - block_x) as usize;
                let span_z = section_size.min(dims.y - block_z) as usize;
                let x = block_x as i32 + rng.index(span_x) as i32;
                let z = block_z as i32 + rng.index(span_z) as i32;
                let Some(seed) = topology.cell_at_offset(x, z) else {
                    continue;
                };
                let id = SectionId(members.len() as u32);
                owner[seed.index()] = Some(id);
                members.push(vec![seed]);
                growth.push_back((seed, id));
            }
        }

        while let Some((cell, id)) = growth.pop_front() {
            for neighbor in topology.neighbors(cell) {
                if owner[neighbor.index()].is_some() {
                    continue;
                }
                owner[neighbor.index()] = Some(id);
                members[id.index()].push(neighbor);
                growth.push_back((neighbor, id));
            }
        }

        // A disconnected topology can leave cells unreached; give each such
        // cell a section of its own so coverage stays total.
        for idx in 0..total {
            if owner[idx].is_none() {
                let id = SectionId(members.len() as u32);
                owner[idx] = Some(id);
                members.push(vec![CellId(idx as u32)]);
            }
        }

        let cell_section: Vec<SectionId> = owner.into_iter().flatten().collect();
        let mut neighbor_sets: Vec<BTreeSet<SectionId>> = vec![BTreeSet::new(); members.len()];
        for cell in topology.all_cells() {
            let own = cell_section[cell.index()];
            for neighbor in topology.neighbors(cell) {
                let other = cell_section[neighbor.index()];
                if other != own {
                    neighbor_sets[own.index()].insert(other);
                }
            }
        }

        let sections: Vec<Section> = members
            .into_iter()
            .enumerate()
            .map(|(idx, cells)| {
                let centroid = centroid_of(topology, &cells);
                Section {
                    id: SectionId(idx as u32),
                    cells,
                    centroid,
                }
            })
            .collect();

        debug!(
            target: "core_mapgen::partition",
            sections = sections.len(),
            section_size,
            "partition.built"
        );

        Ok(Self {
            sections,
            cell_section,
            neighbors: neighbor_sets
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, id: SectionId) -> &Section {
        &self.sections[id.index()]
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|s| s.id).collect()
    }

    pub fn section_of(&self, cell: CellId) -> Option<SectionId> {
        self.cell_section.get(cell.index()).copied()
    }

    pub fn neighbors(&self, id: SectionId) -> &[SectionId] {
        &self.neighbors[id.index()]
    }

    pub fn are_neighbors(&self, a: SectionId, b: SectionId) -> bool {
        self.neighbors(a).contains(&b)
    }

    pub fn cells_of(&self, ids: &[SectionId]) -> Vec<CellId> {
        ids.iter()
            .flat_map(|id| self.section(*id).cells.iter().copied())
            .collect()
    }
}

pub(crate) fn centroid_of<T: HexTopology + ?Sized>(topology: &T, cells: &[CellId]) -> CellId {
    let sum = cells
        .iter()
        .fold(IVec2::ZERO, |acc, cell| acc + topology.offset_of(*cell));
    let count = cells.len().max(1) as f32;
    let mean_x = sum.x as f32 / count;
    let mean_z = sum.y as f32 / count;
    cells
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = squared_offset(topology.offset_of(*a), mean_x, mean_z);
            let db = squared_offset(topology.offset_of(*b), mean_x, mean_z);
            da.total_cmp(&db).then_with(|| a.cmp(b))
        })
        .unwrap_or(CellId(0))
}

fn squared_offset(offset: IVec2, x: f32, z: f32) -> f32 {
    let dx = offset.x as f32 - x;
    let dz = offset.y as f32 - z;
    dx * dx + dz * dz
}
