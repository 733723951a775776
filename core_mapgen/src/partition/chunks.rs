use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::{GridPartition, MapBorder, SectionId};
use crate::{error::MapGenError, grid::HexTopology, rng::GenerationRng, sampling};

/// Reshuffles tried when picking separated chunk seeds.
const SEED_ATTEMPTS: usize = 16;
/// Growth iterations allowed per candidate section.
const GROWTH_ITERATIONS_PER_SECTION: usize = 10;

#[derive(Debug, Clone)]
pub struct ChunkRequest {
    pub chunk_count: usize,
    pub max_cells_per_chunk: usize,
    /// Minimum hex distance between the centroids of any two chunk seeds.
    pub min_seed_separation: u32,
    pub border: MapBorder,
    /// Attach sections left unassigned after growth to an adjacent chunk.
    pub assign_orphans: bool,
}

/// Preference for adding `candidate` to a growing chunk. Non-positive
/// weights are never chosen.
pub trait ChunkWeight {
    fn weight<T: HexTopology + ?Sized>(
        &self,
        topology: &T,
        partition: &GridPartition,
        candidate: SectionId,
        chunk: &[SectionId],
    ) -> f64;
}

/// Default chunk growth weight: close to the chunk seed, away from the map
/// border, and touching many sections already in the chunk.
#[derive(Debug, Clone)]
pub struct CompactChunkWeight {
    pub border: MapBorder,
    pub base: f64,
    pub border_penalty: f64,
    pub neighbor_bonus: f64,
}

impl CompactChunkWeight {
    pub fn new(border: MapBorder) -> Self {
        Self {
            border,
            base: 20.0,
            border_penalty: 12.0,
            neighbor_bonus: 4.0,
        }
    }
}

impl ChunkWeight for CompactChunkWeight {
    fn weight<T: HexTopology + ?Sized>(
        &self,
        topology: &T,
        partition: &GridPartition,
        candidate: SectionId,
        chunk: &[SectionId],
    ) -> f64 {
        let centroid = partition.section(candidate).centroid;
        let distance = chunk
            .first()
            .map(|seed| topology.distance(centroid, partition.section(*seed).centroid))
            .unwrap_or(0) as f64;
        let in_chunk = partition
            .neighbors(candidate)
            .iter()
            .filter(|n| chunk.contains(*n))
            .count() as f64;
        let mut score = self.base - distance + self.neighbor_bonus * in_chunk;
        if self.border.contains_cell(topology, centroid) {
            score -= self.border_penalty;
        }
        score.max(1.0)
    }
}

/// Group `sections` into `request.chunk_count` contiguous chunks.
///
/// Each returned chunk starts with its seed section. Sections that no chunk
/// reaches stay unassigned unless `assign_orphans` is set.
pub fn divide_into_chunks<T, W>(
    topology: &T,
    partition: &GridPartition,
    sections: &[SectionId],
    request: &ChunkRequest,
    weight: &W,
    rng: &mut GenerationRng,
) -> Result<Vec<Vec<SectionId>>, MapGenError>
where
    T: HexTopology + ?Sized,
    W: ChunkWeight,
{
    if request.chunk_count == 0 {
        return Err(MapGenError::InvalidRequest("chunk count must be positive"));
    }
    if request.max_cells_per_chunk == 0 {
        return Err(MapGenError::InvalidRequest(
            "max cells per chunk must be positive",
        ));
    }

    let seeds = pick_seeds(topology, partition, sections, request, rng)?;

    let candidates: BTreeSet<SectionId> = sections.iter().copied().collect();
    let mut assigned: BTreeMap<SectionId, usize> = BTreeMap::new();
    let mut chunks: Vec<Vec<SectionId>> = Vec::with_capacity(seeds.len());
    let mut sizes: Vec<usize> = Vec::with_capacity(seeds.len());
    for (idx, seed) in seeds.iter().enumerate() {
        assigned.insert(*seed, idx);
        chunks.push(vec![*seed]);
        sizes.push(partition.section(*seed).cell_count());
    }

    let mut open: Vec<usize> = (0..chunks.len())
        .filter(|idx| sizes[*idx] < request.max_cells_per_chunk)
        .collect();
    let cap = candidates.len().max(1) * GROWTH_ITERATIONS_PER_SECTION;
    let mut iterations = 0;
    while !open.is_empty() && iterations < cap {
        iterations += 1;
        let slot = rng.index(open.len());
        let chunk_idx = open[slot];

        let frontier: Vec<SectionId> = chunks[chunk_idx]
            .iter()
            .flat_map(|id| partition.neighbors(*id).iter().copied())
            .filter(|n| candidates.contains(n) && !assigned.contains_key(n))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let chunk = &chunks[chunk_idx];
        let choice = sampling::sample_one(rng, &frontier, |candidate| {
            weight.weight(topology, partition, *candidate, chunk)
        });
        let Some(next) = choice else {
            open.swap_remove(slot);
            continue;
        };
        assigned.insert(next, chunk_idx);
        chunks[chunk_idx].push(next);
        sizes[chunk_idx] += partition.section(next).cell_count();
        if sizes[chunk_idx] >= request.max_cells_per_chunk {
            open.swap_remove(slot);
        }
    }

    if request.assign_orphans {
        assign_orphans(partition, &candidates, &mut assigned, &mut chunks, rng)?;
    }

    info!(
        target: "core_mapgen::partition",
        chunks = chunks.len(),
        iterations,
        unassigned = candidates.len() - assigned.len(),
        "partition.chunks_divided"
    );
    Ok(chunks)
}

fn pick_seeds<T: HexTopology + ?Sized>(
    topology: &T,
    partition: &GridPartition,
    sections: &[SectionId],
    request: &ChunkRequest,
    rng: &mut GenerationRng,
) -> Result<Vec<SectionId>, MapGenError> {
    let mut eligible: Vec<SectionId> = sections
        .iter()
        .copied()
        .filter(|id| {
            !request
                .border
                .contains_cell(topology, partition.section(*id).centroid)
        })
        .collect();
    eligible.sort();
    eligible.dedup();

    let mut best: Vec<SectionId> = Vec::new();
    for attempt in 0..SEED_ATTEMPTS {
        rng.shuffle(&mut eligible);
        let mut picked: Vec<SectionId> = Vec::with_capacity(request.chunk_count);
        for candidate in &eligible {
            let centroid = partition.section(*candidate).centroid;
            let separated = picked.iter().all(|other| {
                topology.distance(centroid, partition.section(*other).centroid)
                    >= request.min_seed_separation
            });
            if separated {
                picked.push(*candidate);
                if picked.len() == request.chunk_count {
                    return Ok(picked);
                }
            }
        }
        debug!(
            target: "core_mapgen::partition",
            attempt,
            found = picked.len(),
            requested = request.chunk_count,
            "partition.seed_attempt_short"
        );
        if picked.len() > best.len() {
            best = picked;
        }
    }

    Err(MapGenError::NoValidStartingSection {
        found: best.len(),
        requested: request.chunk_count,
        min_separation: request.min_seed_separation,
    })
}

fn assign_orphans(
    partition: &GridPartition,
    candidates: &BTreeSet<SectionId>,
    assigned: &mut BTreeMap<SectionId, usize>,
    chunks: &mut [Vec<SectionId>],
    rng: &mut GenerationRng,
) -> Result<(), MapGenError> {
    loop {
        let orphans: Vec<SectionId> = candidates
            .iter()
            .copied()
            .filter(|id| !assigned.contains_key(id))
            .collect();
        if orphans.is_empty() {
            return Ok(());
        }

        let mut progressed = false;
        for orphan in &orphans {
            let adjacent: Vec<usize> = partition
                .neighbors(*orphan)
                .iter()
                .filter_map(|n| assigned.get(n).copied())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if let Some(&chunk_idx) = rng.choose(&adjacent) {
                assigned.insert(*orphan, chunk_idx);
                chunks[chunk_idx].push(*orphan);
                progressed = true;
            }
        }

        if !progressed {
            let section = orphans[0];
            return Err(MapGenError::OrphanSection { section: section.0 });
        }
    }
}
