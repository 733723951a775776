//! Coastal shallows and enclosed lakes.

use std::collections::HashSet;

use tracing::info;

use crate::{
    cell::Terrain,
    crawl::{Crawl, WaterMembership},
    error::MapGenError,
    grid::{CellId, MapGrid},
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoastReport {
    pub shallow_cells: usize,
    pub lakes: usize,
    pub lake_cells: usize,
    /// Size of every connected water body, largest first.
    pub water_bodies: Vec<usize>,
}

/// Connected water bodies, found with a [`WaterMembership`] crawl per
/// unvisited water cell.
pub fn water_bodies<G: MapGrid + ?Sized>(grid: &G) -> Vec<Vec<CellId>> {
    let water: HashSet<CellId> = grid
        .all_cells()
        .into_iter()
        .filter(|c| grid.is_water(*c))
        .collect();
    let mut ordered: Vec<CellId> = water.iter().copied().collect();
    ordered.sort_unstable();

    let mut seen: HashSet<CellId> = HashSet::with_capacity(water.len());
    let mut bodies = Vec::new();
    for seed in ordered {
        if seen.contains(&seed) {
            continue;
        }
        let body: Vec<CellId> =
            Crawl::new(grid, seed, &water, WaterMembership { grid }).collect();
        seen.extend(body.iter().copied());
        bodies.push(body);
    }
    bodies
}

/// Turn water bodies of at most `lake_max_size` cells into fresh water,
/// then make every other water cell that touches land shallow.
pub fn shape_coastline<G: MapGrid + ?Sized>(
    grid: &mut G,
    lake_max_size: usize,
) -> Result<CoastReport, MapGenError> {
    let mut report = CoastReport::default();
    let bodies = water_bodies(&*grid);
    let total_water: usize = bodies.iter().map(Vec::len).sum();

    for body in &bodies {
        report.water_bodies.push(body.len());
        // A body holding all the water is the ocean, however small.
        if body.len() > lake_max_size || body.len() == total_water {
            continue;
        }
        for cell in body {
            if grid.cell(*cell).terrain != Terrain::FreshWater
                && grid.can_change_terrain(*cell, Terrain::FreshWater)
            {
                grid.change_terrain(*cell, Terrain::FreshWater)?;
            }
        }
        report.lakes += 1;
        report.lake_cells += body.len();
    }
    report.water_bodies.sort_unstable_by(|a, b| b.cmp(a));

    let coastal: Vec<CellId> = grid
        .all_cells()
        .into_iter()
        .filter(|c| {
            grid.cell(*c).terrain == Terrain::DeepWater
                && grid.neighbors(*c).into_iter().any(|n| !grid.is_water(n))
        })
        .collect();
    for cell in coastal {
        if grid.can_change_terrain(cell, Terrain::ShallowWater) {
            grid.change_terrain(cell, Terrain::ShallowWater)?;
            report.shallow_cells += 1;
        }
    }

    info!(
        target: "core_mapgen::coast",
        bodies = report.water_bodies.len(),
        lakes = report.lakes,
        lake_cells = report.lake_cells,
        shallow = report.shallow_cells,
        "coast.shaped"
    );
    Ok(report)
}
