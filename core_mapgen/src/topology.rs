//! Hills and mountains for one region.

use tracing::debug;

use crate::{
    cell::Shape,
    error::MapGenError,
    grid::{CellId, MapGrid},
    region::Region,
    rng::GenerationRng,
    sampling,
    templates::TopologyTemplate,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopologyReport {
    pub mountains: usize,
    pub hills: usize,
}

fn quota(land: usize, fraction: f32) -> usize {
    (land as f32 * fraction.clamp(0.0, 1.0)).round() as usize
}

/// Raise mountains in clustered ranges, then scatter hills that avoid each
/// other.
///
/// Both passes use [`sampling::sample_dynamic`]: a mountain's weight grows
/// with every adjacent mountain already picked, a hill's shrinks with every
/// adjacent hill.
pub fn generate_region_topology<G: MapGrid + ?Sized>(
    grid: &mut G,
    region: &Region,
    template: &TopologyTemplate,
    rng: &mut GenerationRng,
) -> Result<TopologyReport, MapGenError> {
    let land: Vec<CellId> = region
        .land()
        .iter()
        .copied()
        .filter(|c| !grid.is_water(*c))
        .collect();
    let mut report = TopologyReport::default();

    let mountain_candidates: Vec<CellId> = land
        .iter()
        .copied()
        .filter(|c| grid.can_change_shape(*c, Shape::Mountains))
        .collect();
    let clustering = template.mountain_clustering;
    let mountains = {
        let view = &*grid;
        sampling::sample_dynamic(
            rng,
            &mountain_candidates,
            quota(land.len(), template.mountains),
            |_| 1.0,
            |cell, picked| {
                let adjacent = view
                    .neighbors(*cell)
                    .into_iter()
                    .filter(|n| picked.contains(n))
                    .count();
                clustering * adjacent as f64
            },
            |cell| view.neighbors(*cell),
        )
    };
    for cell in mountains {
        if grid.can_change_shape(cell, Shape::Mountains) {
            grid.change_shape(cell, Shape::Mountains)?;
            report.mountains += 1;
        }
    }

    let hill_candidates: Vec<CellId> = land
        .iter()
        .copied()
        .filter(|c| {
            grid.cell(*c).shape == Shape::Flatlands && grid.can_change_shape(*c, Shape::Hills)
        })
        .collect();
    let spread = template.hills_spread;
    let hills = {
        let view = &*grid;
        sampling::sample_dynamic(
            rng,
            &hill_candidates,
            quota(land.len(), template.hills),
            |_| 1.0,
            |cell, picked| {
                let adjacent = view
                    .neighbors(*cell)
                    .into_iter()
                    .filter(|n| picked.contains(n))
                    .count();
                -spread * adjacent as f64
            },
            |cell| view.neighbors(*cell),
        )
    };
    for cell in hills {
        if grid.can_change_shape(cell, Shape::Hills) {
            grid.change_shape(cell, Shape::Hills)?;
            report.hills += 1;
        }
    }

    debug!(
        target: "core_mapgen::topology",
        region = region.id(),
        land = land.len(),
        mountains = report.mountains,
        hills = report.hills,
        "topology.region_generated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::{CellSnapshot, Terrain},
        grid::{CellMutation, HexMap, HexTopology},
    };

    fn region_of(map: &HexMap) -> Region {
        Region::new(map, 0, map.all_cells(), Vec::new())
    }

    #[test]
    fn quotas_follow_template_fractions() {
        let mut map = HexMap::new(10, 10, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
        let region = region_of(&map);
        let template = TopologyTemplate {
            hills: 0.2,
            mountains: 0.1,
            ..TopologyTemplate::default()
        };
        let mut rng = GenerationRng::new(8);

        let report = generate_region_topology(&mut map, &region, &template, &mut rng).unwrap();
        assert_eq!(report.mountains, 10);
        assert_eq!(report.hills, 20);
        let count = |shape| map.snapshots().iter().filter(|c| c.shape == shape).count();
        assert_eq!(count(Shape::Mountains), 10);
        assert_eq!(count(Shape::Hills), 20);
    }

    #[test]
    fn mountains_form_ranges() {
        let mut map = HexMap::new(16, 16, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
        let region = region_of(&map);
        let template = TopologyTemplate {
            hills: 0.0,
            mountains: 0.1,
            mountain_clustering: 50.0,
            ..TopologyTemplate::default()
        };
        let mut rng = GenerationRng::new(12);
        generate_region_topology(&mut map, &region, &template, &mut rng).unwrap();

        let mountains: Vec<CellId> = map
            .all_cells()
            .into_iter()
            .filter(|c| map.cell(*c).shape == Shape::Mountains)
            .collect();
        let clustered = mountains
            .iter()
            .filter(|c| {
                map.neighbors(**c)
                    .iter()
                    .any(|n| map.cell(*n).shape == Shape::Mountains)
            })
            .count();
        assert!(clustered * 2 > mountains.len());
    }

    #[test]
    fn water_cells_are_left_alone() {
        let mut map = HexMap::ocean(6, 6);
        let region = Region::new(&map, 0, Vec::new(), map.all_cells());
        let mut rng = GenerationRng::new(1);
        let report =
            generate_region_topology(&mut map, &region, &TopologyTemplate::default(), &mut rng)
                .unwrap();
        assert_eq!(report, TopologyReport::default());
        assert!(map.snapshots().iter().all(|c| c.shape == Shape::Flatlands));
    }
}
