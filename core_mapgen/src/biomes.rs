//! Climate-driven terrain painting.

use std::cmp::Ordering;

use tracing::debug;

use crate::{
    cell::Terrain,
    climate::ClimateMap,
    error::MapGenError,
    grid::{CellId, MapGrid},
    region::Region,
    templates::BiomeTemplate,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BiomeReport {
    pub snow: usize,
    pub tundra: usize,
    pub desert: usize,
    pub grassland: usize,
    pub plains: usize,
}

fn descending(a: f32, b: f32) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Paint the region's land from its climate, filling the template's quotas
/// in order: snow and tundra on the coldest cells, desert on the hottest
/// and driest, grassland on the wettest of the rest, plains everywhere
/// else. Cells the grid refuses keep their terrain.
pub fn paint_biomes<G: MapGrid + ?Sized>(
    grid: &mut G,
    region: &Region,
    template: &BiomeTemplate,
    climate: &ClimateMap,
) -> Result<BiomeReport, MapGenError> {
    let mut remaining: Vec<CellId> = region
        .land()
        .iter()
        .copied()
        .filter(|c| !grid.is_water(*c))
        .collect();
    let total = remaining.len();
    let quota = |fraction: f32| (total as f32 * fraction.clamp(0.0, 1.0)).round() as usize;
    let mut report = BiomeReport::default();

    // Coldest first; ties broken by id so painting is stable.
    remaining.sort_by(|a, b| {
        climate
            .temperature(*a)
            .partial_cmp(&climate.temperature(*b))
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(b))
    });
    let snow = quota(template.snow).min(remaining.len());
    report.snow = paint(grid, remaining.drain(..snow), Terrain::Snow)?;
    let tundra = quota(template.tundra).min(remaining.len());
    report.tundra = paint(grid, remaining.drain(..tundra), Terrain::Tundra)?;

    remaining.sort_by(|a, b| {
        let heat = |c: &CellId| climate.temperature(*c) - climate.moisture(*c);
        descending(heat(a), heat(b)).then(a.cmp(b))
    });
    let desert = quota(template.desert).min(remaining.len());
    report.desert = paint(grid, remaining.drain(..desert), Terrain::Desert)?;

    remaining.sort_by(|a, b| descending(climate.moisture(*a), climate.moisture(*b)).then(a.cmp(b)));
    let grassland = quota(template.grassland).min(remaining.len());
    report.grassland = paint(grid, remaining.drain(..grassland), Terrain::Grassland)?;
    report.plains = paint(grid, remaining.drain(..), Terrain::Plains)?;

    debug!(
        target: "core_mapgen::biomes",
        region = region.id(),
        template = %template.name,
        snow = report.snow,
        tundra = report.tundra,
        desert = report.desert,
        grassland = report.grassland,
        plains = report.plains,
        "biomes.region_painted"
    );
    Ok(report)
}

fn paint<G, I>(grid: &mut G, cells: I, terrain: Terrain) -> Result<usize, MapGenError>
where
    G: MapGrid + ?Sized,
    I: Iterator<Item = CellId>,
{
    let mut painted = 0;
    for cell in cells {
        if grid.cell(cell).terrain == terrain {
            painted += 1;
        } else if grid.can_change_terrain(cell, terrain) {
            grid.change_terrain(cell, terrain)?;
            painted += 1;
        }
    }
    Ok(painted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cell::{CellSnapshot, Shape},
        grid::{CellMutation, HexMap, HexTopology},
    };

    fn climate_for(
        map: &HexMap,
        temperature: impl Fn(CellId) -> f32,
        moisture: impl Fn(CellId) -> f32,
    ) -> ClimateMap {
        let cells = map.all_cells();
        ClimateMap {
            moisture: cells.iter().map(|c| moisture(*c)).collect(),
            temperature: cells.iter().map(|c| temperature(*c)).collect(),
            precipitation: vec![0.0; cells.len()],
        }
    }

    #[test]
    fn quotas_land_on_matching_climate() {
        let mut map = HexMap::new(10, 10, CellSnapshot::new(Terrain::Grassland, Shape::Flatlands));
        let region = Region::new(&map, 0, map.all_cells(), Vec::new());
        // Temperature rises with the row, moisture with the column.
        let climate = climate_for(
            &map,
            |c| map.offset_of(c).y as f32 / 9.0,
            |c| map.offset_of(c).x as f32 / 9.0,
        );
        let template = BiomeTemplate {
            snow: 0.1,
            tundra: 0.1,
            desert: 0.1,
            grassland: 0.3,
            ..BiomeTemplate::default()
        };

        let report = paint_biomes(&mut map, &region, &template, &climate).unwrap();
        assert_eq!(
            report,
            BiomeReport {
                snow: 10,
                tundra: 10,
                desert: 10,
                grassland: 30,
                plains: 40,
            }
        );
        for x in 0..10 {
            let bottom = map.cell_at_offset(x, 0).unwrap();
            assert_eq!(map.cell(bottom).terrain, Terrain::Snow);
            let next = map.cell_at_offset(x, 1).unwrap();
            assert_eq!(map.cell(next).terrain, Terrain::Tundra);
        }
        // Hottest and driest corner is desert.
        let corner = map.cell_at_offset(0, 9).unwrap();
        assert_eq!(map.cell(corner).terrain, Terrain::Desert);
        // Wettest column among the leftovers is grassland.
        let wet = map.cell_at_offset(9, 5).unwrap();
        assert_eq!(map.cell(wet).terrain, Terrain::Grassland);
    }

    #[test]
    fn water_is_never_painted() {
        let mut map = HexMap::new(4, 4, CellSnapshot::new(Terrain::Plains, Shape::Flatlands));
        map.set_cell(CellId(5), CellSnapshot::ocean());
        let region = Region::new(&map, 0, map.all_cells(), Vec::new());
        let climate = climate_for(&map, |_| 0.0, |_| 0.0);
        let template = BiomeTemplate {
            snow: 1.0,
            ..BiomeTemplate::default()
        };
        let report = paint_biomes(&mut map, &region, &template, &climate).unwrap();
        assert_eq!(report.snow, 15);
        assert_eq!(map.cell(CellId(5)).terrain, Terrain::DeepWater);
    }
}
