mod common;

use std::collections::{HashMap, HashSet, VecDeque};

use core_mapgen::{
    rivers::Corner, CellId, CellMutation, GeneratedMap, HexDirection, HexMap, HexTopology,
    MapGenConfig, MapGenerator, ResourceNodes, RiverCanon, Shape, Terrain,
};

fn generate(seed: u64) -> (MapGenerator, GeneratedMap) {
    let generator = MapGenerator::new(common::test_config()).expect("fixture config is valid");
    let generated = generator.generate(seed).expect("fixture map generates");
    (generator, generated)
}

#[test]
fn every_cell_belongs_to_exactly_one_region() {
    let (_, generated) = generate(99);
    for cell in generated.map.all_cells() {
        let owners = generated
            .regions
            .iter()
            .filter(|r| r.contains(cell))
            .count();
        assert_eq!(owners, 1, "cell {cell:?} has {owners} owners");
    }
}

#[test]
fn river_edges_agree_from_both_sides() {
    let (_, generated) = generate(5);
    let map = &generated.map;
    for cell in map.all_cells() {
        for direction in HexDirection::ALL {
            let Some(flow) = map.flow_at_edge(cell, direction) else {
                continue;
            };
            assert!(!map.is_water(cell), "river on water cell {cell:?}");
            let neighbor = map
                .neighbor(cell, direction)
                .expect("river edges are interior");
            assert!(!map.is_water(neighbor));
            assert_eq!(
                map.flow_at_edge(neighbor, direction.opposite()),
                Some(flow.opposite())
            );
        }
    }
}

#[test]
fn resources_sit_on_valid_cells() {
    let (generator, generated) = generate(17);
    let map = &generated.map;
    let mut nodes = 0;
    for cell in map.all_cells() {
        let Some(node) = map.resource_node(cell) else {
            continue;
        };
        nodes += 1;
        let definition = generator
            .catalog()
            .get(node.resource)
            .expect("node refers to a catalog resource");
        let snapshot = map.cell(cell);
        assert!(definition.valid_terrains.contains(&snapshot.terrain));
        assert!(definition.valid_shapes.contains(&snapshot.shape));
    }
    assert!(nodes > 0);
}

#[test]
fn water_is_flat_and_climate_is_bounded() {
    let (_, generated) = generate(8);
    for cell in generated.map.all_cells() {
        let snapshot = generated.map.cell(cell);
        if snapshot.is_water() {
            assert_eq!(snapshot.shape, Shape::Flatlands);
        }
        let moisture = generated.climate.moisture(cell);
        assert!((0.0..=1.0).contains(&moisture), "moisture {moisture}");
    }
}

#[test]
fn homelands_start_on_dry_flat_land() {
    let (_, generated) = generate(31);
    assert_eq!(generated.homelands.len(), 2);
    for homeland in &generated.homelands {
        let start = homeland.starting_location;
        let snapshot = generated.map.cell(start);
        assert!(snapshot.is_land());
        assert_ne!(snapshot.terrain, Terrain::FloodPlains);
        assert_eq!(snapshot.shape, Shape::Flatlands);
        assert!(!generated.map.has_water_neighbor(start));
        assert!(!generated.map.has_river(start));
    }
    let distinct: std::collections::HashSet<_> = generated
        .homelands
        .iter()
        .map(|h| h.starting_location)
        .collect();
    assert_eq!(distinct.len(), 2);
}

#[test]
fn report_accounts_for_every_region() {
    let (_, generated) = generate(64);
    let homeland_regions: usize = generated.homelands.iter().map(|h| h.regions.len()).sum();
    assert_eq!(generated.report.regions.len(), homeland_regions);
    assert_eq!(generated.report.homelands.len(), generated.homelands.len());
    assert_eq!(
        generated.report.land_cells + generated.report.water_cells,
        generated.map.cell_count()
    );
    for region in &generated.report.regions {
        assert_eq!(
            region.balance.cell_count,
            generated.regions[region.region].cell_count()
        );
    }
}

fn generate_builtin(seed: u64) -> GeneratedMap {
    let generator = MapGenerator::new(MapGenConfig::builtin()).expect("builtin config is valid");
    generator.generate(seed).expect("builtin map generates")
}

#[test]
fn builtin_config_balances_most_regions() {
    let mut regions = 0;
    let mut balanced = 0;
    for seed in 0..8 {
        let generated = generate_builtin(seed);
        for report in &generated.report.regions {
            regions += 1;
            if report.balance.is_balanced() {
                balanced += 1;
            }
        }
    }
    assert!(regions > 0);
    assert!(
        balanced * 2 > regions,
        "only {balanced} of {regions} regions balanced"
    );
}

type Vertex = [Option<CellId>; 3];

fn vertex(map: &HexMap, cell: CellId, corner: Corner) -> Vertex {
    let [a, b] = corner.edges();
    let mut key = [Some(cell), map.neighbor(cell, a), map.neighbor(cell, b)];
    key.sort();
    key
}

/// Vertices joined by any river edge on the map.
fn river_network(map: &HexMap) -> HashMap<Vertex, Vec<Vertex>> {
    let mut network: HashMap<Vertex, Vec<Vertex>> = HashMap::new();
    for cell in map.all_cells() {
        for direction in HexDirection::ALL {
            if map.flow_at_edge(cell, direction).is_none() {
                continue;
            }
            let a = vertex(map, cell, Corner(direction.previous()));
            let b = vertex(map, cell, Corner(direction));
            network.entry(a).or_default().push(b);
            network.entry(b).or_default().push(a);
        }
    }
    network
}

fn reaches(
    network: &HashMap<Vertex, Vec<Vertex>>,
    from: Vertex,
    goal: impl Fn(&Vertex) -> bool,
) -> bool {
    let mut seen = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        if goal(&current) {
            return true;
        }
        for next in network.get(&current).into_iter().flatten() {
            if seen.insert(*next) {
                queue.push_back(*next);
            }
        }
    }
    false
}

#[test]
fn rivers_run_unbroken_to_water() {
    let mut checked = 0;
    for seed in 0..6 {
        let generated = generate_builtin(seed);
        let map = &generated.map;
        let network = river_network(map);
        let touches_water = |v: &Vertex| v.iter().flatten().any(|c| map.is_water(*c));
        for river in &generated.rivers {
            assert!(river.reached_water());
            for pair in river.edges.windows(2) {
                let end = vertex(map, pair[0].cell, pair[0].end());
                let start = vertex(map, pair[1].cell, pair[1].start());
                assert!(
                    reaches(&network, end, |v| *v == start),
                    "seed {seed}: gap between {:?} and {:?}",
                    pair[0],
                    pair[1]
                );
            }
            if let Some(last) = river.edges.last() {
                let end = vertex(map, last.cell, last.end());
                assert!(
                    reaches(&network, end, &touches_water),
                    "seed {seed}: river ending at {last:?} never meets water"
                );
            }
            checked += 1;
        }
    }
    assert!(checked > 0);
}
