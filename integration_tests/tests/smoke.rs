mod common;

use core_mapgen::{build_generation_app, GeneratedMap, GenerationMetrics, MapGenConfigMetadata};

#[test]
fn app_generates_map_on_first_update() {
    common::ensure_test_config();
    let mut app = build_generation_app(42);
    app.update();

    let metadata = app.world.resource::<MapGenConfigMetadata>();
    assert_eq!(metadata.path(), Some(common::fixture_path().as_path()));

    let generated = app.world.resource::<GeneratedMap>();
    assert_eq!(generated.seed, 42);
    assert_eq!(generated.homelands.len(), 2);
    let land = generated.report.land_cells;

    let metrics = app.world.resource::<GenerationMetrics>();
    assert_eq!(metrics.seed, 42);
    assert_eq!(metrics.grid_size, (32, 24));
    assert_eq!(metrics.land_cells, land);
    assert!(metrics.land_cells > 0);
}

#[test]
fn later_updates_keep_the_same_map() {
    common::ensure_test_config();
    let mut app = build_generation_app(7);
    app.update();
    let first = app.world.resource::<GeneratedMap>().map.snapshots().to_vec();
    app.update();
    app.update();
    let later = app.world.resource::<GeneratedMap>().map.snapshots().to_vec();
    assert_eq!(first, later);
}
