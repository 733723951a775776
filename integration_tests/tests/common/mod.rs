#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Once};

use core_mapgen::MapGenConfig;

static INIT: Once = Once::new();

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("test_mapgen_config.json")
}

/// Point `MAPGEN_CONFIG_PATH` at the test fixture and install a log
/// subscriber honoring `RUST_LOG`.
pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixture_path();
        debug_assert!(
            config_path.exists(),
            "missing test mapgen config at {}",
            config_path.display()
        );
        std::env::set_var("MAPGEN_CONFIG_PATH", &config_path);
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn test_config() -> Arc<MapGenConfig> {
    let config = MapGenConfig::from_file(&fixture_path()).expect("fixture config loads");
    Arc::new(config)
}
