/// Integration tests for configuration loading and saving
use cladeflow_core::config::{default_config, load_config, save_config};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_loading_from_multiple_sources() {
    let dir = TempDir::new().unwrap();

    let home_config = dir.path().join("config.toml");
    let project_config = dir.path().join("project.toml");

    fs::write(
        &home_config,
        r#"
[pool]
units = 2

[logging]
level = "info"
"#,
    )
    .unwrap();

    fs::write(
        &project_config,
        r#"
[pool]
units = 8
init_timeout_secs = 10

[autodetect]
all_matches = true
"#,
    )
    .unwrap();

    let config1 = load_config(&home_config).unwrap();
    assert_eq!(config1.pool.units, 2);
    assert_eq!(config1.pool.init_timeout_secs, 60);
    assert_eq!(config1.logging.level, "info");

    let config2 = load_config(&project_config).unwrap();
    assert_eq!(config2.pool.units, 8);
    assert_eq!(config2.pool.init_timeout_secs, 10);
    assert!(config2.autodetect.all_matches);
    assert_eq!(config2.logging.level, "warn");
}

#[test]
fn test_saved_config_is_readable_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cladeflow.toml");

    save_config(&path, &default_config()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("[pool]"));
    assert!(text.contains("concurrency_per_unit = 1"));
    assert!(text.contains("[autodetect]"));

    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded.analysis.max_pending_tasks, 512);
}

#[test]
fn test_unknown_sections_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cladeflow.toml");
    fs::write(&path, "[something_else]\nkey = 1\n").unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.pool.concurrency_per_unit, 1);
}
