use coralai_app::{AppConfig, ConfigError, Session};
use tempfile::tempdir;

#[test]
fn json_config_drives_a_full_run() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("run.json");
    std::fs::write(
        &path,
        r#"{
            "world": {"width": 12, "height": 12},
            "organism": {"rng_seed": 42},
            "run": {
                "steps": 10,
                "log_interval": 5,
                "perturb_interval": 3,
                "brushes": [
                    {"key": "energy", "x": 6, "y": 6, "radius": 4, "value": 1.0},
                    {"key": ["com", "a"], "x": 0, "y": 0, "radius": 2, "value": 0.5}
                ]
            }
        }"#,
    )
    .expect("write config");
    let config = AppConfig::load(&path).expect("load");

    let mut session = Session::new(config.clone()).expect("session");
    let report = session.run().expect("run");
    assert_eq!(report.steps, 10);
    assert_eq!(report.summaries.len(), 2);
    assert!(
        report
            .final_stats
            .values()
            .all(|stats| stats.min.is_finite() && stats.max.is_finite())
    );

    let mut again = Session::new(config).expect("session");
    assert_eq!(again.run().expect("run"), report);

    let json = serde_json::to_value(&report).expect("report json");
    assert_eq!(json["layout"][3]["channel"], "com");
    assert_eq!(json["layout"][3]["subchannel"], "a");
}

#[test]
fn missing_file_and_bad_wiring_surface_errors() {
    let dir = tempdir().expect("tempdir");
    assert!(matches!(
        AppConfig::load(&dir.path().join("missing.json")),
        Err(ConfigError::Io { .. })
    ));

    let typo = dir.path().join("typo.json");
    std::fs::write(&typo, r#"{"run": {"brushes": [{"key": "energy", "x": "left"}]}}"#)
        .expect("write config");
    match AppConfig::load(&typo) {
        Err(ConfigError::InvalidValue { path, .. }) => assert_eq!(path, "run.brushes[0].x"),
        other => panic!("expected a field error, got {other:?}"),
    }

    let mut config = AppConfig::default();
    config.world.width = 8;
    config.world.height = 8;
    config.organism.n_actuators = 5;
    assert!(matches!(
        Session::new(config),
        Err(ConfigError::Organism(_))
    ));
}
