use gc_results::{DivergenceRow, IterationRow, ResultsError, RunManifest, RunStore};

fn manifest(run_id: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        scenario_name: "store test".to_string(),
        timestamp: "2026-01-01T00:00:00Z".to_string(),
        tool_version: "0.1.0".to_string(),
        steps: 3,
        coupling_points: vec!["N15".to_string()],
        divergent_steps: 1,
    }
}

#[test]
fn save_and_reload_run() {
    let root = std::env::temp_dir().join("gc_results_store_test");
    let store = RunStore::new(root).unwrap();
    let m = manifest("run-a");
    let iterations = vec![
        IterationRow {
            date: "2026-01-01 01:00:00".to_string(),
            step: 1,
            iterations: 3,
        },
        IterationRow {
            date: "2026-01-01 02:00:00".to_string(),
            step: 2,
            iterations: 20,
        },
    ];
    let divergences = vec![DivergenceRow {
        date: "2026-01-01 02:00:00".to_string(),
        step: 2,
        iterations_at_abort: 20,
    }];

    let dir = store.save_run(&m, &iterations, &divergences).unwrap();
    assert!(dir.ends_with("run-a"));
    assert!(store.has_run("run-a"));
    assert_eq!(store.load_manifest("run-a").unwrap(), m);
    assert_eq!(store.load_iterations("run-a").unwrap(), iterations);
    assert_eq!(store.load_divergences("run-a").unwrap(), divergences);
    assert!(
        store
            .list_runs("store test")
            .unwrap()
            .iter()
            .any(|r| r.run_id == "run-a")
    );

    store.delete_run("run-a").unwrap();
    assert!(!store.has_run("run-a"));
}

#[test]
fn missing_run_is_reported() {
    let store = RunStore::new(std::env::temp_dir().join("gc_results_store_missing")).unwrap();
    assert!(matches!(
        store.load_manifest("nope"),
        Err(ResultsError::RunNotFound { .. })
    ));
}
