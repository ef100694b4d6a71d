use gc_project::{load_json, load_yaml, save_json, save_yaml};
use std::path::Path;

fn shipped() -> gc_project::Scenario {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios/two_points.yaml");
    load_yaml(&path).unwrap()
}

#[test]
fn roundtrip_yaml() {
    let scenario = shipped();
    let path = std::env::temp_dir().join("gc_project_roundtrip.yaml");
    save_yaml(&path, &scenario).unwrap();
    assert_eq!(load_yaml(&path).unwrap(), scenario);
}

#[test]
fn roundtrip_json() {
    let scenario = shipped();
    let path = std::env::temp_dir().join("gc_project_roundtrip.json");
    save_json(&path, &scenario).unwrap();
    assert_eq!(load_json(&path).unwrap(), scenario);
    assert_eq!(gc_project::load(&path).unwrap(), scenario);
}
