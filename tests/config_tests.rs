use groupforge::config::SearchParams;
use tempfile::tempdir;

#[test]
fn params_round_trip_through_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.json");

    let params = SearchParams {
        swap_probability: 0.65,
        reheat_after: 5_000,
        ..Default::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&params).unwrap()).unwrap();

    let loaded = SearchParams::load_from_file(&path).unwrap();
    assert_eq!(loaded.swap_probability, 0.65);
    assert_eq!(loaded.reheat_after, 5_000);
    loaded.validate().unwrap();
}

#[test]
fn partial_json_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{"temp_initial": 120.0}"#).unwrap();

    let loaded = SearchParams::load_from_file(&path).unwrap();
    assert_eq!(loaded.temp_initial, 120.0);
    assert_eq!(loaded.cooling_factor, SearchParams::default().cooling_factor);
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(SearchParams::load_from_file("does/not/exist.json").is_err());
}
