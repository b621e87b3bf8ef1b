// tests/registry_file.rs
use std::fs;

use vod_aggregator::config::{sites_db_path, ENV_SITES_DB_PATH};
use vod_aggregator::{FileRegistry, ProviderRegistry};

#[test]
fn file_edits_show_up_on_next_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let reg = FileRegistry::init(&path).unwrap();

    let before = reg.snapshot_active();
    assert_eq!(before.len(), 1);

    fs::write(
        &path,
        r#"{"sites":[
            {"key":"lzi","name":"量子","api":"https://lzi.test/api.php/provide/vod","active":true},
            {"key":"bfzy","name":"暴风","api":"https://bfzy.test/api.php/provide/vod","active":false}
        ]}"#,
    )
    .unwrap();

    let after = reg.snapshot_all();
    let keys: Vec<_> = after.providers().iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["lzi", "bfzy", "ffzy"]);
    assert_eq!(reg.snapshot_active().len(), 2);
    assert!(reg.find_by_key("bfzy").is_some());

    // The earlier snapshot is untouched.
    assert_eq!(before.providers()[0].key, "ffzy");
}

#[serial_test::serial]
#[test]
fn db_path_honours_env() {
    std::env::remove_var(ENV_SITES_DB_PATH);
    assert_eq!(sites_db_path(), std::path::PathBuf::from("data/db.json"));
    std::env::set_var(ENV_SITES_DB_PATH, "/tmp/elsewhere.json");
    assert_eq!(sites_db_path(), std::path::PathBuf::from("/tmp/elsewhere.json"));
    std::env::remove_var(ENV_SITES_DB_PATH);
}
