use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::{json, Value};
use tempfile::TempDir;

fn campusmap_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("campusmap"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write_remote(home: &TempDir) -> PathBuf {
    let path = home.path().join("remote.json");
    let snapshot = json!({
        "Maps": {
            "main": {"mapName": "Main Campus", "center_lat": 14.65, "center_lng": 121.07}
        },
        "MapVersions": {
            "main": {
                "current_version": "v3",
                "__collections__": {"versions": {"v3": {
                    "nodes": [{"id": "n1"}, {"id": "n2"}],
                    "edges": [{"from": "n1", "to": "n2"}]
                }}}
            }
        },
        "Infrastructure": {"gym": {"name": "Gym"}},
        "Categories": {"sports": {"name": "Sports"}},
        "Campus": {"main": {"name": "Main"}}
    });
    fs::write(&path, serde_json::to_string_pretty(&snapshot).expect("encode")).expect("write");
    path
}

fn cache_dir(home: &TempDir) -> PathBuf {
    home.path().join(".campusmap").join("cache")
}

fn sync_json(home: &TempDir) -> Value {
    let output = campusmap_cmd(home.path())
        .args(["sync", "--json"])
        .output()
        .expect("run sync");
    assert!(output.status.success(), "sync failed: {output:?}");
    serde_json::from_slice(&output.stdout).expect("sync JSON")
}

#[test]
fn sync_before_init_points_at_init() {
    let home = TempDir::new().expect("home");
    campusmap_cmd(home.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(contains("campusmap init"));
}

#[test]
fn init_is_idempotent() {
    let home = TempDir::new().expect("home");
    let remote = write_remote(&home);

    campusmap_cmd(home.path())
        .args(["init", "--remote"])
        .arg(&remote)
        .assert()
        .success()
        .stdout(contains("Wrote config"));
    assert!(cache_dir(&home).is_dir());

    campusmap_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("Already initialised"))
        .stdout(contains("remote.json"));
}

#[test]
fn sync_populates_cache_and_lowers_remote_flags() {
    let home = TempDir::new().expect("home");
    let remote = write_remote(&home);
    campusmap_cmd(home.path())
        .args(["init", "--remote"])
        .arg(&remote)
        .assert()
        .success();

    let report = sync_json(&home);
    assert_eq!(report["remote_ready"], json!(true));
    assert_eq!(report["catalog_size"], json!(1));
    assert_eq!(report["versions"]["synced"][0]["map_id"], json!("main"));
    assert_eq!(report["versions"]["synced"][0]["status"], json!("synced"));
    assert_eq!(report["static_data"]["verified"].as_array().map(Vec::len), Some(3));

    let cache = cache_dir(&home);
    let nodes: Value =
        serde_json::from_str(&fs::read_to_string(cache.join("nodes_main.json")).expect("nodes"))
            .expect("nodes JSON");
    assert_eq!(nodes, json!([{"id": "n1"}, {"id": "n2"}]));
    let maps: Value =
        serde_json::from_str(&fs::read_to_string(cache.join("maps.json")).expect("maps"))
            .expect("maps JSON");
    assert_eq!(maps[0]["map_name"], json!("Main Campus"));

    let persisted: Value =
        serde_json::from_str(&fs::read_to_string(&remote).expect("remote")).expect("remote JSON");
    let flags = &persisted["StaticDataVersions"]["GlobalInfo"];
    assert_eq!(flags["campus_updated"], json!(false));
    assert!(flags["last_check"].is_i64());

    let again = sync_json(&home);
    assert_eq!(again["versions"]["up_to_date"], json!(["main"]));
    assert!(again.get("static_data").is_none());
}

#[test]
fn sync_without_remote_keeps_cache() {
    let home = TempDir::new().expect("home");
    campusmap_cmd(home.path()).arg("init").assert().success();

    campusmap_cmd(home.path())
        .arg("sync")
        .assert()
        .success()
        .stdout(contains("remote unavailable"));
    assert_eq!(
        fs::read_to_string(cache_dir(&home).join("maps.json")).expect("seeded maps"),
        "[]"
    );
}

#[test]
fn status_reports_cached_maps() {
    let home = TempDir::new().expect("home");
    let remote = write_remote(&home);
    campusmap_cmd(home.path())
        .args(["init", "--remote"])
        .arg(&remote)
        .assert()
        .success();

    campusmap_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No maps cached"));

    sync_json(&home);

    campusmap_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Main Campus"))
        .stdout(contains("v3"))
        .stdout(contains("cached"));

    let output = campusmap_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .expect("status --json");
    assert!(output.status.success());
    let status: Value = serde_json::from_slice(&output.stdout).expect("status JSON");
    assert_eq!(status["maps"][0]["state"], json!("cached"));
    assert_eq!(status["maps"][0]["cached_version"], json!("v3"));
    assert!(status["static_collections"]
        .as_array()
        .expect("static rows")
        .iter()
        .all(|row| row["synced"] == json!(true)));
}
