use std::collections::BTreeMap;
use std::fs;

use popsel_core::provenance::{RunProvenance, SchemaVersion};
use popsel_core::{load_json, store_json, JsonStyle};
use tempfile::tempdir;

#[test]
fn stored_documents_load_back_in_either_style() {
    let dir = tempdir().unwrap();
    let provenance = RunProvenance {
        seed: 42,
        ..RunProvenance::default()
    }
    .with_tool("popsel-core", "0.1.0");

    let compact = dir.path().join("nested").join("compact.json");
    store_json("provenance", &compact, &provenance, JsonStyle::Compact).unwrap();
    assert_eq!(fs::read_to_string(&compact).unwrap().lines().count(), 1);
    let loaded: RunProvenance = load_json("provenance", &compact).unwrap();
    assert_eq!(loaded, provenance);

    let pretty = dir.path().join("pretty.json");
    store_json("provenance", &pretty, &provenance, JsonStyle::Pretty).unwrap();
    assert!(fs::read_to_string(&pretty).unwrap().lines().count() > 1);
}

#[test]
fn failures_carry_kind_specific_codes() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    let err = load_json::<BTreeMap<String, u64>>("manifest", &missing).unwrap_err();
    assert_eq!(err.code(), "manifest-read");
    assert!(err.info().unwrap().context["path"].ends_with("missing.json"));

    let garbled = dir.path().join("garbled.json");
    fs::write(&garbled, "{ not json").unwrap();
    let err = load_json::<BTreeMap<String, u64>>("checkpoint", &garbled).unwrap_err();
    assert_eq!(err.code(), "checkpoint-parse");
}

#[test]
fn schema_major_version_gates_reading() {
    let current = SchemaVersion::CURRENT;
    assert!(current.can_read(SchemaVersion::new(current.major, current.minor + 3, 1)));
    assert!(!current.can_read(SchemaVersion::new(current.major + 1, 0, 0)));
    assert_eq!(SchemaVersion::new(2, 1, 0).to_string(), "2.1.0");
}
