use popsel_core::errors::{ConfigurationError, PopError};
use popsel_core::provenance::{RunProvenance, SchemaVersion};
use popsel_core::{ObservationRecord, ObservationSet};

#[test]
fn provenance_round_trip_json() {
    let provenance = RunProvenance {
        input_hash: "input".into(),
        observation_hash: "obs".into(),
        seed: 99,
        created_at: "2023-10-31T00:00:00Z".into(),
        tool_versions: [("popsel-core".into(), "0.1.0".into())].into_iter().collect(),
    };
    let json = serde_json::to_string_pretty(&provenance).expect("serialize");
    let decoded: RunProvenance = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, provenance);
    assert!(SchemaVersion::new(1, 2, 0) > SchemaVersion::default());
}

#[test]
fn configuration_error_round_trip_json() {
    let err = PopError::Configuration(ConfigurationError::BranchingSum { sum: 1.25 });
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("branching-sum"));
    let decoded: PopError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}

#[test]
fn observation_record_round_trip() {
    let set = ObservationSet::new(
        vec!["mchirp".into(), "chieff".into()],
        vec![vec![10.0, 0.1], vec![20.0, -0.2]],
    )
    .unwrap();
    let record = set.to_record();
    let json = serde_json::to_string(&record).expect("serialize");
    let decoded: ObservationRecord = serde_json::from_str(&json).expect("deserialize");
    let rebuilt = ObservationSet::try_from(decoded).unwrap();
    assert_eq!(rebuilt, set);
    assert_eq!(rebuilt.fingerprint(), set.fingerprint());
}
