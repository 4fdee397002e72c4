use popsel_core::errors::{ConfigurationError, ErrorInfo, PopError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("id", "1")
        .with_context("reason", "example")
}

#[test]
fn cache_error_surface() {
    let err = PopError::Cache(sample_info("unfrozen-cache", "evaluate before freeze"));
    assert_eq!(err.code(), "unfrozen-cache");
    assert!(err.info().unwrap().context.contains_key("id"));
    assert!(!err.is_configuration());
}

#[test]
fn model_error_surface() {
    let err = PopError::Model(sample_info("kde-empty", "no samples"));
    assert_eq!(err.info().unwrap().code, "kde-empty");
}

#[test]
fn sampler_error_surface() {
    let err = PopError::Sampler(sample_info("S001", "ensemble too small"));
    assert_eq!(err.code(), "S001");
}

#[test]
fn configuration_errors_have_distinct_codes() {
    let variants = vec![
        ConfigurationError::MismatchedChannels {
            model: "B".into(),
            expected: vec!["X".into(), "Y".into()],
            found: vec!["X".into()],
        },
        ConfigurationError::UnknownModel {
            name: "Z".into(),
            available: vec!["A".into()],
        },
        ConfigurationError::UnknownParameter {
            name: "q".into(),
            source_label: "A.json".into(),
        },
        ConfigurationError::BranchingLength {
            expected: 3,
            expected_min: 2,
            found: 5,
        },
        ConfigurationError::BranchingSum { sum: 1.5 },
        ConfigurationError::MissingObservationCount,
        ConfigurationError::MissingBranchingFractions,
        ConfigurationError::invalid("walkers", "must be even"),
    ];
    let mut codes: Vec<_> = variants.iter().map(|v| v.code()).collect();
    codes.sort_unstable();
    codes.dedup();
    assert_eq!(codes.len(), variants.len());

    for variant in variants {
        let err: PopError = variant.into();
        assert!(err.is_configuration());
        assert!(err.info().is_none());
    }
}

#[test]
fn display_includes_context_and_hint() {
    let err = PopError::Serde(
        ErrorInfo::new("manifest-read", "missing file")
            .with_context("path", "/tmp/x")
            .with_hint("check the run directory"),
    );
    let text = err.to_string();
    assert!(text.contains("manifest-read"));
    assert!(text.contains("path=/tmp/x"));
    assert!(text.contains("hint: check the run directory"));
}
