//! Protocol orchestration tests.
//!
//! Tests for complete validation runs over mock datasets, including scope
//! ordering, result merging, abort behavior and report export.

use crate::mocks::{
    init_tracing, sample_min_reads, MockComponent, MockDataset, MockProtocol, MockSample,
};
use dp_vv::engine::flag::{Flag, FlagCode, FlagDescriptions};
use dp_vv::engine::protocol::Validation;
use dp_vv::engine::rule::{IsolationPolicy, Rule, RuleError, RuleErrorKind};
use dp_vv::engine::template::{args, TemplateArgs};
use dp_vv::{run_protocol, Check, CheckRegistry, FlagReport, Scope, VvError};

// Helper to create a sample check whose rule always fails
fn create_failing_sample_check(registry: &CheckRegistry) -> Check<MockSample> {
    Check::new(
        registry,
        "SAMPLE_BROKEN_0001",
        "always fails",
        FlagDescriptions::new([(FlagCode::Green, "ok")]).unwrap(),
        Rule::named("broken_rule", |_: &Check<MockSample>, _: &MockSample| {
            Err(RuleError::failed("cannot read sample"))
        }),
        TemplateArgs::new(),
    )
    .unwrap()
}

fn codes(flags: &[Flag]) -> Vec<FlagCode> {
    flags.iter().map(Flag::code).collect()
}

// Orchestration

#[test]
fn test_scopes_run_in_fixed_order() {
    init_tracing();
    let registry = CheckRegistry::new();
    let protocol = MockProtocol::standard(&registry).unwrap();
    let mut validation = Validation::new(protocol, MockDataset::healthy()).unwrap();

    validation.validate_all().unwrap();
    assert_eq!(
        validation.protocol().calls,
        vec![Scope::Dataset, Scope::Sample, Scope::Component]
    );
}

#[test]
fn test_healthy_dataset_all_green() {
    init_tracing();
    let registry = CheckRegistry::new();
    let protocol = MockProtocol::standard(&registry).unwrap();
    let dataset = MockDataset::healthy();

    let flags = run_protocol(protocol, dataset.clone()).unwrap();
    assert_eq!(flags.dataset.len(), 1);
    assert_eq!(flags.sample.len(), 2);
    assert_eq!(flags.component.len(), 2);
    assert_eq!(flags.len(), 5);
    assert!(flags.iter().all(|f| f.code() == FlagCode::Green));

    let dataset_flags = &flags.dataset[&dataset];
    assert_eq!(dataset_flags[0].message(), "2 samples listed");
    let s2 = &flags.sample[&MockSample::new("S2", 30_000)];
    assert_eq!(s2[0].message(), "30000 reads");
}

#[test]
fn test_degraded_dataset_flags() {
    let registry = CheckRegistry::new();
    let protocol = MockProtocol::standard(&registry).unwrap();

    let flags = run_protocol(protocol, MockDataset::degraded()).unwrap();
    assert_eq!(
        codes(&flags.sample[&MockSample::new("S2", 12)]),
        vec![FlagCode::Red1]
    );
    assert_eq!(
        codes(&flags.component[&MockComponent::new("runsheet", false)]),
        vec![FlagCode::Red1]
    );

    let summary = flags.summary();
    assert_eq!(summary.total, 5);
    assert_eq!(summary.green, 3);
    assert_eq!(summary.red, 2);
    assert_eq!(summary.worst, Some(FlagCode::Red1));
    assert!(!summary.passed());
}

#[test]
fn test_empty_protocol_yields_empty_mappings() {
    let mut validation = Validation::new(MockProtocol::empty(), MockDataset::healthy()).unwrap();
    let flags = validation.validate_all().unwrap();
    assert!(flags.is_empty());
    assert!(flags.summary().passed());
    assert_eq!(validation.protocol().calls.len(), 3);
}

#[test]
fn test_validate_all_accumulates() {
    let registry = CheckRegistry::new();
    let protocol = MockProtocol::standard(&registry).unwrap();
    let mut validation = Validation::new(protocol, MockDataset::healthy()).unwrap();

    validation.validate_all().unwrap();
    validation.validate_all().unwrap();

    let flags = validation.flags();
    assert_eq!(flags.len(), 10);
    assert_eq!(flags.dataset[validation.dataset()].len(), 2);
    for sample_flags in flags.sample.values() {
        assert_eq!(sample_flags.len(), 2);
    }
    assert_eq!(validation.protocol().calls.len(), 6);
}

#[test]
fn test_dataset_type_mismatch() {
    let registry = CheckRegistry::new();
    let protocol = MockProtocol::standard(&registry).unwrap();

    let err = Validation::new(protocol, MockDataset::microarray()).err().unwrap();
    match err {
        VvError::DatasetTypeMismatch { expected, found } => {
            assert_eq!(expected, "bulkRNASeq");
            assert_eq!(found, "microarray");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_history_matches_protocol_flags() {
    let registry = CheckRegistry::new();
    let protocol = MockProtocol::standard(&registry).unwrap();
    let mut validation = Validation::new(protocol, MockDataset::healthy()).unwrap();
    validation.validate_all().unwrap();

    let check = &validation.protocol().sample_checks()[0];
    let history = check.flags();
    assert_eq!(history.len(), 2);
    let s1_flag = &validation.flags().sample[&MockSample::new("S1", 25_000)][0];
    assert!(history.iter().any(|f| f.same_record(s1_flag)));
}

// Isolation across a run

#[test]
fn test_failing_rule_does_not_stop_run() {
    init_tracing();
    let registry = CheckRegistry::new();
    let mut protocol = MockProtocol::standard(&registry).unwrap();
    protocol.add_sample_check(create_failing_sample_check(&registry));

    let flags = run_protocol(protocol, MockDataset::healthy()).unwrap();
    let s1 = &flags.sample[&MockSample::new("S1", 25_000)];
    assert_eq!(codes(s1), vec![FlagCode::Green, FlagCode::DevUnhandled]);
    assert!(s1[1].message().contains("broken_rule"));
    assert_eq!(flags.component.len(), 2);
    assert!(flags.summary().has_dev_errors());
}

#[test]
fn test_propagated_error_aborts_run() {
    let registry = CheckRegistry::with_policy(IsolationPolicy::propagating([
        RuleErrorKind::Failed,
    ]));
    let mut protocol = MockProtocol::standard(&registry).unwrap();
    protocol.add_sample_check(create_failing_sample_check(&registry));

    let mut validation = Validation::new(protocol, MockDataset::healthy()).unwrap();
    let err = validation.validate_all().err().unwrap();
    match &err {
        VvError::RuleAborted { check_id, source } => {
            assert_eq!(check_id, "SAMPLE_BROKEN_0001");
            assert_eq!(source.kind(), RuleErrorKind::Failed);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("cannot read sample"));

    // Dataset scope finished before the abort; components never ran.
    assert_eq!(validation.flags().dataset.len(), 1);
    assert!(validation.flags().component.is_empty());
    assert_eq!(validation.protocol().calls, vec![Scope::Dataset, Scope::Sample]);
}

// Per-entity copies

#[test]
fn test_per_sample_copies() {
    let registry = CheckRegistry::new();
    let template = sample_min_reads(&registry, "SAMPLE_READS_0001", 1000).unwrap();
    let mut protocol = MockProtocol::empty();
    for (i, min_reads) in [(2, 20_000u64), (3, 28_000)] {
        let copy = template
            .copy_with_new_config(
                &registry,
                &format!("SAMPLE_READS_{i:04}"),
                args([("min_reads", min_reads)]),
            )
            .unwrap();
        protocol.add_sample_check(copy);
    }

    let flags = run_protocol(protocol, MockDataset::healthy()).unwrap();
    let s1 = &flags.sample[&MockSample::new("S1", 25_000)];
    assert_eq!(codes(s1), vec![FlagCode::Green, FlagCode::Red1]);
    assert_eq!(s1[1].message(), "only 25000 reads, expected at least 28000");
    assert_eq!(template.flag_count(), 0);
    assert_eq!(registry.len(), 3);
}

// Reports

#[test]
fn test_report_export_and_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let baseline_path = dir.path().join("baseline.json");

    let registry = CheckRegistry::new();
    let healthy = run_protocol(
        MockProtocol::standard(&registry).unwrap(),
        MockDataset::healthy(),
    )
    .unwrap();
    let report = healthy.report();
    assert_eq!(report.flags.len(), 5);
    assert_eq!(report.flags[0].scope, Scope::Dataset);
    assert_eq!(report.flags[0].entity, "GLDS-194");
    report.save(&baseline_path).unwrap();

    registry.reset();
    let degraded = run_protocol(
        MockProtocol::standard(&registry).unwrap(),
        MockDataset::degraded(),
    )
    .unwrap();
    let current = degraded.report();

    let baseline = FlagReport::load(&baseline_path).unwrap();
    assert_eq!(baseline, report);

    let cmp = current.compare(&baseline);
    assert!(cmp.has_regressions());
    let regressed: Vec<(&str, &str)> = cmp
        .regressions
        .iter()
        .map(|e| (e.entity.as_str(), e.check_id.as_str()))
        .collect();
    assert_eq!(
        regressed,
        vec![("S2", "SAMPLE_READS_0001"), ("runsheet", "COMPONENT_FILE_0001")]
    );
    // Datasets are keyed by name, so GLDS-48 is new and GLDS-194 is gone.
    assert_eq!(cmp.added.len(), 1);
    assert_eq!(cmp.missing.len(), 1);
}

#[test]
fn test_report_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        FlagReport::load(&dir.path().join("absent.json")),
        Err(VvError::Io { .. })
    ));
}
