//! Flag construction tests.

use crate::mocks::{component_present, MockComponent};
use dp_vv::engine::flag::{Flag, FlagCode, FlagDescriptions};
use dp_vv::engine::rule::{Rule, RuleError};
use dp_vv::engine::template::{args, TemplateArgs};
use dp_vv::{Check, CheckRegistry, FlagFamily, VvError};
use serde_json::Value;

// Helper to create a check with several message templates and a no-op rule
fn create_reporting_check(registry: &CheckRegistry) -> Check<()> {
    Check::new(
        registry,
        "DATASET_REPORT_0001",
        "reporting check",
        FlagDescriptions::new([
            (FlagCode::Green, "all {n} good"),
            (FlagCode::Yellow2, "{n} borderline"),
            (FlagCode::Halt4, "stop"),
        ])
        .unwrap(),
        Rule::named("noop", |_: &Check<()>, _: &()| Err(RuleError::failed("unused"))),
        TemplateArgs::new(),
    )
    .unwrap()
}

#[test]
fn test_flag_recorded_once_per_construction() {
    let registry = CheckRegistry::new();
    let check = create_reporting_check(&registry);

    let first = Flag::new(FlagCode::Green, &check, args([("n", 3)])).unwrap();
    let second = Flag::new(FlagCode::Yellow2, &check, args([("n", 1)])).unwrap();

    let history = check.flags();
    assert_eq!(history.len(), 2);
    assert!(history[0].same_record(&first));
    assert!(history[1].same_record(&second));
    assert!(!history[0].same_record(&second));
}

#[test]
fn test_flag_fields() {
    let registry = CheckRegistry::new();
    let check = create_reporting_check(&registry);

    let flag = Flag::new(FlagCode::Green, &check, args([("n", 3)])).unwrap();
    assert_eq!(flag.code(), FlagCode::Green);
    assert_eq!(flag.rank(), 20);
    assert_eq!(flag.message(), "all 3 good");
    assert_eq!(flag.message_args().get("n"), Some(&Value::from(3)));
    assert_eq!(flag.check_id().as_str(), "DATASET_REPORT_0001");
    assert_eq!(flag.check().description(), "reporting check");
    assert_eq!(flag.code().family(), FlagFamily::Green);
}

#[test]
fn test_undescribed_code_rejected() {
    let registry = CheckRegistry::new();
    let check = create_reporting_check(&registry);

    let err = Flag::new(FlagCode::Red1, &check, TemplateArgs::new()).unwrap_err();
    match err {
        VvError::UndescribedFlagCode { check_id, code } => {
            assert_eq!(check_id, "DATASET_REPORT_0001");
            assert_eq!(code, FlagCode::Red1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(check.flag_count(), 0);
}

#[test]
fn test_missing_message_arg_rejected() {
    let registry = CheckRegistry::new();
    let check = create_reporting_check(&registry);

    let err = Flag::new(FlagCode::Yellow2, &check, args([("m", 1)])).unwrap_err();
    assert!(matches!(err, VvError::MissingTemplateKey { ref key, .. } if key == "n"));
    assert_eq!(check.flag_count(), 0);
}

#[test]
fn test_equal_rank_codes_keep_identity() {
    let registry = CheckRegistry::new();
    let check = create_reporting_check(&registry);

    let flag = Flag::new(FlagCode::Halt4, &check, TemplateArgs::new()).unwrap();
    assert_eq!(flag.code(), FlagCode::Halt4);
    assert_ne!(flag.code(), FlagCode::Halt1);
    assert_eq!(flag.rank(), FlagCode::Halt1.rank());
}

#[test]
fn test_flag_display() {
    let registry = CheckRegistry::new();
    let check = component_present(&registry).unwrap();

    let flag = check.validate(&MockComponent::new("runsheet", false)).unwrap();
    assert_eq!(flag.to_string(), "[RED1] COMPONENT_FILE_0001: runsheet missing");
}

#[test]
fn test_flag_clones_share_record() {
    let registry = CheckRegistry::new();
    let check = create_reporting_check(&registry);

    let flag = Flag::new(FlagCode::Halt4, &check, TemplateArgs::new()).unwrap();
    let copy = flag.clone();
    assert!(copy.same_record(&flag));
    assert_eq!(check.flag_count(), 1);
}
