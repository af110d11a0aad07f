//! Keep rule integration tests
//!
//! Rules are written the way a rule file would carry them (YAML) and applied
//! through the analysis facade.

use keepgraph::{AnalysisError, Config, EntityId, Program, Retainable, RetentionAnalysis, RetentionFlags, RuleSet};
use std::collections::HashSet;

struct Fixture {
    analysis: RetentionAnalysis,
    activity: EntityIds,
    helper: EntityId,
}

struct EntityIds {
    class: EntityId,
    on_create: EntityId,
    tag: EntityId,
}

fn program() -> (Program, EntityIds, EntityId) {
    let mut program = Program::new();
    let base = program.add_class("android.app.Activity").unwrap();
    program.add_method(base, "onCreate", vec!["android.os.Bundle".to_string()], "void").unwrap();

    let class = program.add_class("com.example.ui.MainActivity").unwrap();
    program.add_super_type(class, "android.app.Activity").unwrap();
    let on_create = program
        .add_method(class, "onCreate", vec!["android.os.Bundle".to_string()], "void")
        .unwrap();
    let tag = program.add_field(class, "TAG", "java.lang.String").unwrap();

    let helper = program.add_class("com.example.util.Helper").unwrap();
    program.add_method(helper, "log", vec!["java.lang.String".to_string()], "void").unwrap();

    (program, EntityIds { class, on_create, tag }, helper)
}

fn apply(yaml: &str, config: Config) -> Fixture {
    let (program, activity, helper) = program();
    let mut analysis = RetentionAnalysis::new(program, config);
    let rules = RuleSet::from_yaml(yaml).unwrap();
    analysis.init_reachable_classes(&rules, &HashSet::new()).unwrap();
    Fixture {
        analysis,
        activity,
        helper,
    }
}

#[test]
fn test_keep_with_extends_and_member_wildcards() {
    let f = apply(
        r#"
rules:
  - kind: keep
    class: "**"
    extends: android.app.Activity
    members:
      - { kind: method, name: "on*", params: "..." }
"#,
        Config::default(),
    );

    let class = f.analysis.state(f.activity.class);
    assert!(class.root());
    assert!(!class.is_blanket_kept());
    assert!(f.analysis.state(f.activity.on_create).do_not_touch());
    assert!(!f.analysis.state(f.activity.tag).keep());
    assert!(!f.analysis.state(f.helper).keep());
}

#[test]
fn test_keepclassmembers_leaves_class_alone() {
    let f = apply(
        r#"
rules:
  - kind: keepclassmembers
    class: com.example.ui.*
    members:
      - { kind: field, type: java.lang.String }
"#,
        Config::default(),
    );

    assert!(!f.analysis.state(f.activity.class).keep());
    let tag = f.analysis.state(f.activity.tag);
    assert!(tag.keep());
    assert!(tag.keepclassmembers());
    assert!(!tag.keepclassmembernames());
}

#[test]
fn test_keepclasseswithmembers_requires_every_member() {
    let matching = apply(
        r#"
rules:
  - kind: keepclasseswithmembers
    class: "com.example.**"
    members:
      - { kind: method, name: onCreate }
      - { kind: field, name: TAG }
"#,
        Config::default(),
    );
    let class = matching.analysis.state(matching.activity.class);
    assert!(class.keep());
    assert!(class.keepclasseswithmembers());
    assert!(!matching.analysis.state(matching.helper).keep());

    let missing = apply(
        r#"
rules:
  - kind: keepclasseswithmembers
    class: "com.example.**"
    members:
      - { kind: method, name: onCreate }
      - { kind: field, name: missing }
"#,
        Config::default(),
    );
    assert!(!missing.analysis.state(missing.activity.class).keep());
    assert!(!missing.analysis.state(missing.activity.on_create).keep());
}

#[test]
fn test_names_rules_allow_shrinking() {
    let f = apply(
        r#"
rules:
  - kind: keepnames
    class: com.example.util.Helper
  - kind: keepclasseswithmembernames
    class: com.example.ui.MainActivity
    members:
      - { kind: method, name: onCreate }
"#,
        Config::default(),
    );

    let helper = f.analysis.state(f.helper);
    assert!(helper.keepnames());
    assert!(!helper.root());
    assert!(!helper.can_delete_if_unused());

    let on_create = f.analysis.state(f.activity.on_create);
    assert!(on_create.keepclasseswithmembernames());
    assert!(!on_create.reachable_from_code());
}

#[test]
fn test_allowobfuscation_permits_renaming() {
    let f = apply(
        r#"
rules:
  - kind: keep
    class: com.example.util.Helper
    allowobfuscation: true
"#,
        Config::default(),
    );

    let helper = f.analysis.state(f.helper);
    assert!(helper.root());
    assert!(!helper.do_not_touch());
    assert!(helper.can_rename());
}

#[test]
fn test_blanket_keep_is_tracked() {
    let yaml = r#"
rules:
  - kind: keep
    class: "**"
  - kind: keep
    class: com.example.util.Helper
"#;

    let f = apply(yaml, Config::default());
    let activity = f.analysis.state(f.activity.class);
    assert!(activity.is_blanket_kept());
    assert!(!activity.can_rename());
    assert!(activity.can_rename_if_ignoring_blanket_keep());

    // Also matched by a targeted rule
    assert!(!f.analysis.state(f.helper).is_blanket_kept());

    let untracked = apply(
        yaml,
        Config {
            track_blanket_keeps: false,
            ..Config::default()
        },
    );
    assert!(!untracked.analysis.state(untracked.activity.class).is_blanket_kept());
}

#[test]
fn test_conflicting_rules_follow_merge_policy() {
    let yaml = r#"
rules:
  - kind: keep
    class: com.example.util.Helper
  - kind: keep
    class: com.example.util.*
    allowobfuscation: true
"#;

    let strict = apply(yaml, Config::default());
    assert!(strict.analysis.state(strict.helper).do_not_touch());

    let permissive = apply(
        yaml,
        Config {
            permissive_rule_merge: true,
            ..Config::default()
        },
    );
    let helper = permissive.analysis.state(permissive.helper);
    assert!(helper.allowobfuscation());
    assert!(helper.can_rename());
}

#[test]
fn test_assumenosideeffects_does_not_keep() {
    let f = apply(
        r#"
rules:
  - kind: assumenosideeffects
    class: com.example.util.Helper
    members:
      - { kind: method, name: log }
"#,
        Config::default(),
    );

    let program = f.analysis.program();
    let log = program.find_method(f.helper, "log", &["java.lang.String".to_string()]).unwrap();
    let state = f.analysis.state(log);
    assert!(state.assumenosideeffects());
    assert!(!state.keep());
    assert_eq!(f.analysis.table().count(RetentionFlags::ASSUME_NO_SIDE_EFFECTS), 1);
}

#[test]
fn test_keep_packages_pin_classes_and_members() {
    let f = apply(
        "rules: []\n",
        Config {
            keep_packages: vec!["com.example.ui".to_string()],
            ..Config::default()
        },
    );

    assert!(f.analysis.state(f.activity.class).do_not_touch());
    assert!(f.analysis.state(f.activity.tag).do_not_touch());
    assert!(!f.analysis.state(f.helper).keep());
}

#[test]
fn test_rule_matching_nothing_is_ignored() {
    let f = apply(
        r#"
rules:
  - kind: keep
    class: org.nowhere.**
"#,
        Config::default(),
    );

    assert_eq!(f.analysis.last_apply().map(|s| s.unmatched_rules), Some(1));
    assert_eq!(f.analysis.table().count(RetentionFlags::KEEP), 0);
}

#[test]
fn test_malformed_rule_sets_are_fatal() {
    let unknown_kind = RuleSet::from_yaml("rules:\n  - kind: keepeverything\n    class: '**'\n").unwrap_err();
    assert!(matches!(unknown_kind, AnalysisError::RuleParse(_)));

    let bad_rule = RuleSet::from_yaml(
        "rules:\n  - kind: assumenosideeffects\n    class: '**'\n    members:\n      - { kind: field }\n",
    )
    .unwrap();
    let (program, _, _) = program();
    let mut analysis = RetentionAnalysis::new(program, Config::default());
    let err = analysis.init_reachable_classes(&bad_rule, &HashSet::new()).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRule { index: 0, .. }));
}
