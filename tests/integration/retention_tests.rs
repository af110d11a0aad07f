//! Retention analysis integration tests
//!
//! End-to-end checks of rule application, marking and recomputation through
//! the public `RetentionAnalysis` API.

use keepgraph::proguard::MemberSpecification;
use keepgraph::{
    Config, EntityId, Program, ProgramDocument, ReachabilityMarker, ReferenceKind, Retainable, RetentionAnalysis,
    RuleSet, RuleSpecification,
};
use std::collections::HashSet;
use std::path::PathBuf;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn no_annotations() -> HashSet<String> {
    HashSet::new()
}

fn fixture_analysis(config: Config) -> RetentionAnalysis {
    let program = ProgramDocument::from_path(&fixtures_path().join("program.yaml"))
        .unwrap()
        .into_program()
        .unwrap();
    RetentionAnalysis::new(program, config)
}

fn fixture_rules() -> RuleSet {
    RuleSet::from_path(&fixtures_path().join("rules.yaml")).unwrap()
}

fn id(analysis: &RetentionAnalysis, name: &str) -> EntityId {
    analysis.program().find_class(name).unwrap()
}

fn method(analysis: &RetentionAnalysis, class: &str, name: &str) -> EntityId {
    let program = analysis.program();
    let class = program.find_class(class).unwrap();
    program
        .members(class)
        .iter()
        .copied()
        .find(|m| program.entity(*m).is_some_and(|e| e.name == name))
        .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_keep_rule_makes_class_a_root_and_keeps_members() {
    let mut program = Program::new();
    let main = program.add_class("com.example.Main").unwrap();
    let run = program.add_method(main, "run", vec![], "void").unwrap();
    let count = program.add_field(main, "count", "int").unwrap();

    let mut analysis = RetentionAnalysis::new(program, Config::default());
    analysis.init_seed_classes("".as_bytes(), &keepgraph::IdentityMap).unwrap();
    let rules = RuleSet::new(vec![
        RuleSpecification::keep("com.example.Main").with_member(MemberSpecification::any())
    ]);
    analysis.init_reachable_classes(&rules, &no_annotations()).unwrap();

    assert!(analysis.state(main).root());
    assert!(analysis.state(run).keep());
    assert!(analysis.state(count).keep());
}

#[test]
fn test_recompute_after_removed_call_site() {
    let mut program = Program::new();
    let a = program.add_class("com.example.A").unwrap();
    let b = program.add_class("com.example.B").unwrap();
    let n = program.add_method(a, "n", vec![], "void").unwrap();
    let m = program.add_method(b, "m", vec![], "void").unwrap();
    program.add_reference(n, m, ReferenceKind::Call);

    let mut analysis = RetentionAnalysis::new(program, Config::default());
    let rules = RuleSet::new(vec![
        RuleSpecification::keep("com.example.A").with_member(MemberSpecification::method("n", "")),
        RuleSpecification::keep("com.example.B")
            .with_member(MemberSpecification::method("m", ""))
            .allow_shrinking(),
    ]);
    analysis.init_reachable_classes(&rules, &no_annotations()).unwrap();
    assert!(analysis.state(m).reachable_from_code());

    let configuration = analysis.table().configuration();
    let keep_before = analysis.state(m).keep();

    assert_eq!(analysis.program_mut().remove_reference(n, m, Some(ReferenceKind::Call)), 1);
    analysis.recompute_classes_reachable_from_code();

    assert!(!analysis.state(m).reachable_from_code());
    assert!(!analysis.state(b).reachable_from_code());
    assert_eq!(analysis.state(m).keep(), keep_before);
    assert_eq!(analysis.table().configuration(), configuration);
}

fn dispatch_program() -> (Program, EntityId, EntityId, EntityId) {
    let mut program = Program::new();
    let iface = program.add_class("com.example.I").unwrap();
    program.set_interface(iface, true).unwrap();
    let f = program.add_method(iface, "f", vec![], "void").unwrap();

    let c = program.add_class("com.example.C").unwrap();
    program.add_super_type(c, "com.example.I").unwrap();
    let cf = program.add_method(c, "f", vec![], "void").unwrap();

    let main = program.add_class("com.example.Main").unwrap();
    let run = program.add_method(main, "run", vec![], "void").unwrap();
    program.add_reference(run, f, ReferenceKind::Call);

    (program, c, cf, run)
}

#[test]
fn test_interface_call_dispatches_to_reachable_override() {
    let (mut program, c, cf, run) = dispatch_program();
    program.add_reference(run, c, ReferenceKind::Instantiate);

    let config = Config {
        mark_all_members: false,
        ..Config::default()
    };
    let mut analysis = RetentionAnalysis::new(program, config);
    let rules = RuleSet::new(vec![
        RuleSpecification::keep("com.example.Main").with_member(MemberSpecification::method("run", ""))
    ]);
    analysis.init_reachable_classes(&rules, &no_annotations()).unwrap();

    assert!(analysis.state(c).reachable_from_code());
    assert!(analysis.state(cf).reachable_from_code());
}

#[test]
fn test_interface_call_does_not_reach_unreachable_implementor() {
    let (program, c, cf, _) = dispatch_program();

    let config = Config {
        mark_all_members: false,
        ..Config::default()
    };
    let mut analysis = RetentionAnalysis::new(program, config);
    let rules = RuleSet::new(vec![
        RuleSpecification::keep("com.example.Main").with_member(MemberSpecification::method("run", ""))
    ]);
    analysis.init_reachable_classes(&rules, &no_annotations()).unwrap();

    assert!(!analysis.state(c).reachable_from_code());
    assert!(!analysis.state(cf).reachable_from_code());
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_init_reachable_classes_is_idempotent() {
    let mut analysis = fixture_analysis(Config::default());
    analysis
        .init_seed_classes_from_path(&fixtures_path().join("seeds.txt"), &keepgraph::IdentityMap)
        .unwrap();
    let rules = fixture_rules();

    analysis.init_reachable_classes(&rules, &no_annotations()).unwrap();
    let first = analysis.snapshot();
    analysis.init_reachable_classes(&rules, &no_annotations()).unwrap();

    assert_eq!(analysis.snapshot(), first);
}

#[test]
fn test_recompute_without_mutation_is_stable() {
    let mut analysis = fixture_analysis(Config::default());
    analysis.init_reachable_classes(&fixture_rules(), &no_annotations()).unwrap();
    let first = analysis.snapshot();

    for _ in 0..3 {
        analysis.recompute_classes_reachable_from_code();
        assert_eq!(analysis.snapshot(), first);
    }
}

#[test]
fn test_marking_never_clears_reachability() {
    let mut analysis = fixture_analysis(Config::default());
    analysis.init_reachable_classes(&fixture_rules(), &no_annotations()).unwrap();
    let before = analysis.snapshot();

    // New edge from reachable code to a previously dead class
    let run = method(&analysis, "com.example.ServiceImpl", "start");
    let unused = id(&analysis, "com.example.Unused");
    analysis.program_mut().add_reference(run, unused, ReferenceKind::Instantiate);

    let mut table = analysis.snapshot();
    ReachabilityMarker::new(analysis.config()).mark(analysis.program(), &mut table);

    for (entity, state) in before.iter() {
        if state.reachable_from_code() {
            assert!(table.get(entity).reachable_from_code(), "{} lost reachability", entity);
        }
    }
    assert!(table.get(unused).reachable_from_code());
}

#[test]
fn test_predicate_formulas_hold_for_every_entity() {
    let mut analysis = fixture_analysis(Config::default());
    analysis
        .init_seed_classes_from_path(&fixtures_path().join("seeds.txt"), &keepgraph::IdentityMap)
        .unwrap();
    let annotations: HashSet<String> = ["com.example.DoNotOptimize".to_string()].into();
    analysis.init_reachable_classes(&fixture_rules(), &annotations).unwrap();

    for (_, state) in analysis.table().iter() {
        assert_eq!(state.root(), state.keep() && !state.allowshrinking());
        assert_eq!(
            state.do_not_touch(),
            state.keep() && !state.allowshrinking() && !state.allowobfuscation()
        );
        if state.do_not_touch() {
            assert!(!state.can_rename());
        }
        assert_eq!(state.can_delete_if_unused(), !state.keep() && !state.reachable_from_code());
    }
}

// ============================================================================
// Fixture program
// ============================================================================

#[test]
fn test_fixture_reachability() {
    let mut analysis = fixture_analysis(Config::default());
    let stats = analysis.init_reachable_classes(&fixture_rules(), &no_annotations()).unwrap();
    assert_eq!(stats.roots, 2);

    for reachable in ["com.example.Main", "com.example.Service", "com.example.ServiceImpl", "com.example.Settings"] {
        assert!(analysis.state(id(&analysis, reachable)).reachable_from_code(), "{}", reachable);
    }
    for dead in ["com.example.Unused", "com.example.Legacy", "com.example.Payload", "com.example.Pinned"] {
        let state = analysis.state(id(&analysis, dead));
        assert!(state.can_delete_if_unused(), "{}", dead);
    }

    let service = analysis.state(id(&analysis, "com.example.Service"));
    assert!(service.keepnames());
    assert!(!service.root());
}

#[test]
fn test_no_optimization_annotation_pins_entity() {
    let mut analysis = fixture_analysis(Config::default());
    let annotations: HashSet<String> = ["com.example.DoNotOptimize".to_string()].into();
    analysis.init_reachable_classes(&fixture_rules(), &annotations).unwrap();

    let pinned = analysis.state(id(&analysis, "com.example.Pinned"));
    assert!(pinned.do_not_touch());
    assert!(pinned.reachable_from_code());
    assert!(!pinned.can_rename());
}

#[test]
fn test_removed_class_drops_out_after_recompute() {
    let mut analysis = fixture_analysis(Config::default());
    analysis.init_reachable_classes(&fixture_rules(), &no_annotations()).unwrap();
    let before = analysis.table().len();

    let unused = id(&analysis, "com.example.Unused");
    let removed = analysis.program_mut().remove_entity(unused).unwrap();
    analysis.recompute_classes_reachable_from_code();

    assert_eq!(analysis.table().len(), before - removed.len());
    assert!(analysis.retained(unused).is_err());
}
