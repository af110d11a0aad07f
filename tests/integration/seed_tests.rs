//! Seeds and name map integration tests

#![allow(deprecated)]

use keepgraph::{
    AnalysisError, Config, IdentityMap, Program, ProguardMap, Retainable, RetentionAnalysis, RetentionFlags,
    RuleSet,
};
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn analysis() -> RetentionAnalysis {
    let mut program = Program::new();
    let foo = program.add_class("com.example.Foo").unwrap();
    program.add_method(foo, "<init>", vec!["int".to_string()], "void").unwrap();
    program.add_method(foo, "run", vec!["int".to_string(), "java.lang.String".to_string()], "void").unwrap();
    program.add_field(foo, "count", "int").unwrap();
    program.add_class("com.example.Bar").unwrap();
    RetentionAnalysis::new(program, Config::default())
}

#[test]
fn test_single_seed_resolves() {
    let mut analysis = analysis();
    let count = analysis.init_seed_classes("com.example.Foo\n".as_bytes(), &IdentityMap).unwrap();
    assert_eq!(count, 1);

    let foo = analysis.program().find_class("com.example.Foo").unwrap();
    let state = analysis.state(foo);
    assert!(state.is_seed());
    assert!(state.keep());
}

#[test]
fn test_unresolvable_seed_is_not_fatal() {
    let mut analysis = analysis();
    let count = analysis
        .init_seed_classes("com.example.DoesNotExist\n".as_bytes(), &IdentityMap)
        .unwrap();

    assert_eq!(count, 0);
    assert_eq!(analysis.table().count(RetentionFlags::SEED), 0);
    assert_eq!(
        analysis.last_seed_report().map(|r| r.unresolved.len()),
        Some(1)
    );
}

#[test]
fn test_member_seeds() {
    let mut analysis = analysis();
    let seeds = "\
# members
com.example.Foo: int count
com.example.Foo: void run(int,java.lang.String)
com.example.Foo: Foo(int)

com.example.Foo: void run()
";
    let count = analysis.init_seed_classes(seeds.as_bytes(), &IdentityMap).unwrap();
    assert_eq!(count, 3);

    let program = analysis.program();
    let foo = program.find_class("com.example.Foo").unwrap();
    let ctor = program.find_method(foo, "<init>", &["int".to_string()]).unwrap();
    assert!(analysis.state(ctor).is_seed());
    assert!(!analysis.state(foo).is_seed());
}

#[test]
fn test_seeds_are_idempotent() {
    let mut analysis = analysis();
    let seeds = "com.example.Foo\ncom.example.Bar\n";

    assert_eq!(analysis.init_seed_classes(seeds.as_bytes(), &IdentityMap).unwrap(), 2);
    let first = analysis.snapshot();
    assert_eq!(analysis.init_seed_classes(seeds.as_bytes(), &IdentityMap).unwrap(), 2);

    assert_eq!(analysis.snapshot(), first);
    assert_eq!(analysis.seeds().len(), 2);
}

#[test]
fn test_seeds_are_resolved_through_mapping() {
    let mut program = Program::new();
    let obfuscated = program.add_class("a.a").unwrap();
    let field = program.add_field(obfuscated, "b", "int").unwrap();
    let mut analysis = RetentionAnalysis::new(program, Config::default());

    let map = ProguardMap::parse("com.example.Foo -> a.a:\n    int count -> b\n").unwrap();
    let count = analysis
        .init_seed_classes("com.example.Foo\ncom.example.Foo: int count\n".as_bytes(), &map)
        .unwrap();

    assert_eq!(count, 2);
    assert!(analysis.state(obfuscated).is_seed());
    assert!(analysis.state(field).is_seed());
}

#[test]
fn test_remapped_suffix_bypasses_name_map() {
    let mut program = Program::new();
    let target = program.add_class("z.z").unwrap();
    let mut analysis = RetentionAnalysis::new(program, Config::default());

    let map = ProguardMap::parse("com.example.Foo -> a.a:\n").unwrap();
    let count = analysis
        .init_seed_classes("com.example.Foo -> z.z\n".as_bytes(), &map)
        .unwrap();

    assert_eq!(count, 1);
    assert!(analysis.state(target).is_seed());
}

#[test]
fn test_seeds_are_roots_even_with_shrinking_allowed() {
    let mut analysis = analysis();
    analysis.init_seed_classes("com.example.Bar\n".as_bytes(), &IdentityMap).unwrap();

    let rules = RuleSet::from_yaml("rules:\n  - kind: keepnames\n    class: com.example.Bar\n").unwrap();
    analysis.init_reachable_classes(&rules, &HashSet::new()).unwrap();

    let bar = analysis.program().find_class("com.example.Bar").unwrap();
    let state = analysis.state(bar);
    assert!(state.is_seed());
    assert!(state.keep());
    assert!(state.reachable_from_code());
}

#[test]
fn test_seeds_file_and_mapping_fixtures() {
    let program = keepgraph::ProgramDocument::from_path(&fixtures_path().join("program.yaml"))
        .unwrap()
        .into_program()
        .unwrap();
    let mut analysis = RetentionAnalysis::new(program, Config::default());
    let map = ProguardMap::from_path(&fixtures_path().join("mapping.txt")).unwrap();

    let count = analysis
        .init_seed_classes_from_path(&fixtures_path().join("seeds.txt"), &map)
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(
        analysis.last_seed_report().unwrap().unresolved,
        vec!["com.example.Missing".to_string()]
    );
}

#[test]
fn test_seeds_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "com.example.Foo: int count").unwrap();
    file.flush().unwrap();

    let mut analysis = analysis();
    let count = analysis.init_seed_classes_from_path(file.path(), &IdentityMap).unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_missing_inputs_are_fatal() {
    let mut analysis = analysis();
    let err = analysis
        .init_seed_classes_from_path(&fixtures_path().join("no-such-seeds.txt"), &IdentityMap)
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Io { what: "seeds", .. }));

    let err = ProguardMap::from_path(&fixtures_path().join("no-such-mapping.txt")).unwrap_err();
    assert!(matches!(err, AnalysisError::Io { what: "mapping", .. }));
}

#[test]
fn test_seeded_entity_is_never_blanket_kept() {
    let rules = RuleSet::from_yaml("rules:\n  - kind: keep\n    class: '**'\n").unwrap();

    let mut analysis = analysis();
    analysis.init_seed_classes("com.example.Foo\n".as_bytes(), &IdentityMap).unwrap();
    analysis.init_reachable_classes(&rules, &HashSet::new()).unwrap();

    let program = analysis.program();
    let foo = program.find_class("com.example.Foo").unwrap();
    let bar = program.find_class("com.example.Bar").unwrap();
    assert!(!analysis.state(foo).is_blanket_kept());
    assert!(!analysis.state(foo).can_rename_if_ignoring_blanket_keep());
    assert!(analysis.state(bar).is_blanket_kept());

    // Seeding after the rules ran clears the blanket bit as well
    analysis.init_seed_classes("com.example.Bar\n".as_bytes(), &IdentityMap).unwrap();
    assert!(!analysis.state(bar).is_blanket_kept());
}
