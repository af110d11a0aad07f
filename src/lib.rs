//! keepgraph - Keep-rule driven retention analysis for bytecode optimizers
//!
//! Decides, for every class, method and field of a whole program, whether an
//! optimizer may delete, rename or optimize it. The answer combines explicit
//! configuration (seeds and keep rules) with reachability from code.
//!
//! # Architecture
//!
//! The analysis pipeline consists of:
//! 1. **Program loading** - Build the entity/reference graph from a program document
//! 2. **Seeds** - Resolve `seeds.txt` entries, translated through `mapping.txt`
//! 3. **Rule application** - Turn keep rules and annotations into retention flags
//! 4. **Marking** - Breadth-first closure from the roots sets `reachable_from_code`
//! 5. **Recomputation** - Rerun marking after passes mutate the program
//! 6. **Reporting** - Terminal, JSON or ProGuard `usage.txt` output

pub mod analysis;
pub mod config;
pub mod error;
pub mod graph;
pub mod proguard;
pub mod report;
pub mod retention;

pub use analysis::{
    init_reachable_classes, recompute_classes_reachable_from_code, MarkStats, ReachabilityMarker,
    RecomputeEngine, RetentionAnalysis,
};
pub use config::Config;
pub use error::{AnalysisError, Result};
pub use graph::{Entity, EntityId, EntityKind, Program, ProgramDocument, Reference, ReferenceKind};
pub use proguard::{IdentityMap, NameMap, ProguardMap, RuleApplier, RuleKind, RuleSet, RuleSpecification, SeedLoader};
pub use report::{ReportFormat, Reporter};
pub use retention::{Retainable, RetentionFlags, RetentionState, RetentionTable};
