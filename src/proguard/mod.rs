// ProGuard/R8 configuration support
//
// Everything that turns keep configuration into retention state:
// - rules: -keep style rule specifications and their compiled matchers
// - applier: applies rules, pins and no-optimization annotations to a program
// - seeds.txt: entities matched by -keep rules in a previous build
// - mapping.txt: obfuscation mapping used to translate seed names

mod applier;
mod mapping;
mod pattern;
mod rules;
mod seeds;

pub use applier::{ApplyStats, RuleApplier};
pub use mapping::{IdentityMap, NameMap, ProguardMap};
pub use pattern::{NamePattern, ParamPattern};
pub use rules::{
    CompiledMember, CompiledRule, MemberKind, MemberSpecification, RuleKind, RuleSet, RuleSpecification,
};
pub use seeds::{SeedEntry, SeedLoader, SeedMember, SeedReport};
