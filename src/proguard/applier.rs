// Keep rule application
//
// Every class is evaluated against every rule. A class and its members are
// only ever written from their own evaluation, so classes are processed in
// parallel and the per-entity grants merged afterwards.

use super::rules::{CompiledRule, RuleKind, RuleSet};
use crate::config::Config;
use crate::error::Result;
use crate::graph::{Entity, EntityId, Program};
use crate::retention::{RetentionFlags, RetentionTable, RuleClasses};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Union of everything the matching rules say about one entity.
///
/// Allowances are collected twice: what some rule granted and what some keep
/// rule withheld. Both only grow, so the merge is commutative and idempotent;
/// the conflict policy is applied once at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Grant {
    keep: bool,
    targeted: bool,
    blanket: bool,
    pinned: bool,
    allowed: RetentionFlags,
    withheld: RetentionFlags,
    assume_no_side_effects: bool,
    classes: RuleClasses,
}

impl Grant {
    fn keep_rule(&mut self, rule: &CompiledRule) {
        self.keep = true;
        if rule.is_blanket() {
            self.blanket = true;
        } else {
            self.targeted = true;
        }
        self.allowed |= rule.allowances;
        self.withheld |= RetentionFlags::ALLOWANCES - rule.allowances;
        self.classes |= rule.kind.rule_classes();
    }

    /// Keep with no shrinking, obfuscation or optimization allowed
    fn pin(&mut self) {
        self.keep = true;
        self.targeted = true;
        self.pinned = true;
        self.withheld |= RetentionFlags::ALLOWANCES;
    }

    fn merge(&mut self, other: &Grant) {
        self.keep |= other.keep;
        self.targeted |= other.targeted;
        self.blanket |= other.blanket;
        self.pinned |= other.pinned;
        self.allowed |= other.allowed;
        self.withheld |= other.withheld;
        self.assume_no_side_effects |= other.assume_no_side_effects;
        self.classes |= other.classes;
    }

    fn resolve(&self, config: &Config) -> RetentionFlags {
        let mut flags = RetentionFlags::empty();
        if self.keep {
            flags |= RetentionFlags::KEEP;
            let allowances = if config.permissive_rule_merge && !self.pinned {
                self.allowed
            } else {
                self.allowed - self.withheld
            };
            flags |= allowances;
            if config.track_blanket_keeps && self.blanket && !self.targeted {
                flags |= RetentionFlags::BLANKET_KEPT;
            }
        }
        if self.assume_no_side_effects {
            flags |= RetentionFlags::ASSUME_NO_SIDE_EFFECTS;
        }
        flags
    }
}

/// Result of evaluating one class and its members
#[derive(Debug, Default)]
struct ClassGrants {
    grants: Vec<(EntityId, Grant)>,
    matched_rules: Vec<usize>,
}

/// Summary of one application pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub rules: usize,
    pub unmatched_rules: usize,
    pub kept: usize,
    pub pinned: usize,
    pub blanket_kept: usize,
    pub assumed_side_effect_free: usize,
}

/// Applies keep rules and no-optimization annotations to a retention table
pub struct RuleApplier<'a> {
    config: &'a Config,
    rules: Vec<CompiledRule>,
    no_optimizations: &'a HashSet<String>,
}

impl<'a> RuleApplier<'a> {
    pub fn new(config: &'a Config, rule_set: &RuleSet, no_optimizations: &'a HashSet<String>) -> Result<Self> {
        Ok(Self {
            config,
            rules: rule_set.compile()?,
            no_optimizations,
        })
    }

    /// Write configuration flags for every entity of `program`.
    ///
    /// Grants are added on top of the configuration bits already in the
    /// table (seeds); nothing already set is cleared.
    pub fn apply(&self, program: &Program, table: &mut RetentionTable) -> ApplyStats {
        let classes: Vec<&Entity> = program.classes().collect();

        let per_class: Vec<ClassGrants> = if self.config.parallel {
            classes
                .par_iter()
                .map(|class| self.evaluate_class(program, class))
                .collect()
        } else {
            classes
                .iter()
                .map(|class| self.evaluate_class(program, class))
                .collect()
        };

        let mut merged: HashMap<EntityId, Grant> = HashMap::new();
        let mut matched: HashSet<usize> = HashSet::new();
        for result in per_class {
            matched.extend(result.matched_rules);
            for (id, grant) in result.grants {
                merged.entry(id).or_default().merge(&grant);
            }
        }

        for rule in &self.rules {
            if !matched.contains(&rule.index) {
                debug!("Rule #{} ({}) matched nothing", rule.index, rule.kind.directive());
            }
        }

        let mut stats = ApplyStats {
            rules: self.rules.len(),
            unmatched_rules: self.rules.len() - matched.len(),
            ..ApplyStats::default()
        };

        for id in program.entity_ids() {
            let grant = merged.get(&id).copied().unwrap_or_default();
            let resolved = grant.resolve(self.config);
            let state = table.get_mut(id);
            let mut flags = (state.flags() & RetentionFlags::CONFIGURATION) | resolved;
            // A seed names the entity explicitly
            if flags.contains(RetentionFlags::SEED) {
                flags.remove(RetentionFlags::BLANKET_KEPT);
            }
            let classes = state.rule_classes() | grant.classes;
            state.set_configuration(flags, classes);

            if grant.keep {
                stats.kept += 1;
            }
            if grant.pinned {
                stats.pinned += 1;
            }
            if flags.contains(RetentionFlags::BLANKET_KEPT) {
                stats.blanket_kept += 1;
            }
            if grant.assume_no_side_effects {
                stats.assumed_side_effect_free += 1;
            }
        }

        info!(
            "Applied {} rules: {} entities kept, {} pinned, {} blanket kept ({} rules matched nothing)",
            stats.rules, stats.kept, stats.pinned, stats.blanket_kept, stats.unmatched_rules
        );

        stats
    }

    fn is_pinned(&self, entity: &Entity) -> bool {
        self.no_optimizations.iter().any(|a| entity.has_annotation(a))
            || self.config.has_keep_annotation(&entity.annotations)
    }

    /// Grants for a class and its members
    fn evaluate_class(&self, program: &Program, class: &Entity) -> ClassGrants {
        let members: Vec<&Entity> = program
            .members(class.id)
            .iter()
            .filter_map(|id| program.entity(*id))
            .collect();

        let mut grants: HashMap<EntityId, Grant> = HashMap::new();
        let mut matched_rules = Vec::new();

        if self.config.in_keep_package(&class.class_name) {
            grants.entry(class.id).or_default().pin();
            for member in &members {
                grants.entry(member.id).or_default().pin();
            }
        }
        if self.is_pinned(class) {
            debug!("Pinned by annotation: {}", class);
            grants.entry(class.id).or_default().pin();
        }
        for member in members.iter().filter(|m| self.is_pinned(m)) {
            debug!("Pinned by annotation: {}", member);
            grants.entry(member.id).or_default().pin();
        }

        for rule in &self.rules {
            if !rule.matches_class(program, class) {
                continue;
            }

            let matching: Vec<&Entity> = members
                .iter()
                .copied()
                .filter(|m| rule.matches_member(m))
                .collect();

            let applies = match rule.kind {
                RuleKind::Keep | RuleKind::KeepNames => {
                    grants.entry(class.id).or_default().keep_rule(rule);
                    for member in &matching {
                        grants.entry(member.id).or_default().keep_rule(rule);
                    }
                    true
                }
                RuleKind::KeepClassMembers | RuleKind::KeepClassMemberNames => {
                    for member in &matching {
                        grants.entry(member.id).or_default().keep_rule(rule);
                    }
                    !matching.is_empty()
                }
                RuleKind::KeepClassesWithMembers | RuleKind::KeepClassesWithMemberNames => {
                    let all_present = rule
                        .members
                        .iter()
                        .all(|spec| members.iter().any(|m| spec.matches(m)));
                    if all_present {
                        grants.entry(class.id).or_default().keep_rule(rule);
                        for member in &matching {
                            grants.entry(member.id).or_default().keep_rule(rule);
                        }
                    }
                    all_present
                }
                RuleKind::AssumeNoSideEffects => {
                    for member in &matching {
                        grants.entry(member.id).or_default().assume_no_side_effects = true;
                    }
                    !matching.is_empty()
                }
            };

            if applies {
                matched_rules.push(rule.index);
            }
        }

        ClassGrants {
            grants: grants.into_iter().collect(),
            matched_rules,
        }
    }
}
