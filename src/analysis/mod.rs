// Retention analysis: seeds and keep rules in, per-entity retention state out
//
// Phases run in a fixed order:
// 1. init_seed_classes: resolve seeds.txt entries to entities (seed + keep)
// 2. init_reachable_classes: apply keep rules and annotations, then mark
//    everything reachable from the roots
// 3. recompute_classes_reachable_from_code: after program mutations, redo
//    the reachability closure with the configuration bits unchanged

mod marker;
mod recompute;

pub use marker::{MarkStats, ReachabilityMarker};
pub use recompute::RecomputeEngine;

use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::graph::{EntityId, Program};
use crate::proguard::{ApplyStats, NameMap, RuleApplier, RuleSet, SeedLoader, SeedReport};
use crate::retention::{Retained, RetentionState, RetentionTable};
use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;
use tracing::info;

/// Apply rules to `table` and mark reachability.
///
/// Existing configuration bits (seeds) are kept; grants are added on top.
/// The rule set is compiled before the table is touched, so an invalid rule
/// leaves the table as it was.
pub fn init_reachable_classes(
    program: &Program,
    table: &mut RetentionTable,
    config: &Config,
    rule_set: &RuleSet,
    no_optimizations: &HashSet<String>,
) -> Result<(ApplyStats, MarkStats)> {
    let applier = RuleApplier::new(config, rule_set, no_optimizations)?;

    table.sync(program);
    table.clear_reachability();
    let applied = applier.apply(program, table);
    let marked = ReachabilityMarker::new(config).mark(program, table);

    Ok((applied, marked))
}

/// Clear and recompute `reachable_from_code` over the current program
pub fn recompute_classes_reachable_from_code(
    program: &Program,
    table: &mut RetentionTable,
    config: &Config,
) -> MarkStats {
    RecomputeEngine::new(config).recompute(program, table)
}

/// Owns a program together with its retention table and runs the phases
/// against it.
pub struct RetentionAnalysis {
    program: Program,
    config: Config,
    table: RetentionTable,
    seeds: Vec<EntityId>,
    last_seeds: Option<SeedReport>,
    last_apply: Option<ApplyStats>,
    last_mark: Option<MarkStats>,
}

impl RetentionAnalysis {
    pub fn new(program: Program, config: Config) -> Self {
        let table = RetentionTable::for_program(&program);
        Self {
            program,
            config,
            table,
            seeds: Vec::new(),
            last_seeds: None,
            last_apply: None,
            last_mark: None,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Mutable access for optimization passes. Call
    /// [`Self::recompute_classes_reachable_from_code`] afterwards.
    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.program
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> &RetentionTable {
        &self.table
    }

    /// Copy of the current retention table
    pub fn snapshot(&self) -> RetentionTable {
        self.table.clone()
    }

    pub fn state(&self, id: EntityId) -> RetentionState {
        self.table.get(id)
    }

    pub fn retained(&self, id: EntityId) -> Result<Retained<'_>> {
        let entity = self.program.entity(id).ok_or(AnalysisError::UnknownEntity(id))?;
        Ok(Retained {
            entity,
            state: self.table.get(id),
        })
    }

    /// Resolve seeds and mark each resolved entity as seed and kept.
    ///
    /// Returns the number of resolved entities. Unresolved names are logged
    /// and counted in [`Self::last_seed_report`]; only read failures are errors.
    pub fn init_seed_classes<R: BufRead>(&mut self, seeds: R, name_map: &dyn NameMap) -> Result<usize> {
        let report = SeedLoader::new(&self.program, name_map).load(seeds)?;
        Ok(self.record_seeds(report))
    }

    pub fn init_seed_classes_from_path(&mut self, path: &Path, name_map: &dyn NameMap) -> Result<usize> {
        let report = SeedLoader::new(&self.program, name_map).load_path(path)?;
        Ok(self.record_seeds(report))
    }

    fn record_seeds(&mut self, report: SeedReport) -> usize {
        self.table.sync(&self.program);
        for &id in &report.resolved {
            self.table.get_mut(id).set_seed();
            if !self.seeds.contains(&id) {
                self.seeds.push(id);
            }
        }
        let count = report.resolved_count();
        self.last_seeds = Some(report);
        count
    }

    /// Recompute every configuration bit from the remembered seeds and
    /// `rule_set`, then mark reachability.
    ///
    /// Starts from a clean table each time, so repeated calls give identical
    /// state.
    pub fn init_reachable_classes(
        &mut self,
        rule_set: &RuleSet,
        no_optimizations: &HashSet<String>,
    ) -> Result<MarkStats> {
        let applier = RuleApplier::new(&self.config, rule_set, no_optimizations)?;

        self.table.sync(&self.program);
        self.table.reset();
        self.seeds.retain(|id| self.program.contains(*id));
        for &id in &self.seeds {
            self.table.get_mut(id).set_seed();
        }

        let applied = applier.apply(&self.program, &mut self.table);
        let marked = ReachabilityMarker::new(&self.config).mark(&self.program, &mut self.table);
        info!(
            "Retention: {} seeds, {} kept, {} reachable",
            self.seeds.len(),
            applied.kept,
            marked.reachable
        );

        self.last_apply = Some(applied);
        self.last_mark = Some(marked);
        Ok(marked)
    }

    pub fn recompute_classes_reachable_from_code(&mut self) -> MarkStats {
        let marked = RecomputeEngine::new(&self.config).recompute(&self.program, &mut self.table);
        self.last_mark = Some(marked);
        marked
    }

    pub fn seeds(&self) -> &[EntityId] {
        &self.seeds
    }

    pub fn last_seed_report(&self) -> Option<&SeedReport> {
        self.last_seeds.as_ref()
    }

    pub fn last_apply(&self) -> Option<&ApplyStats> {
        self.last_apply.as_ref()
    }

    pub fn last_mark(&self) -> Option<MarkStats> {
        self.last_mark
    }
}
