use super::marker::{MarkStats, ReachabilityMarker};
use crate::config::Config;
use crate::graph::Program;
use crate::retention::RetentionTable;
use tracing::debug;

/// Recomputes reachability after passes have mutated the program.
///
/// Always a full recomputation: every `reachable_from_code` bit is cleared
/// and the closure rerun over the current graph. Configuration bits carry
/// over unchanged, so entities a pass removed simply drop out of the table.
pub struct RecomputeEngine<'a> {
    config: &'a Config,
}

impl<'a> RecomputeEngine<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn recompute(&self, program: &Program, table: &mut RetentionTable) -> MarkStats {
        table.sync(program);
        table.clear_reachability();
        debug!("Cleared reachability for {} entities", table.len());

        ReachabilityMarker::new(self.config).mark(program, table)
    }
}
