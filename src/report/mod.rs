mod json;
mod terminal;
mod usage;

pub use json::JsonReporter;
pub use terminal::TerminalReporter;
pub use usage::UsageReporter;

use crate::analysis::{MarkStats, RetentionAnalysis};
use crate::graph::{Entity, EntityKind};
use crate::retention::{Retainable, RetentionFlags, RetentionState};
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Terminal,
    Json,
    /// ProGuard `usage.txt` listing of removable entities
    Usage,
}

/// Reporter for retention analysis results
pub struct Reporter {
    format: ReportFormat,
    output_path: Option<PathBuf>,
}

impl Reporter {
    pub fn new(format: ReportFormat, output_path: Option<PathBuf>) -> Self {
        Self { format, output_path }
    }

    pub fn report(&self, analysis: &RetentionAnalysis) -> Result<()> {
        let summary = RetentionSummary::from_analysis(analysis);
        match self.format {
            ReportFormat::Terminal => TerminalReporter::new().report(&summary),
            ReportFormat::Json => JsonReporter::new(self.output_path.clone()).report(&summary),
            ReportFormat::Usage => UsageReporter::new(self.output_path.clone()).report(analysis),
        }
    }
}

/// Counts over the whole retention table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionCounts {
    pub entities: usize,
    pub classes: usize,
    pub seeds: usize,
    pub kept: usize,
    pub roots: usize,
    pub do_not_touch: usize,
    pub blanket_kept: usize,
    pub assume_no_side_effects: usize,
    pub reachable: usize,
    pub deletable: usize,
    pub renamable: usize,
}

/// One entity row in a report
#[derive(Debug, Clone, Serialize)]
pub struct EntityRow {
    pub name: String,
    pub kind: EntityKind,
    pub flags: RetentionFlags,
    pub root: bool,
    pub do_not_touch: bool,
    pub can_rename: bool,
    pub can_delete_if_unused: bool,
}

impl EntityRow {
    fn new(entity: &Entity, state: &RetentionState) -> Self {
        Self {
            name: entity.qualified_name(),
            kind: entity.kind,
            flags: state.flags(),
            root: state.root(),
            do_not_touch: state.do_not_touch(),
            can_rename: state.can_rename(),
            can_delete_if_unused: state.can_delete_if_unused(),
        }
    }
}

/// Everything a reporter needs, computed once from an analysis
#[derive(Debug, Clone, Serialize)]
pub struct RetentionSummary {
    pub counts: RetentionCounts,
    pub mark: Option<MarkStats>,
    pub unresolved_seeds: Vec<String>,
    pub entities: Vec<EntityRow>,
}

impl RetentionSummary {
    pub fn from_analysis(analysis: &RetentionAnalysis) -> Self {
        let mut counts = RetentionCounts::default();
        let mut entities = Vec::new();

        for entity in analysis.program().entities() {
            let state = analysis.state(entity.id);
            counts.entities += 1;
            if entity.kind == EntityKind::Class {
                counts.classes += 1;
            }
            if state.has(RetentionFlags::SEED) {
                counts.seeds += 1;
            }
            if state.keep() {
                counts.kept += 1;
            }
            if state.root() {
                counts.roots += 1;
            }
            if state.do_not_touch() {
                counts.do_not_touch += 1;
            }
            if state.is_blanket_kept() {
                counts.blanket_kept += 1;
            }
            if state.assumenosideeffects() {
                counts.assume_no_side_effects += 1;
            }
            if state.reachable_from_code() {
                counts.reachable += 1;
            }
            if state.can_delete_if_unused() {
                counts.deletable += 1;
            }
            if state.can_rename() {
                counts.renamable += 1;
            }
            entities.push(EntityRow::new(entity, &state));
        }

        Self {
            counts,
            mark: analysis.last_mark(),
            unresolved_seeds: analysis
                .last_seed_report()
                .map(|r| r.unresolved.clone())
                .unwrap_or_default(),
            entities,
        }
    }
}
