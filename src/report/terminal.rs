use super::{EntityRow, RetentionSummary};
use colored::Colorize;
use miette::Result;

/// Terminal reporter with colored output
#[derive(Debug, Default)]
pub struct TerminalReporter;

impl TerminalReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report(&self, summary: &RetentionSummary) -> Result<()> {
        let counts = &summary.counts;

        println!();
        println!(
            "{}",
            format!(
                "Retention for {} entities ({} classes)",
                counts.entities, counts.classes
            )
            .bold()
        );
        println!("{}", "─".repeat(60).dimmed());

        println!("  {:<24} {}", "seeds", counts.seeds.to_string().cyan());
        println!("  {:<24} {}", "kept", counts.kept.to_string().cyan());
        println!("  {:<24} {}", "roots", counts.roots.to_string().cyan());
        println!("  {:<24} {}", "do not touch", counts.do_not_touch.to_string().cyan());
        println!("  {:<24} {}", "blanket kept", counts.blanket_kept.to_string().cyan());
        println!(
            "  {:<24} {}",
            "assume no side effects",
            counts.assume_no_side_effects.to_string().cyan()
        );
        println!("  {:<24} {}", "reachable from code", counts.reachable.to_string().green());
        println!("  {:<24} {}", "renamable", counts.renamable.to_string().cyan());
        println!(
            "  {:<24} {}",
            "deletable if unused",
            counts.deletable.to_string().yellow().bold()
        );

        if let Some(mark) = &summary.mark {
            println!(
                "{}",
                format!(
                    "  marking: {} roots, {} edges followed",
                    mark.roots, mark.edges
                )
                .dimmed()
            );
        }

        if !summary.unresolved_seeds.is_empty() {
            println!();
            println!(
                "{}",
                format!("{} unresolved seeds:", summary.unresolved_seeds.len())
                    .yellow()
                    .bold()
            );
            for seed in &summary.unresolved_seeds {
                println!("  {} {}", "?".yellow(), seed);
            }
        }

        if counts.deletable > 0 {
            println!();
            println!("{}", "Deletable if unused:".yellow().bold());
            for row in summary.entities.iter().filter(|r| r.can_delete_if_unused) {
                self.print_row(row);
            }
        }

        if counts.deletable == 0 {
            println!();
            println!("{}", "Everything is retained.".green().bold());
        }

        Ok(())
    }

    fn print_row(&self, row: &EntityRow) {
        println!(
            "  {} {} {}",
            "→".dimmed(),
            row.kind.display_name().dimmed(),
            row.name.white()
        );
    }
}

