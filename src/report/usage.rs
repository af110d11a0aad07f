// ProGuard-style usage.txt output
//
// Lists every entity that can be deleted if unused:
// ```
// com.example.UnusedClass
// com.example.PartiallyUsedClass
//     int unusedField
//     void unusedMethod(java.lang.String)
// ```
// A removable class is listed alone; its members go with it.

use crate::analysis::RetentionAnalysis;
use crate::graph::Entity;
use crate::retention::Retainable;
use miette::{IntoDiagnostic, Result};
use std::fmt::Write as _;
use std::path::PathBuf;

pub struct UsageReporter {
    output_path: Option<PathBuf>,
}

impl UsageReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn report(&self, analysis: &RetentionAnalysis) -> Result<()> {
        let usage = Self::render(analysis);

        if let Some(path) = &self.output_path {
            std::fs::write(path, &usage).into_diagnostic()?;
            println!("Usage written to: {}", path.display());
        } else {
            print!("{}", usage);
        }

        Ok(())
    }

    pub fn render(analysis: &RetentionAnalysis) -> String {
        let program = analysis.program();
        let mut classes: Vec<&Entity> = program.classes().collect();
        classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));

        let mut out = String::new();
        for class in classes {
            if analysis.state(class.id).can_delete_if_unused() {
                let _ = writeln!(out, "{}", class.class_name);
                continue;
            }

            let members: Vec<String> = program
                .members(class.id)
                .iter()
                .filter(|id| analysis.state(**id).can_delete_if_unused())
                .filter_map(|id| program.entity(*id))
                .filter_map(|member| member.member_signature())
                .collect();
            if members.is_empty() {
                continue;
            }

            let _ = writeln!(out, "{}", class.class_name);
            for signature in members {
                let _ = writeln!(out, "    {}", signature);
            }
        }
        out
    }
}
