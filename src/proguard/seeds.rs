// ProGuard/R8 seeds.txt loading
//
// The seeds file lists the entities matched by -keep rules in a previous
// build, one per line, written with original names:
// ```
// com.example.Foo
// com.example.Foo: int count
// com.example.Foo: void run(int,java.lang.String)
// com.example.Foo: Foo(int)
// com.example.Bar -> a.b
// ```
// A trailing ` -> name` gives the program name directly and bypasses the
// name map. `#` starts a comment.

use super::mapping::NameMap;
use crate::error::{AnalysisError, Result};
use crate::graph::{EntityId, Program, CONSTRUCTOR_NAME};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Member part of a seed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedMember {
    Field { name: String },
    Method { name: String, params: Vec<String> },
    Constructor { params: Vec<String> },
}

/// One parsed seed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedEntry {
    pub class_name: String,
    pub member: Option<SeedMember>,
    pub remapped: Option<String>,
}

impl SeedEntry {
    /// Parse a seed line; blank and comment lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            return None;
        }

        let (body, remapped) = match line.rsplit_once(" -> ") {
            Some((body, remapped)) => (body.trim(), Some(remapped.trim().to_string())),
            None => (line, None),
        };

        let Some((class_name, member)) = body.split_once(':') else {
            return Some(Self {
                class_name: body.to_string(),
                member: None,
                remapped,
            });
        };

        let class_name = class_name.trim().to_string();
        let member = member.trim();

        let member = if let Some(open) = member.find('(') {
            let close = member.rfind(')').unwrap_or(member.len());
            let params: Vec<String> = member[open + 1..close.max(open + 1)]
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            let head: Vec<&str> = member[..open].split_whitespace().collect();
            match head.as_slice() {
                [name] if *name == CONSTRUCTOR_NAME || class_name.ends_with(*name) => {
                    SeedMember::Constructor { params }
                }
                [.., name] => SeedMember::Method {
                    name: name.to_string(),
                    params,
                },
                [] => return None,
            }
        } else {
            let name = member.split_whitespace().last()?;
            SeedMember::Field { name: name.to_string() }
        };

        Some(Self {
            class_name,
            member: Some(member),
            remapped,
        })
    }

    fn display(&self) -> String {
        match &self.member {
            None => self.class_name.clone(),
            Some(SeedMember::Field { name }) => format!("{}.{}", self.class_name, name),
            Some(SeedMember::Method { name, params }) => {
                format!("{}.{}({})", self.class_name, name, params.join(","))
            }
            Some(SeedMember::Constructor { params }) => {
                format!("{}.{}({})", self.class_name, CONSTRUCTOR_NAME, params.join(","))
            }
        }
    }
}

/// Outcome of loading a seeds source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Entities the seeds resolved to, in file order without duplicates
    pub resolved: Vec<EntityId>,
    /// Seed names that matched nothing in the program
    pub unresolved: Vec<String>,
}

impl SeedReport {
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }
}

/// Resolves seed names against a program
pub struct SeedLoader<'a> {
    program: &'a Program,
    name_map: &'a dyn NameMap,
}

impl<'a> SeedLoader<'a> {
    pub fn new(program: &'a Program, name_map: &'a dyn NameMap) -> Self {
        Self { program, name_map }
    }

    /// Load seeds from a file. The file is closed before returning.
    pub fn load_path(&self, path: &Path) -> Result<SeedReport> {
        let file = File::open(path).map_err(|source| AnalysisError::Io {
            what: "seeds",
            path: path.to_path_buf(),
            source,
        })?;
        self.load(BufReader::new(file))
    }

    /// Load seeds from any line source. Read errors are fatal, unresolved names are not.
    pub fn load<R: BufRead>(&self, reader: R) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        for line in reader.lines() {
            let line = line.map_err(AnalysisError::SeedRead)?;
            let Some(entry) = SeedEntry::parse(&line) else {
                continue;
            };

            match self.resolve(&entry) {
                Some(id) => {
                    if !report.resolved.contains(&id) {
                        report.resolved.push(id);
                    }
                }
                None => {
                    debug!("Unresolved seed: {}", entry.display());
                    report.unresolved.push(entry.display());
                }
            }
        }

        if !report.unresolved.is_empty() {
            warn!(
                "{} seeds did not resolve against the program (first: {})",
                report.unresolved.len(),
                report.unresolved[0]
            );
        }
        info!("Resolved {} seeds", report.resolved.len());

        Ok(report)
    }

    /// Resolve one seed entry to a program entity
    pub fn resolve(&self, entry: &SeedEntry) -> Option<EntityId> {
        let map = self.name_map;

        let class_name = match (&entry.member, &entry.remapped) {
            (None, Some(remapped)) => remapped.clone(),
            _ => map.translate_class(&entry.class_name),
        };
        let class = self.program.find_class(&class_name)?;

        match &entry.member {
            None => Some(class),
            Some(SeedMember::Field { name }) => {
                let name = entry
                    .remapped
                    .clone()
                    .unwrap_or_else(|| map.translate_field(&entry.class_name, name));
                self.program.find_field(class, &name)
            }
            Some(SeedMember::Method { name, params }) => {
                let name = entry
                    .remapped
                    .clone()
                    .unwrap_or_else(|| map.translate_method(&entry.class_name, name, params));
                let params: Vec<String> = params.iter().map(|p| map.translate_type(p)).collect();
                self.program.find_method(class, &name, &params)
            }
            Some(SeedMember::Constructor { params }) => {
                let params: Vec<String> = params.iter().map(|p| map.translate_type(p)).collect();
                self.program.find_method(class, CONSTRUCTOR_NAME, &params)
            }
        }
    }
}
