//! Error types shared by the loaders and the analysis entry points.
//!
//! Everything here is fatal: a retention table computed from partial input
//! could let a later deletion pass remove live code, so callers abort the
//! whole run instead of continuing.

use crate::graph::EntityId;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading analysis inputs or running the analysis
#[derive(Error, Diagnostic, Debug)]
pub enum AnalysisError {
    #[error("Failed to read {what}: {}", path.display())]
    #[diagnostic(code(keepgraph::io))]
    Io {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read seeds")]
    #[diagnostic(code(keepgraph::seeds))]
    SeedRead(#[source] std::io::Error),

    #[error("Failed to parse program document: {0}")]
    #[diagnostic(code(keepgraph::program), help("expected a YAML or JSON document with a top-level `classes` list"))]
    ProgramParse(String),

    #[error("Duplicate class `{0}` in program document")]
    #[diagnostic(code(keepgraph::program))]
    DuplicateClass(String),

    #[error("Failed to parse rule set: {0}")]
    #[diagnostic(code(keepgraph::rules), help("expected a YAML or JSON document with a top-level `rules` list"))]
    RuleParse(String),

    #[error("Invalid wildcard pattern `{pattern}`")]
    #[diagnostic(code(keepgraph::pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid keep rule #{index}: {message}")]
    #[diagnostic(code(keepgraph::rules))]
    InvalidRule { index: usize, message: String },

    #[error("Malformed mapping at line {line}: {content}")]
    #[diagnostic(code(keepgraph::mapping), help("class lines look like `com.example.Foo -> a.a:`"))]
    MalformedMapping { line: usize, content: String },

    #[error("Unknown entity {0}")]
    #[diagnostic(code(keepgraph::entity))]
    UnknownEntity(EntityId),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
