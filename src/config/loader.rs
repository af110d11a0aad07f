use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options that shape how keep rules turn into retention flags.
///
/// This is the complete set of recognized options. Unknown keys in a
/// configuration file are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Mark entities matched only by untargeted (`class *`) keep rules as blanket kept
    pub track_blanket_keeps: bool,

    /// Conflict policy between keep rules matching the same entity.
    /// `false`: an allowance survives only if no matching keep rule withholds it.
    /// `true`: any rule granting an allowance wins.
    pub permissive_rule_merge: bool,

    /// A reachable class makes all of its members reachable
    pub mark_all_members: bool,

    /// Reflection references (resolved `Class.forName` constants and the like) are edges
    pub reflection_edges: bool,

    /// Annotations naming a program class are edges to that class
    pub annotation_edges: bool,

    /// Entities carrying any of these annotations are pinned
    pub keep_annotations: Vec<String>,

    /// Classes under these package prefixes, and their members, are pinned
    pub keep_packages: Vec<String>,

    /// Apply rules across classes in parallel
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            track_blanket_keeps: true,
            permissive_rule_merge: false,
            mark_all_members: true,
            reflection_edges: true,
            annotation_edges: true,
            keep_annotations: vec![],
            keep_packages: vec![],
            parallel: true,
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML, TOML or JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            "json" => serde_json::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse JSON config"),
            _ => {
                // Try YAML first, then TOML
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".keepgraph.yml",
            ".keepgraph.yaml",
            ".keepgraph.toml",
            ".keepgraph.json",
            "keepgraph.yml",
            "keepgraph.yaml",
            "keepgraph.toml",
            "keepgraph.json",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }

    /// Read options from an optimizer-wide JSON configuration object
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        Config::deserialize(value)
            .into_diagnostic()
            .wrap_err("Failed to read retention options from JSON config")
    }

    /// Whether a class name falls under one of the pinned packages
    pub fn in_keep_package(&self, class_name: &str) -> bool {
        self.keep_packages.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches(".*").trim_end_matches('.');
            class_name
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('$'))
        })
    }

    pub fn has_keep_annotation(&self, annotations: &[String]) -> bool {
        annotations
            .iter()
            .any(|a| self.keep_annotations.iter().any(|k| k == a))
    }
}
