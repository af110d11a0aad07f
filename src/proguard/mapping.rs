// ProGuard/R8 mapping.txt support
//
// The mapping file records how original names were renamed:
// ```
// com.example.Foo -> a.a:
//     int count -> a
//     12:14:void run(int) -> b
// ```
// Seeds are written against original names, so they are translated through
// the mapping before being looked up in a (possibly obfuscated) program.

use crate::error::{AnalysisError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Translation from original names to the names used in the analyzed program.
///
/// Names the map does not know are returned unchanged.
pub trait NameMap {
    fn translate_class(&self, original: &str) -> String;

    fn translate_field(&self, original_class: &str, field: &str) -> String;

    fn translate_method(&self, original_class: &str, method: &str, params: &[String]) -> String;

    /// Translate a type name, keeping primitive and array syntax
    fn translate_type(&self, original: &str) -> String {
        let base = original.trim_end_matches("[]");
        let dims = &original[base.len()..];
        format!("{}{}", self.translate_class(base), dims)
    }
}

/// Name map for programs that were never obfuscated
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityMap;

impl NameMap for IdentityMap {
    fn translate_class(&self, original: &str) -> String {
        original.to_string()
    }

    fn translate_field(&self, _original_class: &str, field: &str) -> String {
        field.to_string()
    }

    fn translate_method(&self, _original_class: &str, method: &str, _params: &[String]) -> String {
        method.to_string()
    }
}

/// Parsed mapping.txt
#[derive(Debug, Clone, Default)]
pub struct ProguardMap {
    classes: HashMap<String, String>,
    /// (original class, original field) -> obfuscated field
    fields: HashMap<(String, String), String>,
    /// (original class, original method, original params) -> obfuscated method
    methods: HashMap<(String, String, String), String>,
}

impl ProguardMap {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            what: "mapping",
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut map = ProguardMap::default();
        let mut current_class: Option<String> = None;

        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim_end();
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let malformed = || AnalysisError::MalformedMapping {
                line: index + 1,
                content: raw.to_string(),
            };

            // Lines starting with whitespace are members of the current class
            if line.starts_with(' ') || line.starts_with('\t') {
                let Some(class_name) = &current_class else {
                    return Err(malformed());
                };
                let (original, obfuscated) = trimmed.split_once(" -> ").ok_or_else(malformed)?;
                map.add_member(class_name, original, obfuscated.trim(), malformed)?;
            } else {
                let (original, obfuscated) = trimmed
                    .strip_suffix(':')
                    .and_then(|l| l.split_once(" -> "))
                    .ok_or_else(malformed)?;
                let original = original.trim().to_string();
                map.classes.insert(original.clone(), obfuscated.trim().to_string());
                current_class = Some(original);
            }
        }

        Ok(map)
    }

    fn add_member(
        &mut self,
        class_name: &str,
        original: &str,
        obfuscated: &str,
        malformed: impl Fn() -> AnalysisError,
    ) -> Result<()> {
        // Drop R8 line number ranges: "12:14:void run(int):30:32"
        let without_prefix = original.trim_start_matches(|c: char| c.is_ascii_digit() || c == ':');

        if let Some(open) = without_prefix.find('(') {
            let close = without_prefix[open..].find(')').ok_or_else(&malformed)? + open;
            let name = without_prefix[..open]
                .split_whitespace()
                .last()
                .unwrap_or_default()
                .to_string();
            let params = without_prefix[open + 1..close].replace(' ', "");
            self.methods
                .insert((class_name.to_string(), name, params), obfuscated.to_string());
        } else if let Some(name) = without_prefix.split_whitespace().last() {
            self.fields
                .insert((class_name.to_string(), name.to_string()), obfuscated.to_string());
        } else {
            return Err(malformed());
        }
        Ok(())
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl NameMap for ProguardMap {
    fn translate_class(&self, original: &str) -> String {
        self.classes
            .get(original)
            .cloned()
            .unwrap_or_else(|| original.to_string())
    }

    fn translate_field(&self, original_class: &str, field: &str) -> String {
        self.fields
            .get(&(original_class.to_string(), field.to_string()))
            .cloned()
            .unwrap_or_else(|| field.to_string())
    }

    fn translate_method(&self, original_class: &str, method: &str, params: &[String]) -> String {
        self.methods
            .get(&(original_class.to_string(), method.to_string(), params.join(",")))
            .cloned()
            .unwrap_or_else(|| method.to_string())
    }
}
