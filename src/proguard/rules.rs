// Structured keep rules
//
// The rule set arrives already parsed from ProGuard configuration text; this
// module only defines its shape, loads it from YAML/JSON and compiles the
// wildcard patterns.

use super::pattern::{NamePattern, ParamPattern};
use crate::error::{AnalysisError, Result};
use crate::graph::{Entity, EntityKind, Program};
use crate::retention::{RetentionFlags, RuleClasses};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// ProGuard directive a rule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Keep,
    KeepClassMembers,
    KeepClassesWithMembers,
    KeepNames,
    KeepClassMemberNames,
    KeepClassesWithMemberNames,
    AssumeNoSideEffects,
}

impl RuleKind {
    /// The `*names` variants behave like their base directive with `allowshrinking`
    pub fn base(&self) -> RuleKind {
        match self {
            RuleKind::KeepNames => RuleKind::Keep,
            RuleKind::KeepClassMemberNames => RuleKind::KeepClassMembers,
            RuleKind::KeepClassesWithMemberNames => RuleKind::KeepClassesWithMembers,
            other => *other,
        }
    }

    pub fn implies_allowshrinking(&self) -> bool {
        matches!(
            self,
            RuleKind::KeepNames | RuleKind::KeepClassMemberNames | RuleKind::KeepClassesWithMemberNames
        )
    }

    pub fn rule_classes(&self) -> RuleClasses {
        match self.base() {
            RuleKind::KeepClassMembers => RuleClasses::KEEP_CLASS_MEMBERS,
            RuleKind::KeepClassesWithMembers => RuleClasses::KEEP_CLASSES_WITH_MEMBERS,
            _ => RuleClasses::empty(),
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            RuleKind::Keep => "-keep",
            RuleKind::KeepClassMembers => "-keepclassmembers",
            RuleKind::KeepClassesWithMembers => "-keepclasseswithmembers",
            RuleKind::KeepNames => "-keepnames",
            RuleKind::KeepClassMemberNames => "-keepclassmembernames",
            RuleKind::KeepClassesWithMemberNames => "-keepclasseswithmembernames",
            RuleKind::AssumeNoSideEffects => "-assumenosideeffects",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Field,
    #[default]
    Any,
}

/// Member part of a rule, e.g. `public void on*(...);`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpecification {
    #[serde(default)]
    pub kind: MemberKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Parameter list pattern; methods only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,

    /// Return type for methods, declared type for fields
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl MemberSpecification {
    /// `{ *; }`
    pub fn any() -> Self {
        Self::default()
    }

    pub fn method(name: &str, params: &str) -> Self {
        Self {
            kind: MemberKind::Method,
            name: Some(name.to_string()),
            params: Some(params.to_string()),
            ..Self::default()
        }
    }

    pub fn field(name: &str) -> Self {
        Self {
            kind: MemberKind::Field,
            name: Some(name.to_string()),
            ..Self::default()
        }
    }
}

/// One keep rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpecification {
    pub kind: RuleKind,

    /// Class name pattern
    #[serde(rename = "class", default = "any_class")]
    pub class_name: String,

    /// Required super class or interface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Required class annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,

    /// Restrict to interfaces (`true`) or to non-interface classes (`false`)
    #[serde(default, rename = "interface", skip_serializing_if = "Option::is_none")]
    pub is_interface: Option<bool>,

    #[serde(default)]
    pub members: Vec<MemberSpecification>,

    #[serde(default)]
    pub allowshrinking: bool,

    #[serde(default)]
    pub allowobfuscation: bool,

    #[serde(default)]
    pub allowoptimization: bool,
}

fn any_class() -> String {
    "**".to_string()
}

impl RuleSpecification {
    pub fn new(kind: RuleKind, class_name: &str) -> Self {
        Self {
            kind,
            class_name: class_name.to_string(),
            extends: None,
            annotation: None,
            is_interface: None,
            members: Vec::new(),
            allowshrinking: false,
            allowobfuscation: false,
            allowoptimization: false,
        }
    }

    pub fn keep(class_name: &str) -> Self {
        Self::new(RuleKind::Keep, class_name)
    }

    pub fn with_member(mut self, member: MemberSpecification) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_extends(mut self, super_type: &str) -> Self {
        self.extends = Some(super_type.to_string());
        self
    }

    pub fn allow_shrinking(mut self) -> Self {
        self.allowshrinking = true;
        self
    }

    pub fn allow_obfuscation(mut self) -> Self {
        self.allowobfuscation = true;
        self
    }

    pub fn allow_optimization(mut self) -> Self {
        self.allowoptimization = true;
        self
    }

    /// Permissions this rule grants to the entities it keeps
    pub fn allowances(&self) -> RetentionFlags {
        let mut flags = RetentionFlags::empty();
        if self.allowshrinking || self.kind.implies_allowshrinking() {
            flags |= RetentionFlags::ALLOW_SHRINKING;
        }
        if self.allowobfuscation {
            flags |= RetentionFlags::ALLOW_OBFUSCATION;
        }
        if self.allowoptimization {
            flags |= RetentionFlags::ALLOW_OPTIMIZATION;
        }
        flags
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.kind == RuleKind::AssumeNoSideEffects {
            if self.members.is_empty() || self.members.iter().any(|m| m.kind == MemberKind::Field) {
                return Err(AnalysisError::InvalidRule {
                    index,
                    message: "-assumenosideeffects needs method specifications".to_string(),
                });
            }
            if !self.allowances().is_empty() {
                return Err(AnalysisError::InvalidRule {
                    index,
                    message: "-assumenosideeffects does not take keep modifiers".to_string(),
                });
            }
        }

        if self.members.iter().any(|m| m.kind == MemberKind::Field && m.params.is_some()) {
            return Err(AnalysisError::InvalidRule {
                index,
                message: "field specifications cannot have parameters".to_string(),
            });
        }

        Ok(())
    }
}

/// The full set of keep rules for one optimizer run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub rules: Vec<RuleSpecification>,
}

impl RuleSet {
    pub fn new(rules: Vec<RuleSpecification>) -> Self {
        Self { rules }
    }

    /// Load a rule set; `.json` files use JSON, everything else YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            what: "rule set",
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&contents).map_err(|e| AnalysisError::RuleParse(e.to_string()))
        } else {
            Self::from_yaml(&contents)
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| AnalysisError::RuleParse(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validate and compile every rule. Any bad rule fails the whole set.
    pub fn compile(&self) -> Result<Vec<CompiledRule>> {
        self.rules
            .iter()
            .enumerate()
            .map(|(index, rule)| CompiledRule::new(index, rule))
            .collect()
    }
}

/// A member specification with its patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledMember {
    kind: MemberKind,
    name: NamePattern,
    params: ParamPattern,
    type_name: NamePattern,
    annotation: Option<NamePattern>,
}

impl CompiledMember {
    fn new(spec: &MemberSpecification) -> Result<Self> {
        Ok(Self {
            kind: spec.kind,
            name: compile_or_any(spec.name.as_deref())?,
            params: match spec.params.as_deref() {
                Some(p) => ParamPattern::new(p)?,
                None => ParamPattern::any(),
            },
            type_name: compile_or_any(spec.type_name.as_deref())?,
            annotation: spec.annotation.as_deref().map(NamePattern::new).transpose()?,
        })
    }

    pub fn matches(&self, member: &Entity) -> bool {
        let kind_ok = match self.kind {
            MemberKind::Method => member.kind == EntityKind::Method,
            MemberKind::Field => member.kind == EntityKind::Field,
            MemberKind::Any => member.kind.is_member(),
        };
        if !kind_ok || !self.name.matches(&member.name) {
            return false;
        }
        if member.kind == EntityKind::Method && !self.params.matches(&member.params) {
            return false;
        }
        if !self.type_name.matches(member.type_name.as_deref().unwrap_or("void")) {
            return false;
        }
        match &self.annotation {
            Some(pattern) => member.annotations.iter().any(|a| pattern.matches(a)),
            None => true,
        }
    }
}

fn compile_or_any(pattern: Option<&str>) -> Result<NamePattern> {
    match pattern {
        Some(p) => NamePattern::new(p),
        None => Ok(NamePattern::any()),
    }
}

/// A rule ready to be matched against program entities
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub index: usize,
    pub kind: RuleKind,
    class: NamePattern,
    extends: Option<NamePattern>,
    annotation: Option<NamePattern>,
    is_interface: Option<bool>,
    pub members: Vec<CompiledMember>,
    pub allowances: RetentionFlags,
}

impl CompiledRule {
    pub fn new(index: usize, rule: &RuleSpecification) -> Result<Self> {
        rule.validate(index)?;

        Ok(Self {
            index,
            kind: rule.kind,
            class: NamePattern::new(&rule.class_name)?,
            extends: rule.extends.as_deref().map(NamePattern::new).transpose()?,
            annotation: rule.annotation.as_deref().map(NamePattern::new).transpose()?,
            is_interface: rule.is_interface,
            members: rule
                .members
                .iter()
                .map(CompiledMember::new)
                .collect::<Result<Vec<_>>>()?,
            allowances: rule.allowances(),
        })
    }

    /// A rule with no specific target: `class *` or `class **` without further restriction
    pub fn is_blanket(&self) -> bool {
        self.class.is_unconstrained()
            && self.extends.is_none()
            && self.annotation.is_none()
            && self.is_interface.is_none()
    }

    pub fn matches_class(&self, program: &Program, class: &Entity) -> bool {
        if class.kind != EntityKind::Class || !self.class.matches(&class.class_name) {
            return false;
        }
        if let Some(is_interface) = self.is_interface {
            if class.is_interface != is_interface {
                return false;
            }
        }
        if let Some(pattern) = &self.annotation {
            if !class.annotations.iter().any(|a| pattern.matches(a)) {
                return false;
            }
        }
        match &self.extends {
            Some(pattern) => all_super_type_names(program, class)
                .iter()
                .any(|name| pattern.matches(name)),
            None => true,
        }
    }

    /// Whether any member specification matches `member`
    pub fn matches_member(&self, member: &Entity) -> bool {
        self.members.iter().any(|spec| spec.matches(member))
    }
}

/// Names of every transitive super type, including ones outside the program
fn all_super_type_names(program: &Program, class: &Entity) -> Vec<String> {
    let mut names = Vec::new();
    let mut seen = HashSet::new();
    let mut worklist: Vec<String> = class.super_types.clone();

    while let Some(name) = worklist.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        if let Some(super_class) = program.find_class(&name).and_then(|id| program.entity(id)) {
            worklist.extend(super_class.super_types.iter().cloned());
        }
        names.push(name);
    }

    names
}
