use super::{EntityId, EntityKind, Program, ReferenceKind};
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Serialized program representation produced by a class-file front end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramDocument {
    pub classes: Vec<ClassDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassDocument {
    pub name: String,

    #[serde(default, rename = "super", skip_serializing_if = "Option::is_none")]
    pub super_class: Option<String>,

    #[serde(default)]
    pub interfaces: Vec<String>,

    #[serde(default, rename = "interface")]
    pub is_interface: bool,

    #[serde(default)]
    pub annotations: Vec<String>,

    #[serde(default)]
    pub fields: Vec<FieldDocument>,

    #[serde(default)]
    pub methods: Vec<MethodDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDocument {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodDocument {
    pub name: String,

    #[serde(default)]
    pub params: Vec<String>,

    #[serde(default = "default_return_type")]
    pub returns: String,

    #[serde(default)]
    pub annotations: Vec<String>,

    #[serde(default)]
    pub references: Vec<ReferenceDocument>,
}

fn default_return_type() -> String {
    "void".to_string()
}

/// A reference from a method body, named by class and optional member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub kind: ReferenceKind,

    pub class: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,

    /// Exact parameter list for method targets; any overload matches when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,
}

/// A reference waiting for every class to be declared
struct UnresolvedRef {
    from: EntityId,
    target: ReferenceDocument,
}

impl ProgramDocument {
    /// Load a program document; `.json` files use JSON, everything else YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            what: "program document",
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&contents).map_err(|e| AnalysisError::ProgramParse(e.to_string()))
        } else {
            Self::from_yaml(&contents)
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| AnalysisError::ProgramParse(e.to_string()))
    }

    /// Build the program: declare every class and member first, then resolve
    /// method body references against the complete class index.
    pub fn into_program(self) -> Result<Program> {
        let mut program = Program::new();
        let mut unresolved = Vec::new();

        for class_doc in self.classes {
            let class = program.add_class(class_doc.name)?;
            program.set_interface(class, class_doc.is_interface)?;
            if let Some(super_class) = class_doc.super_class {
                program.add_super_type(class, super_class)?;
            }
            for interface in class_doc.interfaces {
                program.add_super_type(class, interface)?;
            }
            for annotation in class_doc.annotations {
                program.add_annotation(class, annotation)?;
            }

            for field_doc in class_doc.fields {
                let field = program.add_field(class, field_doc.name, field_doc.field_type)?;
                for annotation in field_doc.annotations {
                    program.add_annotation(field, annotation)?;
                }
            }

            for method_doc in class_doc.methods {
                let method = program.add_method(class, method_doc.name, method_doc.params, method_doc.returns)?;
                for annotation in method_doc.annotations {
                    program.add_annotation(method, annotation)?;
                }
                unresolved.extend(
                    method_doc
                        .references
                        .into_iter()
                        .map(|target| UnresolvedRef { from: method, target }),
                );
            }
        }

        let total = unresolved.len();
        let mut dropped = 0;
        for reference in unresolved {
            match resolve_target(&program, &reference.target) {
                Some(to) => {
                    program.add_reference(reference.from, to, reference.target.kind);
                }
                None => {
                    debug!(
                        "Dropping {} reference to {}{} (not in program)",
                        reference.target.kind.display_name(),
                        reference.target.class,
                        reference
                            .target
                            .member
                            .as_deref()
                            .map(|m| format!(".{}", m))
                            .unwrap_or_default()
                    );
                    dropped += 1;
                }
            }
        }

        info!(
            "Loaded {} entities, {} references ({} external references dropped)",
            program.entity_count(),
            total - dropped,
            dropped
        );

        Ok(program)
    }
}

/// Resolve a reference target, walking up the hierarchy for inherited members
fn resolve_target(program: &Program, target: &ReferenceDocument) -> Option<EntityId> {
    let class = program.find_class(&target.class)?;
    let Some(member) = &target.member else {
        return Some(class);
    };

    let wants_method = target.params.is_some() || target.kind == ReferenceKind::Call;
    let mut worklist = vec![class];
    let mut seen = std::collections::HashSet::new();

    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }

        let found = if wants_method {
            match &target.params {
                Some(params) => program.find_method(current, member, params),
                None => program.members(current).iter().copied().find(|id| {
                    program
                        .entity(*id)
                        .is_some_and(|e| e.kind == EntityKind::Method && &e.name == member)
                }),
            }
        } else {
            program.find_field(current, member)
        };

        if found.is_some() {
            return found;
        }
        worklist.extend(program.super_types(current));
    }

    None
}
