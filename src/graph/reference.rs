use serde::{Deserialize, Serialize};

/// Kind of reference edge between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Method invocation
    Call,

    /// Field read
    Read,

    /// Field write
    Write,

    /// `new` / constructor call on a class
    Instantiate,

    /// Type mention in a method body (casts, instanceof, class literals)
    Type,

    /// Declared type of a field
    FieldType,

    /// Annotation applied to an entity
    Annotation,

    /// Constant string resolved to an entity (e.g. `Class.forName`)
    Reflection,
}

impl ReferenceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ReferenceKind::Call => "call",
            ReferenceKind::Read => "read",
            ReferenceKind::Write => "write",
            ReferenceKind::Instantiate => "instantiate",
            ReferenceKind::Type => "type",
            ReferenceKind::FieldType => "field type",
            ReferenceKind::Annotation => "annotation",
            ReferenceKind::Reflection => "reflection",
        }
    }
}

/// A reference edge; the endpoints live in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
}

impl Reference {
    pub fn new(kind: ReferenceKind) -> Self {
        Self { kind }
    }
}

