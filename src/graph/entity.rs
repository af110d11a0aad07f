use serde::{Deserialize, Serialize};

/// Stable identity of a class, method or field in the analyzed program.
///
/// Ids are handed out by [`super::Program`] and are never reused, so a
/// retention table keyed by them stays valid while passes mutate the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of program entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Class,
    Method,
    Field,
}

impl EntityKind {
    pub fn is_member(&self) -> bool {
        matches!(self, EntityKind::Method | EntityKind::Field)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Class => "class",
            EntityKind::Method => "method",
            EntityKind::Field => "field",
        }
    }
}

/// Name used for constructors in method signatures
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// A class, method or field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,

    pub kind: EntityKind,

    /// Member name (`run`, `count`); classes store their fully qualified name
    pub name: String,

    /// Fully qualified name of the class (the owner's name for members)
    pub class_name: String,

    /// Declaring class for methods and fields
    pub owner: Option<EntityId>,

    /// Annotation type names
    pub annotations: Vec<String>,

    /// Super class followed by implemented interfaces (classes only)
    pub super_types: Vec<String>,

    /// Whether a class is an interface
    pub is_interface: bool,

    /// Parameter type names (methods only)
    pub params: Vec<String>,

    /// Return type for methods, declared type for fields
    pub type_name: Option<String>,
}

impl Entity {
    pub fn class(id: EntityId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            kind: EntityKind::Class,
            class_name: name.clone(),
            name,
            owner: None,
            annotations: Vec::new(),
            super_types: Vec::new(),
            is_interface: false,
            params: Vec::new(),
            type_name: None,
        }
    }

    pub fn method(
        id: EntityId,
        owner: &Entity,
        name: impl Into<String>,
        params: Vec<String>,
        return_type: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind: EntityKind::Method,
            name: name.into(),
            class_name: owner.class_name.clone(),
            owner: Some(owner.id),
            annotations: Vec::new(),
            super_types: Vec::new(),
            is_interface: false,
            params,
            type_name: Some(return_type.into()),
        }
    }

    pub fn field(id: EntityId, owner: &Entity, name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            id,
            kind: EntityKind::Field,
            name: name.into(),
            class_name: owner.class_name.clone(),
            owner: Some(owner.id),
            annotations: Vec::new(),
            super_types: Vec::new(),
            is_interface: false,
            params: Vec::new(),
            type_name: Some(field_type.into()),
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == EntityKind::Method && self.name == CONSTRUCTOR_NAME
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }

    /// Member signature in ProGuard notation, e.g. `void run(int)` or `int count`
    pub fn member_signature(&self) -> Option<String> {
        match self.kind {
            EntityKind::Class => None,
            EntityKind::Method => {
                let params = self.params.join(",");
                if self.is_constructor() {
                    let simple = self.class_name.rsplit('.').next().unwrap_or(&self.class_name);
                    Some(format!("{}({})", simple, params))
                } else {
                    Some(format!(
                        "{} {}({})",
                        self.type_name.as_deref().unwrap_or("void"),
                        self.name,
                        params
                    ))
                }
            }
            EntityKind::Field => Some(format!(
                "{} {}",
                self.type_name.as_deref().unwrap_or("java.lang.Object"),
                self.name
            )),
        }
    }

    /// Qualified display name, e.g. `com.example.Foo.run(int)`
    pub fn qualified_name(&self) -> String {
        match self.kind {
            EntityKind::Class => self.class_name.clone(),
            EntityKind::Method => format!("{}.{}({})", self.class_name, self.name, self.params.join(",")),
            EntityKind::Field => format!("{}.{}", self.class_name, self.name),
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind.display_name(), self.qualified_name())
    }
}
