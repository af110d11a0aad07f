//! Program model: classes, methods and fields connected by membership,
//! hierarchy and reference relations.

mod builder;
mod entity;
mod reference;

pub use builder::{ClassDocument, FieldDocument, MethodDocument, ProgramDocument, ReferenceDocument};
pub use entity::{Entity, EntityId, EntityKind, CONSTRUCTOR_NAME};
pub use reference::{Reference, ReferenceKind};

use crate::error::{AnalysisError, Result};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap, HashSet};

/// The analyzed program.
///
/// Code references are stored as edges of a stable petgraph graph so that
/// passes can remove entities and call sites without invalidating the ids
/// held by the retention table.
#[derive(Debug, Default)]
pub struct Program {
    /// Nodes are entity ids, edges are code references
    inner: StableDiGraph<EntityId, Reference>,

    /// Map from entity id to node index
    node_map: HashMap<EntityId, NodeIndex>,

    /// Entity details, ordered by id for deterministic iteration
    entities: BTreeMap<EntityId, Entity>,

    /// Map from fully qualified class name to class
    class_index: HashMap<String, EntityId>,

    /// Map from class to its declared members
    members_index: HashMap<EntityId, Vec<EntityId>>,

    /// Map from a super type name to the classes directly extending or implementing it
    subtype_index: HashMap<String, Vec<EntityId>>,

    next_id: u32,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        let node_idx = self.inner.add_node(id);
        self.node_map.insert(id, node_idx);
        id
    }

    /// Add a class; class names are unique within a program
    pub fn add_class(&mut self, name: impl Into<String>) -> Result<EntityId> {
        let name = name.into();
        if self.class_index.contains_key(&name) {
            return Err(AnalysisError::DuplicateClass(name));
        }

        let id = self.allocate();
        self.class_index.insert(name.clone(), id);
        self.members_index.insert(id, Vec::new());
        self.entities.insert(id, Entity::class(id, name));
        Ok(id)
    }

    /// Record a super class or implemented interface by name.
    /// The super type does not need to be part of the program.
    pub fn add_super_type(&mut self, class: EntityId, super_type: impl Into<String>) -> Result<()> {
        let super_type = super_type.into();
        let entity = self.class_mut(class)?;
        if entity.super_types.contains(&super_type) {
            return Ok(());
        }
        entity.super_types.push(super_type.clone());
        self.subtype_index.entry(super_type).or_default().push(class);
        Ok(())
    }

    pub fn set_interface(&mut self, class: EntityId, is_interface: bool) -> Result<()> {
        self.class_mut(class)?.is_interface = is_interface;
        Ok(())
    }

    pub fn add_annotation(&mut self, id: EntityId, annotation: impl Into<String>) -> Result<()> {
        let annotation = annotation.into();
        let entity = self.entities.get_mut(&id).ok_or(AnalysisError::UnknownEntity(id))?;
        if !entity.annotations.contains(&annotation) {
            entity.annotations.push(annotation);
        }
        Ok(())
    }

    pub fn add_method(
        &mut self,
        class: EntityId,
        name: impl Into<String>,
        params: Vec<String>,
        return_type: impl Into<String>,
    ) -> Result<EntityId> {
        let owner = self.class(class)?.clone();
        let id = self.allocate();
        self.entities
            .insert(id, Entity::method(id, &owner, name, params, return_type));
        self.members_index.entry(class).or_default().push(id);
        Ok(id)
    }

    pub fn add_field(
        &mut self,
        class: EntityId,
        name: impl Into<String>,
        field_type: impl Into<String>,
    ) -> Result<EntityId> {
        let owner = self.class(class)?.clone();
        let id = self.allocate();
        self.entities.insert(id, Entity::field(id, &owner, name, field_type));
        self.members_index.entry(class).or_default().push(id);
        Ok(id)
    }

    /// Add a code reference. Returns false when either endpoint is unknown.
    pub fn add_reference(&mut self, from: EntityId, to: EntityId, kind: ReferenceKind) -> bool {
        if let (Some(&from_idx), Some(&to_idx)) = (self.node_map.get(&from), self.node_map.get(&to)) {
            self.inner.add_edge(from_idx, to_idx, Reference::new(kind));
            true
        } else {
            false
        }
    }

    /// Remove code references from `from` to `to`, optionally only of one kind.
    /// Returns the number of removed edges.
    pub fn remove_reference(&mut self, from: EntityId, to: EntityId, kind: Option<ReferenceKind>) -> usize {
        let (Some(&from_idx), Some(&to_idx)) = (self.node_map.get(&from), self.node_map.get(&to)) else {
            return 0;
        };

        let doomed: Vec<_> = self
            .inner
            .edges_directed(from_idx, Direction::Outgoing)
            .filter(|edge| edge.target() == to_idx)
            .filter(|edge| kind.map_or(true, |k| edge.weight().kind == k))
            .map(|edge| edge.id())
            .collect();

        for edge in &doomed {
            self.inner.remove_edge(*edge);
        }
        doomed.len()
    }

    /// Remove an entity and every edge touching it. Removing a class removes its members.
    pub fn remove_entity(&mut self, id: EntityId) -> Result<Vec<EntityId>> {
        let entity = self.entities.remove(&id).ok_or(AnalysisError::UnknownEntity(id))?;
        let mut removed = vec![id];

        match entity.kind {
            EntityKind::Class => {
                self.class_index.remove(&entity.class_name);
                for super_type in &entity.super_types {
                    if let Some(subtypes) = self.subtype_index.get_mut(super_type) {
                        subtypes.retain(|c| *c != id);
                    }
                }
                for member in self.members_index.remove(&id).unwrap_or_default() {
                    self.entities.remove(&member);
                    if let Some(idx) = self.node_map.remove(&member) {
                        self.inner.remove_node(idx);
                    }
                    removed.push(member);
                }
            }
            EntityKind::Method | EntityKind::Field => {
                if let Some(members) = entity.owner.and_then(|owner| self.members_index.get_mut(&owner)) {
                    members.retain(|m| *m != id);
                }
            }
        }

        if let Some(idx) = self.node_map.remove(&id) {
            self.inner.remove_node(idx);
        }
        Ok(removed)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn class(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(&id)
            .filter(|e| e.kind == EntityKind::Class)
            .ok_or(AnalysisError::UnknownEntity(id))
    }

    fn class_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities
            .get_mut(&id)
            .filter(|e| e.kind == EntityKind::Class)
            .ok_or(AnalysisError::UnknownEntity(id))
    }

    /// All entities in id order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.kind == EntityKind::Class)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn find_class(&self, name: &str) -> Option<EntityId> {
        self.class_index.get(name).copied()
    }

    /// Resolve a type name (possibly an array type) to a program class
    pub fn find_class_for_type(&self, type_name: &str) -> Option<EntityId> {
        self.find_class(type_name.trim_end_matches("[]"))
    }

    /// Declared members of a class
    pub fn members(&self, class: EntityId) -> &[EntityId] {
        self.members_index
            .get(&class)
            .map(|members| members.as_slice())
            .unwrap_or_default()
    }

    pub fn find_method(&self, class: EntityId, name: &str, params: &[String]) -> Option<EntityId> {
        self.members(class).iter().copied().find(|id| {
            self.entities
                .get(id)
                .is_some_and(|e| e.kind == EntityKind::Method && e.name == name && e.params == params)
        })
    }

    pub fn find_field(&self, class: EntityId, name: &str) -> Option<EntityId> {
        self.members(class).iter().copied().find(|id| {
            self.entities
                .get(id)
                .is_some_and(|e| e.kind == EntityKind::Field && e.name == name)
        })
    }

    /// Outgoing code references of an entity
    pub fn references_from(&self, id: EntityId) -> Vec<(EntityId, Reference)> {
        self.references(id, Direction::Outgoing)
    }

    /// Incoming code references of an entity
    pub fn references_to(&self, id: EntityId) -> Vec<(EntityId, Reference)> {
        self.references(id, Direction::Incoming)
    }

    fn references(&self, id: EntityId, direction: Direction) -> Vec<(EntityId, Reference)> {
        let Some(&node_idx) = self.node_map.get(&id) else {
            return Vec::new();
        };

        self.inner
            .edges_directed(node_idx, direction)
            .filter_map(|edge| {
                let other = match direction {
                    Direction::Outgoing => edge.target(),
                    Direction::Incoming => edge.source(),
                };
                let other_id = self.inner.node_weight(other)?;
                Some((*other_id, *edge.weight()))
            })
            .collect()
    }

    /// Super class and interfaces of a class that are part of the program
    pub fn super_types(&self, class: EntityId) -> Vec<EntityId> {
        self.entities
            .get(&class)
            .map(|e| {
                e.super_types
                    .iter()
                    .filter_map(|name| self.find_class(name))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Classes directly extending or implementing `class`
    pub fn direct_subtypes(&self, class: EntityId) -> &[EntityId] {
        self.entities
            .get(&class)
            .and_then(|e| self.subtype_index.get(&e.class_name))
            .map(|subtypes| subtypes.as_slice())
            .unwrap_or_default()
    }

    /// Methods in (transitive) subtypes that override `method`
    pub fn overriders(&self, method: EntityId) -> Vec<EntityId> {
        self.related_methods(method, |program, class| program.direct_subtypes(class).to_vec())
    }

    /// Methods in (transitive) super types that `method` overrides
    pub fn overridden(&self, method: EntityId) -> Vec<EntityId> {
        self.related_methods(method, |program, class| program.super_types(class))
    }

    fn related_methods<F>(&self, method: EntityId, next: F) -> Vec<EntityId>
    where
        F: Fn(&Program, EntityId) -> Vec<EntityId>,
    {
        let Some(entity) = self.entities.get(&method) else {
            return Vec::new();
        };
        let Some(owner) = entity.owner else {
            return Vec::new();
        };
        if entity.kind != EntityKind::Method || entity.is_constructor() {
            return Vec::new();
        }

        let mut found = Vec::new();
        let mut seen = HashSet::from([owner]);
        let mut worklist = next(self, owner);

        while let Some(class) = worklist.pop() {
            if !seen.insert(class) {
                continue;
            }
            if let Some(m) = self.find_method(class, &entity.name, &entity.params) {
                found.push(m);
            }
            worklist.extend(next(self, class));
        }

        found.sort();
        found
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn reference_count(&self) -> usize {
        self.inner.edge_count()
    }
}
