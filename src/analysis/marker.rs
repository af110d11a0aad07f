use crate::config::Config;
use crate::graph::{Entity, EntityId, EntityKind, Program, ReferenceKind};
use crate::retention::{Retainable, RetentionFlags, RetentionTable};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info};

const STATIC_INITIALIZER_NAME: &str = "<clinit>";

/// Counters from one marking pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarkStats {
    /// Entities the traversal started from
    pub roots: usize,
    /// Entities reachable after the pass
    pub reachable: usize,
    /// Entities that were not reachable before the pass
    pub newly_marked: usize,
    /// Edges followed
    pub edges: usize,
}

/// Computes `reachable_from_code` as the closure of the roots.
///
/// Breadth-first over an explicit queue with a visited set, so reference
/// cycles and inheritance cycles terminate. Only the reachability bit is
/// written; configuration bits are read, never changed.
pub struct ReachabilityMarker<'a> {
    config: &'a Config,
}

impl<'a> ReachabilityMarker<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Entities the closure starts from: roots and seeds
    pub fn roots(&self, program: &Program, table: &RetentionTable) -> Vec<EntityId> {
        program
            .entity_ids()
            .filter(|id| {
                let state = table.get(*id);
                state.root() || state.has(RetentionFlags::SEED)
            })
            .collect()
    }

    pub fn mark(&self, program: &Program, table: &mut RetentionTable) -> MarkStats {
        let roots = self.roots(program, table);
        let mut stats = MarkStats {
            roots: roots.len(),
            ..MarkStats::default()
        };

        let mut visited: HashSet<EntityId> = HashSet::new();
        let mut queue: VecDeque<EntityId> = VecDeque::new();

        for root in roots {
            if visited.insert(root) {
                queue.push_back(root);
            }
        }

        while let Some(id) = queue.pop_front() {
            let Some(entity) = program.entity(id) else {
                continue;
            };

            for target in self.successors(program, entity, &visited) {
                stats.edges += 1;
                if visited.insert(target) {
                    queue.push_back(target);
                }
            }
        }

        for id in &visited {
            if table.get_mut(*id).mark_reachable() {
                stats.newly_marked += 1;
            }
        }
        stats.reachable = visited.len();

        info!(
            "Marked {} reachable entities from {} roots ({} edges)",
            stats.reachable, stats.roots, stats.edges
        );

        stats
    }

    /// Entities made reachable by `entity` being reachable.
    ///
    /// `visited` is consulted for override dispatch, which only reaches into
    /// classes that are themselves reachable.
    fn successors(&self, program: &Program, entity: &Entity, visited: &HashSet<EntityId>) -> Vec<EntityId> {
        let mut out = Vec::new();

        for (target, reference) in program.references_from(entity.id) {
            let followed = match reference.kind {
                ReferenceKind::Reflection => self.config.reflection_edges,
                ReferenceKind::Annotation => self.config.annotation_edges,
                _ => true,
            };
            if followed {
                out.push(target);
            }
        }

        if self.config.annotation_edges {
            out.extend(entity.annotations.iter().filter_map(|a| program.find_class(a)));
        }

        match entity.kind {
            EntityKind::Class => {
                out.extend(program.super_types(entity.id));

                for &member in program.members(entity.id) {
                    if self.config.mark_all_members || self.member_needed(program, member, visited) {
                        out.push(member);
                    }
                }
            }
            EntityKind::Method => {
                out.extend(entity.owner);
                for overrider in program.overriders(entity.id) {
                    let owner_reachable = program
                        .entity(overrider)
                        .and_then(|m| m.owner)
                        .is_some_and(|owner| visited.contains(&owner));
                    if owner_reachable {
                        debug!("{} dispatches to {}", entity, overrider);
                        out.push(overrider);
                    }
                }
            }
            EntityKind::Field => {
                out.extend(entity.owner);
                if let Some(ty) = entity.type_name.as_deref() {
                    out.extend(program.find_class_for_type(ty));
                }
            }
        }

        out
    }

    /// With member-level precision, a newly reachable class still needs its
    /// static initializer and every method overriding a reachable method
    fn member_needed(&self, program: &Program, member: EntityId, visited: &HashSet<EntityId>) -> bool {
        let Some(entity) = program.entity(member) else {
            return false;
        };
        if entity.kind != EntityKind::Method {
            return false;
        }
        entity.name == STATIC_INITIALIZER_NAME
            || program.overridden(member).iter().any(|m| visited.contains(m))
    }
}
