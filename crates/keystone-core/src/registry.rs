//! The linked, immutable research registry.
//!
//! [`link`] is the second half of the load pipeline. It assigns every pending
//! topic a [`TopicId`], resolves each name reference exactly once, and checks
//! the catalog-wide invariants:
//!
//! - every referenced name exists ([`LinkError::UnknownReference`]),
//! - the `dependencies`/`requires` graph is acyclic ([`LinkError::DependencyCycle`]),
//! - at most one topic sets `unlockFinalMission` ([`LinkError::DuplicateFinalMission`]).

use crate::catalog::{PendingTopic, RegistryBuilder};
use crate::id::TopicId;
use crate::topic::{BaseFunctions, ItemGate, ProtectedPool, Topic};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while linking a catalog. All of them abort mod activation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("research topic '{topic}' references unknown topic '{name}' in '{field}'")]
    UnknownReference {
        topic: String,
        field: &'static str,
        name: String,
    },

    #[error("dependency cycle: {}", .path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    #[error("research topics '{first}' and '{second}' both set 'unlockFinalMission'")]
    DuplicateFinalMission { first: String, second: String },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable research catalog. Frozen after [`link`]; safe to share across
/// threads behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct Registry {
    topics: Vec<Topic>,
    name_to_id: HashMap<String, TopicId>,
    list_order: Vec<TopicId>,
    /// For each topic, the topics naming it in `dependencies`.
    dependency_dependents: Vec<Vec<TopicId>>,
    /// For each topic, the topics naming it in `requires`.
    requires_dependents: Vec<Vec<TopicId>>,
    base_function_bits: HashMap<String, u8>,
    final_mission: Option<TopicId>,
}

impl Registry {
    pub fn get(&self, id: TopicId) -> Option<&Topic> {
        self.topics.get(id.index())
    }

    pub fn id(&self, name: &str) -> Option<TopicId> {
        self.name_to_id.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Topic> {
        self.id(name).and_then(|id| self.get(id))
    }

    pub fn name(&self, id: TopicId) -> Option<&str> {
        self.get(id).map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Topics in id (declaration) order.
    pub fn iter(&self) -> impl Iterator<Item = &Topic> {
        self.topics.iter()
    }

    /// Topics sorted by `list_order`, ties broken by declaration order.
    pub fn in_list_order(&self) -> impl Iterator<Item = &Topic> {
        self.list_order.iter().map(|id| &self.topics[id.index()])
    }

    /// The single topic that triggers the end game, if any.
    pub fn final_mission_topic(&self) -> Option<TopicId> {
        self.final_mission
    }

    pub(crate) fn dependency_dependents(&self, id: TopicId) -> &[TopicId] {
        self.dependency_dependents
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn requires_dependents(&self, id: TopicId) -> &[TopicId] {
        self.requires_dependents
            .get(id.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The bit for one base function name, if any topic requires it.
    pub fn base_function(&self, name: &str) -> Option<BaseFunctions> {
        self.base_function_bits
            .get(name)
            .map(|&bit| BaseFunctions::single(bit))
    }

    /// Translate the function names a base provides into a [`BaseFunctions`]
    /// set. Names no topic requires are irrelevant and dropped.
    pub fn base_functions<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> BaseFunctions {
        names
            .into_iter()
            .filter_map(|name| self.base_function(name))
            .fold(BaseFunctions::EMPTY, BaseFunctions::union)
    }
}

// ---------------------------------------------------------------------------
// Linking
// ---------------------------------------------------------------------------

/// Resolve every name reference in `builder` and validate the catalog.
pub fn link(builder: RegistryBuilder) -> Result<Registry, LinkError> {
    let (pending, base_function_bits) = builder.into_parts();

    let name_to_id: HashMap<String, TopicId> = pending
        .iter()
        .enumerate()
        .map(|(i, p)| (p.def.name.clone(), TopicId(i as u32)))
        .collect();

    let topics = pending
        .into_iter()
        .enumerate()
        .map(|(i, p)| resolve_topic(TopicId(i as u32), p, &name_to_id))
        .collect::<Result<Vec<_>, _>>()?;

    check_acyclic(&topics)?;
    let final_mission = check_final_mission(&topics)?;

    let mut list_order: Vec<TopicId> = topics.iter().map(|t| t.id).collect();
    list_order.sort_by_key(|id| (topics[id.index()].list_order, *id));

    let mut dependency_dependents = vec![Vec::new(); topics.len()];
    let mut requires_dependents = vec![Vec::new(); topics.len()];
    for topic in &topics {
        for dep in &topic.dependencies {
            dependency_dependents[dep.index()].push(topic.id);
        }
        for req in &topic.requires {
            requires_dependents[req.index()].push(topic.id);
        }
    }

    tracing::info!(
        topics = topics.len(),
        base_functions = base_function_bits.len(),
        "research registry linked"
    );

    Ok(Registry {
        topics,
        name_to_id,
        list_order,
        dependency_dependents,
        requires_dependents,
        base_function_bits,
        final_mission,
    })
}

fn resolve_topic(
    id: TopicId,
    pending: PendingTopic,
    names: &HashMap<String, TopicId>,
) -> Result<Topic, LinkError> {
    let def = &pending.def;
    let topic = def.name.as_str();

    let lookup = match &def.lookup {
        Some(name) if !name.is_empty() => Some(resolve(names, topic, "lookup", name)?),
        _ => None,
    };

    let get_one_free_protected = def
        .get_one_free_protected
        .iter()
        .map(|pool| {
            Ok(ProtectedPool {
                trigger: resolve(names, topic, "getOneFreeProtected", &pool.trigger)?,
                pool: resolve_all(names, topic, "getOneFreeProtected", &pool.topics)?,
            })
        })
        .collect::<Result<Vec<_>, LinkError>>()?;

    Ok(Topic {
        id,
        cost: pending.cost,
        points: def.points,
        list_order: pending.list_order,
        repeatable: def.repeatable,
        requires_base_functions: pending.base_functions,
        needed_item: pending.needed_item.clone().map(|item| ItemGate {
            item,
            destroy: def.destroy_item,
        }),
        unlock_final_mission: def.unlock_final_mission,
        lookup,
        dependencies: resolve_all(names, topic, "dependencies", &def.dependencies)?,
        unlocks: resolve_all(names, topic, "unlocks", &def.unlocks)?,
        disables: resolve_all(names, topic, "disables", &def.disables)?,
        reenables: resolve_all(names, topic, "reenables", &def.reenables)?,
        get_one_free: resolve_all(names, topic, "getOneFree", &def.get_one_free)?,
        get_one_free_protected,
        requires: resolve_all(names, topic, "requires", &def.requires)?,
        sequential_get_one_free: def.sequential_get_one_free,
        spawned_item: def.spawned_item.clone().filter(|s| !s.is_empty()),
        spawned_item_count: pending.spawned_item_count,
        spawned_item_list: def.spawned_item_list.clone(),
        spawned_event: def.spawned_event.clone().filter(|s| !s.is_empty()),
        cutscene: def.cutscene.clone().filter(|s| !s.is_empty()),
        decrease_counter: def.decrease_counter.clone(),
        increase_counter: def.increase_counter.clone(),
        name: pending.def.name,
    })
}

fn resolve(
    names: &HashMap<String, TopicId>,
    topic: &str,
    field: &'static str,
    name: &str,
) -> Result<TopicId, LinkError> {
    names
        .get(name)
        .copied()
        .ok_or_else(|| LinkError::UnknownReference {
            topic: topic.to_string(),
            field,
            name: name.to_string(),
        })
}

/// Resolve a list of names, dropping repeats but keeping declaration order.
fn resolve_all(
    names: &HashMap<String, TopicId>,
    topic: &str,
    field: &'static str,
    list: &[String],
) -> Result<Vec<TopicId>, LinkError> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(list.len());
    for name in list {
        let id = resolve(names, topic, field, name)?;
        if seen.insert(id) {
            out.push(id);
        }
    }
    Ok(out)
}

/// Prerequisites of a topic for cycle purposes: `dependencies` then `requires`.
fn prerequisites(topic: &Topic) -> impl Iterator<Item = TopicId> + '_ {
    topic.dependencies.iter().chain(topic.requires.iter()).copied()
}

/// Kahn's algorithm over prerequisite -> dependent edges.
fn check_acyclic(topics: &[Topic]) -> Result<(), LinkError> {
    let mut in_degree = vec![0usize; topics.len()];
    let mut dependents: Vec<Vec<TopicId>> = vec![Vec::new(); topics.len()];
    for topic in topics {
        for prereq in prerequisites(topic) {
            in_degree[topic.id.index()] += 1;
            dependents[prereq.index()].push(topic.id);
        }
    }

    let mut queue: VecDeque<TopicId> = topics
        .iter()
        .filter(|t| in_degree[t.id.index()] == 0)
        .map(|t| t.id)
        .collect();
    let mut processed = 0usize;

    while let Some(id) = queue.pop_front() {
        processed += 1;
        for &dependent in &dependents[id.index()] {
            let deg = &mut in_degree[dependent.index()];
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if processed == topics.len() {
        return Ok(());
    }

    // Every unprocessed topic still has an unprocessed prerequisite, so
    // walking prerequisites from any of them must revisit a topic.
    let Some(start) = topics.iter().find(|t| in_degree[t.id.index()] > 0) else {
        return Ok(());
    };
    let mut walk: Vec<TopicId> = Vec::new();
    let mut position: HashMap<TopicId, usize> = HashMap::new();
    let mut current = start.id;
    loop {
        if let Some(&pos) = position.get(&current) {
            // The walk follows prerequisites; report it prerequisite-first
            // and close the loop.
            let mut path: Vec<String> = walk[pos..]
                .iter()
                .rev()
                .map(|id| topics[id.index()].name.clone())
                .collect();
            path.push(path[0].clone());
            return Err(LinkError::DependencyCycle { path });
        }
        position.insert(current, walk.len());
        walk.push(current);
        match prerequisites(&topics[current.index()]).find(|p| in_degree[p.index()] > 0) {
            Some(next) => current = next,
            None => {
                // Unreachable for a consistent in-degree table; report what we have.
                let path = walk.iter().map(|id| topics[id.index()].name.clone()).collect();
                return Err(LinkError::DependencyCycle { path });
            }
        }
    }
}

fn check_final_mission(topics: &[Topic]) -> Result<Option<TopicId>, LinkError> {
    let mut found: Option<&Topic> = None;
    for topic in topics.iter().filter(|t| t.unlock_final_mission) {
        if let Some(first) = found {
            return Err(LinkError::DuplicateFinalMission {
                first: first.name.clone(),
                second: topic.name.clone(),
            });
        }
        found = Some(topic);
    }
    Ok(found.map(|t| t.id))
}

// ---------------------------------------------------------------------------
// Shared handle
// ---------------------------------------------------------------------------

/// Holds the active registry. Readers take a cheap [`Arc`] snapshot; a mod
/// reload swaps in a freshly linked registry without touching the old one.
#[derive(Debug)]
pub struct RegistryCell {
    current: RwLock<Arc<Registry>>,
}

impl RegistryCell {
    pub fn new(registry: Registry) -> Self {
        Self {
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// The registry active right now.
    pub fn load(&self) -> Arc<Registry> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install `registry` and return the one it replaced.
    pub fn replace(&self, registry: Registry) -> Arc<Registry> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(registry))
    }
}
