//! Raw, string-keyed research definitions and the catalog builder.
//!
//! Loading is the first half of a two-phase pipeline: [`RegistryBuilder::load`]
//! validates raw [`TopicDef`] records and [`RegistryBuilder::link`] resolves
//! every name reference into a [`TopicId`], producing an immutable
//! [`Registry`].
//!
//! Later mods layer on top of earlier ones with [`RegistryBuilder::extend`]:
//! a definition whose name already exists replaces the earlier record but
//! keeps its list position unless it sets `listOrder` itself.

use crate::registry::{LinkError, Registry};
use crate::topic::{BaseFunctions, MAX_BASE_FUNCTIONS};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// Raw definitions
// ---------------------------------------------------------------------------

/// A protected bonus pool as written in a definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectedPoolDef {
    pub trigger: String,
    pub topics: Vec<String>,
}

/// One research topic as read from a definition file, before linking.
///
/// Field names follow the ruleset convention (`getOneFree`,
/// `requiresBaseFunc`, ...). Everything except `name` and `cost` is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopicDef {
    pub name: String,
    pub cost: Option<i64>,
    pub points: i32,
    pub list_order: Option<i32>,
    pub repeatable: bool,
    pub requires_base_func: Vec<String>,
    pub need_item: bool,
    /// Defaults to the topic name when `need_item` is set.
    pub needed_item: Option<String>,
    pub destroy_item: bool,
    pub unlock_final_mission: bool,
    pub lookup: Option<String>,

    pub dependencies: Vec<String>,
    pub unlocks: Vec<String>,
    pub disables: Vec<String>,
    pub reenables: Vec<String>,
    pub get_one_free: Vec<String>,
    pub get_one_free_protected: Vec<ProtectedPoolDef>,
    pub requires: Vec<String>,
    pub sequential_get_one_free: bool,

    pub spawned_item: Option<String>,
    pub spawned_item_count: Option<i64>,
    pub spawned_item_list: Vec<String>,
    pub spawned_event: Option<String>,
    pub cutscene: Option<String>,
    pub decrease_counter: Vec<String>,
    pub increase_counter: Vec<String>,
}

impl TopicDef {
    /// A definition with the two required fields set.
    pub fn new(name: &str, cost: i64) -> Self {
        Self {
            name: name.to_string(),
            cost: Some(cost),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while validating raw definitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("research topic {topic}: missing required field '{field}'")]
    MissingField { topic: String, field: &'static str },

    #[error("research topic {topic}: invalid value for '{field}': {detail}")]
    InvalidValue {
        topic: String,
        field: &'static str,
        detail: String,
    },

    #[error("research topic '{name}' is defined twice in the same batch")]
    DuplicateName { name: String },

    #[error(
        "research topic {topic}: base function '{function}' exceeds the limit of {MAX_BASE_FUNCTIONS} distinct functions"
    )]
    TooManyBaseFunctions { topic: String, function: String },
}

// ---------------------------------------------------------------------------
// Validated, unlinked topics
// ---------------------------------------------------------------------------

/// A definition whose scalar fields passed validation. Name references are
/// still strings until [`RegistryBuilder::link`] runs.
#[derive(Debug, Clone)]
pub struct PendingTopic {
    pub def: TopicDef,
    pub cost: u32,
    pub list_order: i32,
    pub spawned_item_count: u32,
    pub base_functions: BaseFunctions,
    pub needed_item: Option<String>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects validated definitions until they are linked into a [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    topics: Vec<PendingTopic>,
    name_to_index: HashMap<String, usize>,
    base_function_bits: HashMap<String, u8>,
    next_list_order: i32,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one batch of definitions into a fresh builder.
    pub fn load(defs: impl IntoIterator<Item = TopicDef>) -> Result<Self, LoadError> {
        let mut builder = Self::new();
        builder.extend(defs)?;
        Ok(builder)
    }

    /// Layer a batch of definitions over the current contents.
    ///
    /// Names must be unique within the batch. A name already present from an
    /// earlier batch is overridden. The builder is left untouched when any
    /// record in the batch fails validation.
    pub fn extend(&mut self, defs: impl IntoIterator<Item = TopicDef>) -> Result<(), LoadError> {
        let mut bits = self.base_function_bits.clone();
        let mut seen = HashSet::new();
        let mut validated = Vec::new();

        for (index, def) in defs.into_iter().enumerate() {
            let pending = validate(def, index, &mut bits)?;
            if !seen.insert(pending.def.name.clone()) {
                return Err(LoadError::DuplicateName {
                    name: pending.def.name,
                });
            }
            validated.push(pending);
        }

        self.base_function_bits = bits;
        for mut pending in validated {
            match self.name_to_index.get(&pending.def.name) {
                Some(&slot) => {
                    if pending.def.list_order.is_none() {
                        pending.list_order = self.topics[slot].list_order;
                    }
                    tracing::debug!(topic = %pending.def.name, "overriding research definition");
                    self.topics[slot] = pending;
                }
                None => {
                    if pending.def.list_order.is_none() {
                        pending.list_order = self.next_list_order;
                    }
                    self.next_list_order =
                        self.next_list_order.max(pending.list_order).saturating_add(1);
                    self.name_to_index
                        .insert(pending.def.name.clone(), self.topics.len());
                    self.topics.push(pending);
                }
            }
        }
        Ok(())
    }

    /// Delete a topic before linking. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(index) = self.name_to_index.remove(name) else {
            return false;
        };
        self.topics.remove(index);
        for slot in self.name_to_index.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PendingTopic> {
        self.name_to_index.get(name).map(|&i| &self.topics[i])
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// The bit assigned to a base function name, if any topic requires it.
    pub fn base_function(&self, name: &str) -> Option<BaseFunctions> {
        self.base_function_bits
            .get(name)
            .map(|&bit| BaseFunctions::single(bit))
    }

    /// Resolve all references and validate global invariants.
    pub fn link(self) -> Result<Registry, LinkError> {
        crate::registry::link(self)
    }

    pub(crate) fn into_parts(self) -> (Vec<PendingTopic>, HashMap<String, u8>) {
        (self.topics, self.base_function_bits)
    }
}

/// Check scalar fields and intern base function names.
fn validate(
    def: TopicDef,
    index: usize,
    bits: &mut HashMap<String, u8>,
) -> Result<PendingTopic, LoadError> {
    if def.name.trim().is_empty() {
        return Err(LoadError::MissingField {
            topic: format!("#{index}"),
            field: "name",
        });
    }
    let topic = def.name.clone();

    let cost = def.cost.ok_or_else(|| LoadError::MissingField {
        topic: topic.clone(),
        field: "cost",
    })?;
    let cost = u32::try_from(cost).map_err(|_| LoadError::InvalidValue {
        topic: topic.clone(),
        field: "cost",
        detail: format!("{cost} is outside 0..={}", u32::MAX),
    })?;

    let spawned_item_count = match def.spawned_item_count {
        None => 1,
        Some(n) => u32::try_from(n).map_err(|_| LoadError::InvalidValue {
            topic: topic.clone(),
            field: "spawnedItemCount",
            detail: format!("{n} is outside 0..={}", u32::MAX),
        })?,
    };

    for pool in &def.get_one_free_protected {
        if pool.trigger.trim().is_empty() {
            return Err(LoadError::MissingField {
                topic: topic.clone(),
                field: "getOneFreeProtected.trigger",
            });
        }
    }

    let needed_item = if def.need_item {
        match &def.needed_item {
            Some(item) if item.trim().is_empty() => {
                return Err(LoadError::InvalidValue {
                    topic,
                    field: "neededItem",
                    detail: "item name is empty".to_string(),
                });
            }
            Some(item) => Some(item.clone()),
            None => Some(def.name.clone()),
        }
    } else {
        None
    };

    let mut base_functions = BaseFunctions::EMPTY;
    for function in &def.requires_base_func {
        let next = bits.len();
        let bit = match bits.get(function) {
            Some(&bit) => bit,
            None if next < MAX_BASE_FUNCTIONS => {
                bits.insert(function.clone(), next as u8);
                next as u8
            }
            None => {
                return Err(LoadError::TooManyBaseFunctions {
                    topic,
                    function: function.clone(),
                });
            }
        };
        base_functions = base_functions.union(BaseFunctions::single(bit));
    }

    Ok(PendingTopic {
        list_order: def.list_order.unwrap_or_default(),
        cost,
        spawned_item_count,
        base_functions,
        needed_item,
        def,
    })
}
