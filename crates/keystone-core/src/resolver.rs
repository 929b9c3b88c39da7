//! Availability resolution.
//!
//! Pure functions over a [`Registry`], a [`CampaignState`] and a
//! [`ResourceQuery`]; nothing here mutates campaign state. A topic is
//! available when all of the following hold:
//!
//! 1. it is not yet discovered (repeatable topics never are),
//! 2. it is not disabled,
//! 3. all `dependencies` are researched, or a completed topic unlocked it,
//! 4. all `requires` are researched (unlocks never bypass these),
//! 5. the base provides every required base function,
//! 6. the needed item, if any, is in stores.
//!
//! Checkpoint topics are never offered to the player; the processor settles
//! them automatically.

use crate::campaign::CampaignState;
use crate::id::TopicId;
use crate::registry::Registry;
use crate::topic::{BaseFunctions, Topic};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// Resource context
// ---------------------------------------------------------------------------

/// What the resolver needs to know about the researching base.
pub trait ResourceQuery {
    /// Whether stores hold at least `count` units of `item`.
    fn has_item(&self, item: &str, count: u32) -> bool;

    /// Base functions provided by the base's facilities.
    fn base_functions(&self) -> BaseFunctions;
}

/// A plain snapshot of a base's stores and facility functions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoresSnapshot {
    pub items: HashMap<String, u32>,
    pub functions: BaseFunctions,
}

impl StoresSnapshot {
    pub fn new(functions: BaseFunctions) -> Self {
        Self {
            items: HashMap::new(),
            functions,
        }
    }

    pub fn with_item(mut self, item: &str, count: u32) -> Self {
        *self.items.entry(item.to_string()).or_insert(0) += count;
        self
    }
}

impl ResourceQuery for StoresSnapshot {
    fn has_item(&self, item: &str, count: u32) -> bool {
        self.items.get(item).copied().unwrap_or(0) >= count
    }

    fn base_functions(&self) -> BaseFunctions {
        self.functions
    }
}

/// A base with every function and an endless store. Useful when only the
/// topic graph matters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unrestricted;

impl ResourceQuery for Unrestricted {
    fn has_item(&self, _item: &str, _count: u32) -> bool {
        true
    }

    fn base_functions(&self) -> BaseFunctions {
        BaseFunctions::ALL
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Whether the topic has already been completed for good.
pub(crate) fn is_done(topic: &Topic, campaign: &CampaignState) -> bool {
    if topic.is_checkpoint() {
        campaign.is_resolved_checkpoint(topic.id)
    } else {
        !topic.repeatable && campaign.is_discovered(topic.id)
    }
}

/// Conditions 2 to 4: the parts of availability that depend only on the
/// topic graph and campaign state.
pub(crate) fn graph_gates_open(topic: &Topic, campaign: &CampaignState) -> bool {
    if campaign.is_disabled(topic.id) {
        return false;
    }
    let dependencies_met = campaign.is_unlocked(topic.id)
        || topic.dependencies.iter().all(|&d| campaign.is_researched(d));
    dependencies_met && topic.requires.iter().all(|&r| campaign.is_researched(r))
}

/// Conditions 5 and 6.
pub(crate) fn resource_gates_open(topic: &Topic, resources: &dyn ResourceQuery) -> bool {
    if !topic
        .requires_base_functions
        .is_subset_of(resources.base_functions())
    {
        return false;
    }
    match &topic.needed_item {
        Some(gate) => resources.has_item(&gate.item, 1),
        None => true,
    }
}

/// Whether the player can start researching `id` right now.
pub fn is_available(
    registry: &Registry,
    campaign: &CampaignState,
    resources: &dyn ResourceQuery,
    id: TopicId,
) -> bool {
    let Some(topic) = registry.get(id) else {
        return false;
    };
    !topic.is_checkpoint()
        && !is_done(topic, campaign)
        && graph_gates_open(topic, campaign)
        && resource_gates_open(topic, resources)
}

/// Every topic the player can research right now.
pub fn available(
    registry: &Registry,
    campaign: &CampaignState,
    resources: &dyn ResourceQuery,
) -> BTreeSet<TopicId> {
    registry
        .iter()
        .filter(|t| is_available(registry, campaign, resources, t.id))
        .map(|t| t.id)
        .collect()
}

/// Available topics in research-list order.
pub fn available_in_list_order(
    registry: &Registry,
    campaign: &CampaignState,
    resources: &dyn ResourceQuery,
) -> Vec<TopicId> {
    registry
        .in_list_order()
        .filter(|t| is_available(registry, campaign, resources, t.id))
        .map(|t| t.id)
        .collect()
}

// ---------------------------------------------------------------------------
// Display status
// ---------------------------------------------------------------------------

/// How a research list should present a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopicStatus {
    /// Available and not yet looked at.
    New,
    /// Available and seen, or discovered.
    Normal,
    /// Discovered or otherwise researchable, but currently disabled.
    Disabled,
    /// Not shown: unavailable, unknown, or a checkpoint.
    Hidden,
}

pub fn status(
    registry: &Registry,
    campaign: &CampaignState,
    resources: &dyn ResourceQuery,
    id: TopicId,
) -> TopicStatus {
    let Some(topic) = registry.get(id) else {
        return TopicStatus::Hidden;
    };
    if topic.is_checkpoint() {
        return TopicStatus::Hidden;
    }

    if campaign.is_disabled(id) {
        let discovered = campaign.is_discovered(id);
        let would_be_available = {
            let mut probe = campaign.clone();
            probe.reenable(id);
            graph_gates_open(topic, &probe) && resource_gates_open(topic, resources)
        };
        return if discovered || would_be_available {
            TopicStatus::Disabled
        } else {
            TopicStatus::Hidden
        };
    }

    if campaign.is_discovered(id) {
        TopicStatus::Normal
    } else if is_available(registry, campaign, resources, id) {
        if campaign.is_seen(id) {
            TopicStatus::Normal
        } else {
            TopicStatus::New
        }
    } else {
        TopicStatus::Hidden
    }
}
