//! Per-campaign research state.
//!
//! [`CampaignState`] is owned by the campaign layer and mutated only by the
//! [`Processor`](crate::processor::Processor). It is keyed by [`TopicId`], so
//! it is only valid against the registry it was built for; use
//! [`CampaignState::to_saved`] / [`CampaignState::from_saved`] to persist it
//! by topic name across mod reloads.

use crate::id::TopicId;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mutable research state of one campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignState {
    discovered: BTreeSet<TopicId>,
    disabled: BTreeSet<TopicId>,
    unlocked: BTreeSet<TopicId>,
    granted: BTreeSet<TopicId>,
    resolved_checkpoints: BTreeSet<TopicId>,
    seen: BTreeSet<TopicId>,
    counters: BTreeMap<String, i64>,
    final_mission_triggered: bool,
}

impl CampaignState {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Queries --

    /// Whether the topic is permanently discovered. Checkpoints and
    /// repeatable topics never are.
    pub fn is_discovered(&self, id: TopicId) -> bool {
        self.discovered.contains(&id)
    }

    /// Whether the topic satisfies prerequisite checks: discovered, or a
    /// checkpoint that has already been resolved.
    pub fn is_researched(&self, id: TopicId) -> bool {
        self.discovered.contains(&id) || self.resolved_checkpoints.contains(&id)
    }

    pub fn is_disabled(&self, id: TopicId) -> bool {
        self.disabled.contains(&id)
    }

    pub fn is_unlocked(&self, id: TopicId) -> bool {
        self.unlocked.contains(&id)
    }

    /// Whether the topic has been handed out by a bonus draw.
    pub fn is_granted(&self, id: TopicId) -> bool {
        self.granted.contains(&id)
    }

    pub fn is_resolved_checkpoint(&self, id: TopicId) -> bool {
        self.resolved_checkpoints.contains(&id)
    }

    pub fn is_seen(&self, id: TopicId) -> bool {
        self.seen.contains(&id)
    }

    pub fn discovered(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.discovered.iter().copied()
    }

    pub fn disabled(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.disabled.iter().copied()
    }

    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    /// Current value of a named counter; zero if never adjusted.
    pub fn counter(&self, name: &str) -> i64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn final_mission_triggered(&self) -> bool {
        self.final_mission_triggered
    }

    /// Record that the player has looked at a topic in the research list.
    pub fn mark_seen(&mut self, id: TopicId) {
        self.seen.insert(id);
    }

    // -- Mutation (processor only) --

    pub(crate) fn discover(&mut self, id: TopicId) -> bool {
        self.discovered.insert(id)
    }

    pub(crate) fn resolve_checkpoint(&mut self, id: TopicId) -> bool {
        self.resolved_checkpoints.insert(id)
    }

    pub(crate) fn disable(&mut self, id: TopicId) -> bool {
        self.disabled.insert(id)
    }

    pub(crate) fn reenable(&mut self, id: TopicId) -> bool {
        self.disabled.remove(&id)
    }

    pub(crate) fn unlock(&mut self, id: TopicId) -> bool {
        self.unlocked.insert(id)
    }

    pub(crate) fn record_grant(&mut self, id: TopicId) -> bool {
        self.granted.insert(id)
    }

    pub(crate) fn adjust_counter(&mut self, name: &str, delta: i64) -> i64 {
        let value = self.counters.entry(name.to_string()).or_insert(0);
        *value = value.saturating_add(delta);
        *value
    }

    /// Returns `true` only the first time.
    pub(crate) fn trigger_final_mission(&mut self) -> bool {
        !std::mem::replace(&mut self.final_mission_triggered, true)
    }

    // -- Persistence --

    /// Convert to a name-keyed form that survives registry rebuilds.
    pub fn to_saved(&self, registry: &Registry) -> SavedCampaign {
        let names = |set: &BTreeSet<TopicId>| -> Vec<String> {
            set.iter()
                .filter_map(|&id| registry.name(id).map(str::to_string))
                .collect()
        };
        SavedCampaign {
            discovered: names(&self.discovered),
            disabled: names(&self.disabled),
            unlocked: names(&self.unlocked),
            granted: names(&self.granted),
            resolved_checkpoints: names(&self.resolved_checkpoints),
            seen: names(&self.seen),
            counters: self.counters.clone(),
            final_mission_triggered: self.final_mission_triggered,
        }
    }

    /// Rebuild state from a save against `registry`.
    ///
    /// In [`RestoreMode::Lenient`] names the registry no longer knows (a mod
    /// was removed) are skipped with a warning; [`RestoreMode::Strict`]
    /// rejects them.
    pub fn from_saved(
        registry: &Registry,
        saved: &SavedCampaign,
        mode: RestoreMode,
    ) -> Result<Self, RestoreError> {
        let ids = |set: &'static str, names: &[String]| -> Result<BTreeSet<TopicId>, RestoreError> {
            let mut out = BTreeSet::new();
            for name in names {
                match registry.id(name) {
                    Some(id) => {
                        out.insert(id);
                    }
                    None if mode == RestoreMode::Lenient => {
                        tracing::warn!(topic = %name, set, "dropping unknown research topic from save");
                    }
                    None => {
                        return Err(RestoreError::UnknownTopic {
                            set,
                            name: name.clone(),
                        });
                    }
                }
            }
            Ok(out)
        };

        Ok(Self {
            discovered: ids("discovered", &saved.discovered)?,
            disabled: ids("disabled", &saved.disabled)?,
            unlocked: ids("unlocked", &saved.unlocked)?,
            granted: ids("granted", &saved.granted)?,
            resolved_checkpoints: ids("resolvedCheckpoints", &saved.resolved_checkpoints)?,
            seen: ids("seen", &saved.seen)?,
            counters: saved.counters.clone(),
            final_mission_triggered: saved.final_mission_triggered,
        })
    }
}

// ---------------------------------------------------------------------------
// Save form
// ---------------------------------------------------------------------------

/// Name-keyed campaign research state, suitable for save files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedCampaign {
    pub discovered: Vec<String>,
    pub disabled: Vec<String>,
    pub unlocked: Vec<String>,
    pub granted: Vec<String>,
    pub resolved_checkpoints: Vec<String>,
    pub seen: Vec<String>,
    pub counters: BTreeMap<String, i64>,
    pub final_mission_triggered: bool,
}

/// How [`CampaignState::from_saved`] treats names missing from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestoreMode {
    Strict,
    #[default]
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RestoreError {
    #[error("save lists unknown research topic '{name}' in '{set}'")]
    UnknownTopic { set: &'static str, name: String },
}
