//! Incremental availability tracking.
//!
//! [`AvailabilityIndex`] keeps, for every topic, how many of its
//! `dependencies` and `requires` are still unresearched. Feeding it each
//! [`EffectBatch`] keeps the counters current in time proportional to the
//! reverse edges touched, so the prerequisite check becomes a pair of
//! comparisons instead of a walk over the topic's edges.

use crate::campaign::CampaignState;
use crate::effect::EffectBatch;
use crate::id::TopicId;
use crate::registry::Registry;
use crate::resolver::{self, ResourceQuery};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityIndex {
    missing_dependencies: Vec<u32>,
    missing_requires: Vec<u32>,
}

impl AvailabilityIndex {
    /// Count unresearched prerequisites for every topic.
    pub fn build(registry: &Registry, campaign: &CampaignState) -> Self {
        let missing = |edges: &[TopicId]| {
            edges.iter().filter(|&&id| !campaign.is_researched(id)).count() as u32
        };
        Self {
            missing_dependencies: registry.iter().map(|t| missing(&t.dependencies)).collect(),
            missing_requires: registry.iter().map(|t| missing(&t.requires)).collect(),
        }
    }

    /// Account for one topic becoming researched. Must be called exactly once
    /// per topic.
    pub fn record_researched(&mut self, registry: &Registry, id: TopicId) {
        for dependent in registry.dependency_dependents(id) {
            if let Some(count) = self.missing_dependencies.get_mut(dependent.index()) {
                *count = count.saturating_sub(1);
            }
        }
        for dependent in registry.requires_dependents(id) {
            if let Some(count) = self.missing_requires.get_mut(dependent.index()) {
                *count = count.saturating_sub(1);
            }
        }
    }

    /// Account for everything a completion researched.
    pub fn apply(&mut self, registry: &Registry, batch: &EffectBatch) {
        for id in batch.researched() {
            self.record_researched(registry, id);
        }
    }

    pub fn missing_dependencies(&self, id: TopicId) -> Option<u32> {
        self.missing_dependencies.get(id.index()).copied()
    }

    pub fn missing_requires(&self, id: TopicId) -> Option<u32> {
        self.missing_requires.get(id.index()).copied()
    }

    /// Same answer as [`resolver::is_available`].
    pub fn is_available(
        &self,
        registry: &Registry,
        campaign: &CampaignState,
        resources: &dyn ResourceQuery,
        id: TopicId,
    ) -> bool {
        let Some(topic) = registry.get(id) else {
            return false;
        };
        if topic.is_checkpoint() || resolver::is_done(topic, campaign) || campaign.is_disabled(id)
        {
            return false;
        }
        let dependencies_met =
            campaign.is_unlocked(id) || self.missing_dependencies(id) == Some(0);
        dependencies_met
            && self.missing_requires(id) == Some(0)
            && resolver::resource_gates_open(topic, resources)
    }

    pub fn available(
        &self,
        registry: &Registry,
        campaign: &CampaignState,
        resources: &dyn ResourceQuery,
    ) -> BTreeSet<TopicId> {
        registry
            .iter()
            .filter(|t| self.is_available(registry, campaign, resources, t.id))
            .map(|t| t.id)
            .collect()
    }
}
