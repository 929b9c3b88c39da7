//! The completion state machine.
//!
//! [`Processor::complete`] applies the full cascade for one finished research
//! topic to a [`CampaignState`] and returns an [`EffectBatch`] describing it.
//! The cascade for a topic T runs in this order:
//!
//! 1. T is discovered (checkpoints are resolved instead; repeatable topics
//!    are neither).
//! 2. T.unlocks are recorded as unlocked.
//! 3. T.disables are disabled.
//! 4. T.reenables have their disabled mark cleared.
//! 5. One bonus topic may be drawn from T's pools.
//! 6. Counters are adjusted.
//! 7. Side-effect requests are queued.
//! 8. The final mission fires, once per campaign.
//!
//! Afterwards every checkpoint whose structural gates are now open is
//! completed the same way, in listOrder, until none remain.

use crate::campaign::CampaignState;
use crate::effect::{BonusGrant, Effect, EffectBatch};
use crate::id::TopicId;
use crate::registry::Registry;
use crate::resolver;
use crate::rng::DrawRng;
use crate::selection::{self, ProtectedExhaustion};
use crate::topic::Topic;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Configuration and errors
// ---------------------------------------------------------------------------

/// Tunables for the completion cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Complete newly open checkpoint topics automatically.
    pub settle_checkpoints: bool,
    pub protected_exhaustion: ProtectedExhaustion,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            settle_checkpoints: true,
            protected_exhaustion: ProtectedExhaustion::NoGrant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    #[error("research topic {0:?} is not in the registry")]
    UnknownTopic(TopicId),
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Applies completions against one registry.
#[derive(Debug, Clone, Copy)]
pub struct Processor<'r> {
    registry: &'r Registry,
    config: ProcessorConfig,
}

impl<'r> Processor<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self::with_config(registry, ProcessorConfig::default())
    }

    pub fn with_config(registry: &'r Registry, config: ProcessorConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Apply the completion of `id` to `campaign`.
    ///
    /// Completing a topic that is already discovered (or a checkpoint that is
    /// already resolved) returns an empty batch and leaves the campaign and
    /// RNG untouched. Repeatable topics run their cascade every time.
    pub fn complete(
        &self,
        campaign: &mut CampaignState,
        id: TopicId,
        rng: &mut DrawRng,
    ) -> Result<EffectBatch, CompletionError> {
        let topic = self.topic(id)?;
        let mut batch = EffectBatch::new(Some(id));
        if resolver::is_done(topic, campaign) {
            tracing::debug!(topic = %topic.name, "research already complete, nothing to do");
            return Ok(batch);
        }

        self.run(topic, campaign, rng, &mut batch);
        if self.config.settle_checkpoints {
            self.settle_into(campaign, rng, &mut batch);
        }
        Ok(batch)
    }

    /// Complete every checkpoint whose gates are open. Call once when a
    /// campaign starts; `complete` does this on its own afterwards.
    pub fn settle(&self, campaign: &mut CampaignState, rng: &mut DrawRng) -> EffectBatch {
        let mut batch = EffectBatch::new(None);
        self.settle_into(campaign, rng, &mut batch);
        batch
    }

    /// Mark `id` researched without running its bonus draw or side effects.
    /// Used for a new campaign's starting research. A final-mission topic
    /// still triggers the end game.
    pub fn grant(
        &self,
        campaign: &mut CampaignState,
        id: TopicId,
        rng: &mut DrawRng,
    ) -> Result<EffectBatch, CompletionError> {
        let topic = self.topic(id)?;
        let mut batch = EffectBatch::new(Some(id));
        if resolver::is_done(topic, campaign) {
            return Ok(batch);
        }

        self.mark_done(topic, campaign, &mut batch);
        self.structural(topic, campaign, &mut batch);
        self.final_mission(topic, campaign, &mut batch);
        if self.config.settle_checkpoints {
            self.settle_into(campaign, rng, &mut batch);
        }
        Ok(batch)
    }

    fn topic(&self, id: TopicId) -> Result<&'r Topic, CompletionError> {
        self.registry
            .get(id)
            .ok_or(CompletionError::UnknownTopic(id))
    }

    // -- Cascade steps --

    fn run(
        &self,
        topic: &'r Topic,
        campaign: &mut CampaignState,
        rng: &mut DrawRng,
        batch: &mut EffectBatch,
    ) {
        tracing::debug!(topic = %topic.name, checkpoint = topic.is_checkpoint(), "completing research");
        batch.completed.push(topic.id);

        self.mark_done(topic, campaign, batch);
        self.structural(topic, campaign, batch);
        self.bonus(topic, campaign, rng, batch);
        self.counters(topic, campaign, batch);
        self.side_effects(topic, batch);
        self.final_mission(topic, campaign, batch);
    }

    /// Step 1. Returns whether anything changed.
    fn mark_done(&self, topic: &Topic, campaign: &mut CampaignState, batch: &mut EffectBatch) -> bool {
        if topic.is_checkpoint() {
            let fresh = campaign.resolve_checkpoint(topic.id);
            if fresh {
                batch.resolved_checkpoints.push(topic.id);
            }
            fresh
        } else if !topic.repeatable {
            let fresh = campaign.discover(topic.id);
            if fresh {
                batch.discovered.push(topic.id);
            }
            fresh
        } else {
            false
        }
    }

    /// Steps 2 to 4, then the lookup topic.
    fn structural(&self, topic: &Topic, campaign: &mut CampaignState, batch: &mut EffectBatch) {
        for &id in &topic.unlocks {
            if campaign.unlock(id) {
                batch.unlocked.push(id);
            }
        }
        for &id in &topic.disables {
            if campaign.disable(id) {
                batch.disabled.push(id);
            }
        }
        for &id in &topic.reenables {
            if campaign.reenable(id) {
                batch.reenabled.push(id);
            }
        }

        let Some(lookup) = topic.lookup.and_then(|id| self.registry.get(id)) else {
            return;
        };
        if lookup.is_discoverable() && self.mark_done(lookup, campaign, batch) {
            tracing::debug!(topic = %topic.name, lookup = %lookup.name, "lookup discovered");
            self.structural(lookup, campaign, batch);
            self.final_mission(lookup, campaign, batch);
        }
    }

    /// Step 5.
    fn bonus(
        &self,
        topic: &Topic,
        campaign: &mut CampaignState,
        rng: &mut DrawRng,
        batch: &mut EffectBatch,
    ) {
        let Some(draw) = selection::select_bonus(
            self.registry,
            topic,
            campaign,
            rng,
            self.config.protected_exhaustion,
        ) else {
            return;
        };
        let Some(granted) = self.registry.get(draw.topic) else {
            return;
        };

        tracing::debug!(
            topic = %topic.name,
            granted = %granted.name,
            source = ?draw.source,
            "bonus research granted"
        );
        campaign.record_grant(granted.id);
        batch.bonuses.push(BonusGrant {
            from: topic.id,
            topic: granted.id,
            source: draw.source,
        });
        self.mark_done(granted, campaign, batch);
        self.structural(granted, campaign, batch);
        batch.award(granted.id, granted.points);
        self.final_mission(granted, campaign, batch);
    }

    /// Step 6.
    fn counters(&self, topic: &Topic, campaign: &mut CampaignState, batch: &mut EffectBatch) {
        let deltas = topic
            .decrease_counter
            .iter()
            .map(|name| (name, -1))
            .chain(topic.increase_counter.iter().map(|name| (name, 1)));
        for (name, delta) in deltas {
            let value = campaign.adjust_counter(name, delta);
            batch.effects.push(Effect::AdjustCounter {
                counter: name.clone(),
                delta,
                value,
            });
        }
    }

    /// Step 7.
    fn side_effects(&self, topic: &Topic, batch: &mut EffectBatch) {
        batch.award(topic.id, topic.points);

        if let Some(item) = &topic.spawned_item {
            if topic.spawned_item_count > 0 {
                batch.effects.push(Effect::SpawnItem {
                    item: item.clone(),
                    count: topic.spawned_item_count,
                });
            }
        }
        for item in &topic.spawned_item_list {
            batch.effects.push(Effect::SpawnItem {
                item: item.clone(),
                count: 1,
            });
        }
        if let Some(gate) = topic.needed_item.as_ref().filter(|g| g.destroy) {
            batch.effects.push(Effect::ConsumeItem {
                item: gate.item.clone(),
                count: 1,
            });
        }
        if let Some(event) = &topic.spawned_event {
            batch.effects.push(Effect::RaiseEvent {
                event: event.clone(),
            });
        }
        if let Some(cutscene) = &topic.cutscene {
            batch.effects.push(Effect::ShowCutscene {
                cutscene: cutscene.clone(),
            });
        }
    }

    /// Step 8. Also runs for topics researched by a bonus draw, a lookup or
    /// a grant.
    fn final_mission(&self, topic: &Topic, campaign: &mut CampaignState, batch: &mut EffectBatch) {
        if topic.unlock_final_mission && campaign.trigger_final_mission() {
            tracing::info!(topic = %topic.name, "final mission unlocked");
            batch.final_mission = true;
            batch.effects.push(Effect::FinalMission { topic: topic.id });
        }
    }

    // -- Checkpoints --

    fn settle_into(&self, campaign: &mut CampaignState, rng: &mut DrawRng, batch: &mut EffectBatch) {
        while let Some(checkpoint) = self.next_open_checkpoint(campaign) {
            self.run(checkpoint, campaign, rng, batch);
        }
    }

    fn next_open_checkpoint(&self, campaign: &CampaignState) -> Option<&'r Topic> {
        self.registry.in_list_order().find(|t| {
            t.is_checkpoint()
                && !campaign.is_resolved_checkpoint(t.id)
                && resolver::graph_gates_open(t, campaign)
        })
    }
}

/// Complete `id` with the default [`ProcessorConfig`].
pub fn complete(
    registry: &Registry,
    campaign: &mut CampaignState,
    id: TopicId,
    rng: &mut DrawRng,
) -> Result<EffectBatch, CompletionError> {
    Processor::new(registry).complete(campaign, id, rng)
}
