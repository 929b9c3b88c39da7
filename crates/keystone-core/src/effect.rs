//! Completion results and side-effect delivery.
//!
//! The processor never touches base stores or the geoscape. It describes what
//! should happen in an [`EffectBatch`]; the campaign layer hands the batch to
//! an [`EffectSink`] once it is ready to apply it.

use crate::id::TopicId;
use crate::selection::PoolSource;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Effect requests
// ---------------------------------------------------------------------------

/// One side-effect request produced by a completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    SpawnItem { item: String, count: u32 },
    ConsumeItem { item: String, count: u32 },
    RaiseEvent { event: String },
    ShowCutscene { cutscene: String },
    /// A campaign counter moved by `delta` and now holds `value`.
    AdjustCounter {
        counter: String,
        delta: i64,
        value: i64,
    },
    AwardPoints { topic: TopicId, points: i32 },
    /// Fired at most once per campaign.
    FinalMission { topic: TopicId },
}

/// A bonus topic handed out by a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusGrant {
    /// The topic whose completion triggered the draw.
    pub from: TopicId,
    pub topic: TopicId,
    pub source: PoolSource,
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Everything that changed during one call into the processor.
///
/// State changes have already been applied to the campaign; `effects` are
/// requests for the outside world. Lists only contain real transitions: a
/// topic that was already unlocked does not show up in `unlocked` again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectBatch {
    /// The topic passed to `complete`, if any.
    pub topic: Option<TopicId>,
    /// Topics whose full completion ran, in order: the requested topic first,
    /// then any checkpoints settled behind it.
    pub completed: Vec<TopicId>,
    pub discovered: Vec<TopicId>,
    pub resolved_checkpoints: Vec<TopicId>,
    pub unlocked: Vec<TopicId>,
    pub disabled: Vec<TopicId>,
    pub reenabled: Vec<TopicId>,
    pub bonuses: Vec<BonusGrant>,
    /// Total score awarded by this batch.
    pub points: i64,
    pub effects: Vec<Effect>,
    pub final_mission: bool,
}

impl EffectBatch {
    pub fn new(topic: Option<TopicId>) -> Self {
        Self {
            topic,
            ..Self::default()
        }
    }

    /// True if nothing happened (an already-completed topic, for example).
    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
            && self.discovered.is_empty()
            && self.resolved_checkpoints.is_empty()
            && self.unlocked.is_empty()
            && self.disabled.is_empty()
            && self.reenabled.is_empty()
            && self.bonuses.is_empty()
            && self.effects.is_empty()
    }

    /// Topics that became researched, discovered or resolved, in this batch.
    pub fn researched(&self) -> impl Iterator<Item = TopicId> + '_ {
        self.discovered
            .iter()
            .chain(self.resolved_checkpoints.iter())
            .copied()
    }

    pub(crate) fn award(&mut self, topic: TopicId, points: i32) {
        if points != 0 {
            self.points += i64::from(points);
            self.effects.push(Effect::AwardPoints { topic, points });
        }
    }

    /// Deliver every effect request to `sink`, in order.
    pub fn apply(&self, sink: &mut dyn EffectSink) {
        for effect in &self.effects {
            match effect {
                Effect::SpawnItem { item, count } => sink.spawn_item(item, *count),
                Effect::ConsumeItem { item, count } => sink.consume_item(item, *count),
                Effect::RaiseEvent { event } => sink.raise_event(event),
                Effect::ShowCutscene { cutscene } => sink.show_cutscene(cutscene),
                Effect::AdjustCounter {
                    counter,
                    delta,
                    value,
                } => sink.adjust_counter(counter, *delta, *value),
                Effect::AwardPoints { topic, points } => sink.award_points(*topic, *points),
                Effect::FinalMission { topic } => sink.trigger_final_mission(*topic),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

/// Receiver for completion side effects.
///
/// Only item spawns and events are mandatory; everything else defaults to
/// ignoring the request.
pub trait EffectSink {
    fn spawn_item(&mut self, item: &str, count: u32);

    fn raise_event(&mut self, event: &str);

    fn consume_item(&mut self, _item: &str, _count: u32) {}

    fn show_cutscene(&mut self, _cutscene: &str) {}

    /// `value` is the counter's value after the adjustment.
    fn adjust_counter(&mut self, _counter: &str, _delta: i64, _value: i64) {}

    fn award_points(&mut self, _topic: TopicId, _points: i32) {}

    fn trigger_final_mission(&mut self, _topic: TopicId) {}
}
