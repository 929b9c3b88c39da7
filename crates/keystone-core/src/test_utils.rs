//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature). Helpers panic on bad input; they are for fixtures
//! only.

use crate::catalog::{ProtectedPoolDef, RegistryBuilder, TopicDef};
use crate::effect::{Effect, EffectSink};
use crate::id::TopicId;
use crate::registry::Registry;
use crate::rng::DrawRng;

// ===========================================================================
// Definition helpers
// ===========================================================================

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// A plain topic with the given cost.
pub fn topic(name: &str, cost: i64) -> TopicDef {
    TopicDef::new(name, cost)
}

/// A topic depending on every name in `deps`.
pub fn topic_after(name: &str, deps: &[&str]) -> TopicDef {
    let mut def = TopicDef::new(name, 100);
    def.dependencies = names(deps);
    def
}

/// A zero-cost checkpoint depending on `deps` and unlocking `unlocks`.
pub fn checkpoint(name: &str, deps: &[&str], unlocks: &[&str]) -> TopicDef {
    let mut def = TopicDef::new(name, 0);
    def.dependencies = names(deps);
    def.unlocks = names(unlocks);
    def
}

pub fn protected(trigger: &str, topics: &[&str]) -> ProtectedPoolDef {
    ProtectedPoolDef {
        trigger: trigger.to_string(),
        topics: names(topics),
    }
}

pub fn link_defs(defs: impl IntoIterator<Item = TopicDef>) -> Registry {
    RegistryBuilder::load(defs)
        .expect("test catalog should load")
        .link()
        .expect("test catalog should link")
}

pub fn id(registry: &Registry, name: &str) -> TopicId {
    registry
        .id(name)
        .unwrap_or_else(|| panic!("no topic named {name}"))
}

// ===========================================================================
// Generated catalogs
// ===========================================================================

/// A layered catalog: `layers` rows of `width` topics, each depending on one
/// to three topics of the row above. Every tenth topic carries a flat bonus
/// pool from the next row, and every row ends in a checkpoint joining the
/// first two topics of that row.
pub fn layered_catalog(layers: usize, width: usize, seed: u64) -> Vec<TopicDef> {
    let mut rng = DrawRng::new(seed);
    let name = |layer: usize, col: usize| format!("t{layer}_{col}");
    let mut defs = Vec::with_capacity(layers * (width + 1));

    for layer in 0..layers {
        for col in 0..width {
            let mut def = TopicDef::new(&name(layer, col), 50 + (col as i64 % 7) * 10);
            def.points = (col % 5) as i32;
            if layer > 0 {
                let parents = 1 + rng.next_below(3);
                for _ in 0..parents {
                    let parent = name(layer - 1, rng.next_below(width));
                    if !def.dependencies.contains(&parent) {
                        def.dependencies.push(parent);
                    }
                }
            }
            if (layer * width + col) % 10 == 0 && layer + 1 < layers {
                def.get_one_free = (0..3).map(|c| name(layer + 1, (col + c) % width)).collect();
                def.sequential_get_one_free = col % 20 == 0;
            }
            defs.push(def);
        }
        if width >= 2 {
            let mut join = TopicDef::new(&format!("join{layer}"), 0);
            join.dependencies = vec![name(layer, 0), name(layer, 1)];
            defs.push(join);
        }
    }
    defs
}

// ===========================================================================
// Recording sink
// ===========================================================================

/// An [`EffectSink`] that remembers every request it receives.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingSink {
    pub effects: Vec<Effect>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawned(&self) -> Vec<(String, u32)> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::SpawnItem { item, count } => Some((item.clone(), *count)),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<String> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::RaiseEvent { event } => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn total_points(&self) -> i64 {
        self.effects
            .iter()
            .map(|e| match e {
                Effect::AwardPoints { points, .. } => i64::from(*points),
                _ => 0,
            })
            .sum()
    }
}

impl EffectSink for RecordingSink {
    fn spawn_item(&mut self, item: &str, count: u32) {
        self.effects.push(Effect::SpawnItem {
            item: item.to_string(),
            count,
        });
    }

    fn raise_event(&mut self, event: &str) {
        self.effects.push(Effect::RaiseEvent {
            event: event.to_string(),
        });
    }

    fn consume_item(&mut self, item: &str, count: u32) {
        self.effects.push(Effect::ConsumeItem {
            item: item.to_string(),
            count,
        });
    }

    fn show_cutscene(&mut self, cutscene: &str) {
        self.effects.push(Effect::ShowCutscene {
            cutscene: cutscene.to_string(),
        });
    }

    fn adjust_counter(&mut self, counter: &str, delta: i64, value: i64) {
        self.effects.push(Effect::AdjustCounter {
            counter: counter.to_string(),
            delta,
            value,
        });
    }

    fn award_points(&mut self, topic: TopicId, points: i32) {
        self.effects.push(Effect::AwardPoints { topic, points });
    }

    fn trigger_final_mission(&mut self, topic: TopicId) {
        self.effects.push(Effect::FinalMission { topic });
    }
}
