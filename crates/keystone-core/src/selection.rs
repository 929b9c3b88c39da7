//! Bonus ("get one free") selection.
//!
//! Candidates come from the protected pools whose trigger topic is already
//! researched, scanned in declaration order. Only when no trigger is
//! satisfied does the flat pool apply. Topics already discovered, already
//! granted, or resolved checkpoints never qualify.

use crate::campaign::CampaignState;
use crate::id::TopicId;
use crate::registry::Registry;
use crate::rng::DrawRng;
use crate::topic::Topic;
use serde::{Deserialize, Serialize};

/// How a candidate is picked from an eligible pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawMode {
    /// Lowest listOrder first; declaration position breaks ties.
    Sequential,
    /// Uniform over the candidates, using the campaign RNG.
    Random,
}

impl DrawMode {
    pub fn for_topic(topic: &Topic) -> Self {
        if topic.sequential_get_one_free {
            DrawMode::Sequential
        } else {
            DrawMode::Random
        }
    }
}

/// What happens when a satisfied protected pool has nothing left to give.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProtectedExhaustion {
    /// No bonus this time.
    #[default]
    NoGrant,
    /// Draw from the flat pool instead.
    FallBackToFlat,
}

/// Which pool a bonus came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolSource {
    Protected,
    Flat,
}

/// The outcome of one bonus draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusDraw {
    pub topic: TopicId,
    pub source: PoolSource,
}

fn eligible(campaign: &CampaignState, id: TopicId) -> bool {
    !campaign.is_discovered(id)
        && !campaign.is_granted(id)
        && !campaign.is_resolved_checkpoint(id)
}

fn push_eligible(out: &mut Vec<TopicId>, campaign: &CampaignState, pool: &[TopicId]) {
    for &id in pool {
        if eligible(campaign, id) && !out.contains(&id) {
            out.push(id);
        }
    }
}

/// The eligible candidates for `topic`'s bonus draw, and the pool they came
/// from. An empty list means no grant.
pub fn candidates(
    topic: &Topic,
    campaign: &CampaignState,
    exhaustion: ProtectedExhaustion,
) -> (Vec<TopicId>, PoolSource) {
    let mut protected = Vec::new();
    let mut triggered = false;
    for pair in &topic.get_one_free_protected {
        if campaign.is_researched(pair.trigger) {
            triggered = true;
            push_eligible(&mut protected, campaign, &pair.pool);
        }
    }

    if triggered && (!protected.is_empty() || exhaustion == ProtectedExhaustion::NoGrant) {
        return (protected, PoolSource::Protected);
    }

    let mut flat = Vec::new();
    push_eligible(&mut flat, campaign, &topic.get_one_free);
    (flat, PoolSource::Flat)
}

/// Pick one of `candidates`. Random mode consumes exactly one RNG draw when
/// there is more than one candidate.
pub fn draw(
    registry: &Registry,
    candidates: &[TopicId],
    mode: DrawMode,
    rng: &mut DrawRng,
) -> Option<TopicId> {
    if candidates.is_empty() {
        return None;
    }
    match mode {
        DrawMode::Sequential => candidates
            .iter()
            .enumerate()
            .min_by_key(|&(pos, &id)| {
                let order = registry.get(id).map_or(i32::MAX, |t| t.list_order);
                (order, pos)
            })
            .map(|(_, &id)| id),
        DrawMode::Random => candidates.get(rng.next_below(candidates.len())).copied(),
    }
}

/// Run the full bonus selection for a just-completed topic.
pub fn select_bonus(
    registry: &Registry,
    topic: &Topic,
    campaign: &CampaignState,
    rng: &mut DrawRng,
    exhaustion: ProtectedExhaustion,
) -> Option<BonusDraw> {
    if !topic.grants_bonus() {
        return None;
    }
    let (pool, source) = candidates(topic, campaign, exhaustion);
    draw(registry, &pool, DrawMode::for_topic(topic), rng).map(|id| BonusDraw { topic: id, source })
}
