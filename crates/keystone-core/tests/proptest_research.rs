//! Property-based tests for the research engine.
//!
//! Uses proptest to generate random acyclic catalogs and completion
//! sequences, then verify the cascade invariants hold.

use keystone_core::campaign::{CampaignState, RestoreMode, SavedCampaign};
use keystone_core::index::AvailabilityIndex;
use keystone_core::processor::Processor;
use keystone_core::registry::Registry;
use keystone_core::resolver::{self, Unrestricted};
use keystone_core::rng::DrawRng;
use keystone_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
struct TopicShape {
    checkpoint: bool,
    repeatable: bool,
    dependencies: Vec<usize>,
    requires: Vec<usize>,
    unlocks: Vec<usize>,
    disables: Vec<usize>,
    reenables: Vec<usize>,
    get_one_free: Vec<usize>,
    protected: Option<(usize, Vec<usize>)>,
    list_order: i32,
}

fn arb_topic(n: usize) -> impl Strategy<Value = TopicShape> {
    let edges = move || proptest::collection::vec(0..n, 0..3);
    (
        prop::bool::weighted(0.15),
        prop::bool::weighted(0.1),
        edges(),
        proptest::collection::vec(0..n, 0..2),
        edges(),
        proptest::collection::vec(0..n, 0..2),
        proptest::collection::vec(0..n, 0..2),
        edges(),
        proptest::option::weighted(0.2, (0..n, proptest::collection::vec(0..n, 1..3))),
        -50..50i32,
    )
        .prop_map(
            |(
                checkpoint,
                repeatable,
                dependencies,
                requires,
                unlocks,
                disables,
                reenables,
                get_one_free,
                protected,
                list_order,
            )| TopicShape {
                checkpoint,
                repeatable,
                dependencies,
                requires,
                unlocks,
                disables,
                reenables,
                get_one_free,
                protected,
                list_order,
            },
        )
}

fn arb_catalog(max_topics: usize) -> impl Strategy<Value = Vec<TopicShape>> {
    (2..=max_topics).prop_flat_map(|n| proptest::collection::vec(arb_topic(n), n))
}

fn name(i: usize) -> String {
    format!("t{i}")
}

/// Prerequisite edges only point at earlier topics, so the catalog is always
/// acyclic.
fn build(shapes: &[TopicShape]) -> Registry {
    let n = shapes.len();
    let any = |list: &[usize]| list.iter().map(|&t| name(t % n)).collect::<Vec<_>>();
    let defs = shapes.iter().enumerate().map(|(i, s)| {
        let earlier = |list: &[usize]| {
            if i == 0 {
                Vec::new()
            } else {
                list.iter().map(|&d| name(d % i)).collect::<Vec<_>>()
            }
        };
        let dependencies = earlier(&s.dependencies);
        let dependency_refs: Vec<&str> = dependencies.iter().map(String::as_str).collect();
        let unlocks = any(&s.unlocks);
        let unlock_refs: Vec<&str> = unlocks.iter().map(String::as_str).collect();

        let mut def = if s.checkpoint {
            checkpoint(&name(i), &dependency_refs, &unlock_refs)
        } else {
            let mut def = topic_after(&name(i), &dependency_refs);
            def.unlocks = unlocks.clone();
            def
        };
        def.repeatable = s.repeatable;
        def.list_order = Some(s.list_order);
        def.requires = earlier(&s.requires);
        def.disables = any(&s.disables);
        def.reenables = any(&s.reenables);
        def.get_one_free = any(&s.get_one_free);
        if let Some((trigger, pool)) = &s.protected {
            let pool = any(pool);
            let pool_refs: Vec<&str> = pool.iter().map(String::as_str).collect();
            def.get_one_free_protected = vec![protected(&name(trigger % n), &pool_refs)];
        }
        def
    });
    link_defs(defs)
}

fn arb_sequence() -> impl Strategy<Value = Vec<usize>> {
    proptest::collection::vec(0..1000usize, 0..40)
}

/// Complete the topics named by `sequence`, calling `check` after each step.
fn play(
    registry: &Registry,
    sequence: &[usize],
    seed: u64,
    mut check: impl FnMut(&CampaignState, &keystone_core::effect::EffectBatch),
) -> (CampaignState, DrawRng) {
    let processor = Processor::new(registry);
    let mut state = CampaignState::new();
    let mut rng = DrawRng::new(seed);
    let batch = processor.settle(&mut state, &mut rng);
    check(&state, &batch);
    for &pick in sequence {
        let topic = id(registry, &name(pick % registry.len()));
        let batch = processor.complete(&mut state, topic, &mut rng).unwrap();
        check(&state, &batch);
    }
    (state, rng)
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Checkpoints are resolved, never discovered.
    #[test]
    fn checkpoints_never_discovered(shapes in arb_catalog(30), seq in arb_sequence(), seed in any::<u64>()) {
        let registry = build(&shapes);
        let mut violations = Vec::new();
        play(&registry, &seq, seed, |state, _| {
            for topic in registry.iter().filter(|t| t.is_checkpoint()) {
                if state.is_discovered(topic.id) {
                    violations.push(topic.name.clone());
                }
            }
        });
        prop_assert!(violations.is_empty(), "checkpoints discovered: {:?}", violations);
    }

    /// The incremental index agrees with a full rescan after every step.
    #[test]
    fn index_matches_resolver(shapes in arb_catalog(30), seq in arb_sequence(), seed in any::<u64>()) {
        let registry = build(&shapes);
        let mut index = AvailabilityIndex::build(&registry, &CampaignState::new());
        let mut mismatches = 0;
        play(&registry, &seq, seed, |state, batch| {
            index.apply(&registry, batch);
            if index.available(&registry, state, &Unrestricted)
                != resolver::available(&registry, state, &Unrestricted)
            {
                mismatches += 1;
            }
        });
        prop_assert_eq!(mismatches, 0);
    }

    /// The resolver matches the availability rule stated from public queries.
    #[test]
    fn availability_rule(shapes in arb_catalog(30), seq in arb_sequence(), seed in any::<u64>()) {
        let registry = build(&shapes);
        let (state, _) = play(&registry, &seq, seed, |_, _| {});
        for topic in registry.iter() {
            let expected = !topic.is_checkpoint()
                && (topic.repeatable || !state.is_discovered(topic.id))
                && !state.is_disabled(topic.id)
                && (state.is_unlocked(topic.id)
                    || topic.dependencies.iter().all(|&d| state.is_researched(d)))
                && topic.requires.iter().all(|&r| state.is_researched(r));
            prop_assert_eq!(
                resolver::is_available(&registry, &state, &Unrestricted, topic.id),
                expected,
                "topic {}", topic.name
            );
        }
    }

    /// A second completion of a non-repeatable topic changes nothing.
    #[test]
    fn completion_is_idempotent(shapes in arb_catalog(30), seq in arb_sequence(), pick in 0..1000usize) {
        let registry = build(&shapes);
        let (mut state, mut rng) = play(&registry, &seq, 1, |_, _| {});
        let processor = Processor::new(&registry);
        let topic = registry.iter().nth(pick % registry.len()).unwrap();
        prop_assume!(!topic.repeatable);

        processor.complete(&mut state, topic.id, &mut rng).unwrap();
        let (state_once, rng_once) = (state.clone(), rng.clone());
        let batch = processor.complete(&mut state, topic.id, &mut rng).unwrap();

        prop_assert!(batch.is_empty());
        prop_assert_eq!(state, state_once);
        prop_assert_eq!(rng, rng_once);
    }

    /// Saving by name and restoring yields the same available set.
    #[test]
    fn saved_round_trip(shapes in arb_catalog(30), seq in arb_sequence(), seed in any::<u64>()) {
        let registry = build(&shapes);
        let (state, _) = play(&registry, &seq, seed, |_, _| {});

        let json = serde_json::to_string(&state.to_saved(&registry)).unwrap();
        let saved: SavedCampaign = serde_json::from_str(&json).unwrap();
        let restored = CampaignState::from_saved(&registry, &saved, RestoreMode::Strict).unwrap();

        prop_assert_eq!(
            resolver::available(&registry, &restored, &Unrestricted),
            resolver::available(&registry, &state, &Unrestricted)
        );
        prop_assert_eq!(restored, state);
    }

    /// Sequential draws walk the pool in ascending listOrder without repeats.
    #[test]
    fn sequential_draws_ascend(
        orders in Just((0..12).collect::<Vec<i32>>()).prop_shuffle(),
        size in 1..12usize,
    ) {
        let mut source = topic("source", 100);
        source.repeatable = true;
        source.sequential_get_one_free = true;
        let pool: Vec<String> = (0..size).map(|i| format!("p{i}")).collect();
        source.get_one_free = pool.clone();

        let mut defs = vec![source];
        for (i, p) in pool.iter().enumerate() {
            let mut def = topic(p, 100);
            def.list_order = Some(orders[i]);
            defs.push(def);
        }
        let registry = link_defs(defs);
        let processor = Processor::new(&registry);
        let mut state = CampaignState::new();
        let mut rng = DrawRng::new(0);
        let source = id(&registry, "source");

        let mut drawn = Vec::new();
        for _ in 0..size {
            let batch = processor.complete(&mut state, source, &mut rng).unwrap();
            prop_assert_eq!(batch.bonuses.len(), 1);
            drawn.push(registry.get(batch.bonuses[0].topic).unwrap().list_order);
        }
        prop_assert!(drawn.windows(2).all(|w| w[0] < w[1]), "draw order {:?}", drawn);

        let batch = processor.complete(&mut state, source, &mut rng).unwrap();
        prop_assert!(batch.bonuses.is_empty());
    }
}
