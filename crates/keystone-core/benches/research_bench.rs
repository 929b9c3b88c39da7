//! Criterion benchmarks for the research engine.
//!
//! Three benchmark groups:
//! - `link`: validating and linking a 600-topic catalog
//! - `availability`: full rescan vs the incremental index mid-campaign
//! - `campaign`: completing every topic of a catalog in list order

use criterion::{Criterion, criterion_group, criterion_main};
use keystone_core::campaign::CampaignState;
use keystone_core::catalog::RegistryBuilder;
use keystone_core::index::AvailabilityIndex;
use keystone_core::processor::Processor;
use keystone_core::registry::Registry;
use keystone_core::resolver::{self, Unrestricted};
use keystone_core::rng::DrawRng;
use keystone_core::test_utils::*;

const LAYERS: usize = 20;
const WIDTH: usize = 30;

/// Play through the catalog until roughly half of it is researched.
fn half_played(registry: &Registry) -> (CampaignState, DrawRng) {
    let processor = Processor::new(registry);
    let mut state = CampaignState::new();
    let mut rng = DrawRng::new(7);
    processor.settle(&mut state, &mut rng);

    while state.discovered_count() < registry.len() / 2 {
        let next = resolver::available_in_list_order(registry, &state, &Unrestricted);
        let Some(&topic) = next.first() else { break };
        processor.complete(&mut state, topic, &mut rng).unwrap();
    }
    (state, rng)
}

fn bench_link(c: &mut Criterion) {
    let defs = layered_catalog(LAYERS, WIDTH, 1);
    c.bench_function("link_600_topics", |b| {
        b.iter(|| {
            RegistryBuilder::load(defs.clone()).unwrap().link().unwrap();
        });
    });
}

fn bench_availability(c: &mut Criterion) {
    let registry = link_defs(layered_catalog(LAYERS, WIDTH, 1));
    let (state, _) = half_played(&registry);
    let index = AvailabilityIndex::build(&registry, &state);

    let mut group = c.benchmark_group("availability");
    group.bench_function("rescan", |b| {
        b.iter(|| resolver::available(&registry, &state, &Unrestricted));
    });
    group.bench_function("index", |b| {
        b.iter(|| index.available(&registry, &state, &Unrestricted));
    });
    group.finish();
}

fn bench_campaign(c: &mut Criterion) {
    let registry = link_defs(layered_catalog(LAYERS, WIDTH, 1));
    let order: Vec<_> = registry.in_list_order().map(|t| t.id).collect();

    c.bench_function("complete_whole_catalog", |b| {
        b.iter(|| {
            let processor = Processor::new(&registry);
            let mut state = CampaignState::new();
            let mut rng = DrawRng::new(3);
            for &topic in &order {
                processor.complete(&mut state, topic, &mut rng).unwrap();
            }
            state
        });
    });
}

criterion_group!(benches, bench_link, bench_availability, bench_campaign);
criterion_main!(benches);
