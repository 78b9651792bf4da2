//! Micro-benchmarks for the routing-table hot paths: applying a received
//! distance vector and building a per-neighbor advertisement.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ripsim::config::ProtocolTimers;
use ripsim::routing_table::RoutingTable;
use ripsim::{LinkCost, PathCost, RouterId};
use std::collections::BTreeMap;

fn rid(index: usize) -> RouterId {
    RouterId::try_new(format!("R{index}")).unwrap()
}

fn populated_table(destinations: usize) -> (RoutingTable, ProtocolTimers) {
    let timers = ProtocolTimers::default();
    let mut table = RoutingTable::new(rid(0));
    let all: Vec<RouterId> = (0..destinations).map(rid).collect();
    let neighbors = vec![
        (rid(1), LinkCost::try_new(2).unwrap()),
        (rid(2), LinkCost::try_new(3).unwrap()),
    ];
    table.initialize(&all, &neighbors, 0.0, &timers);

    // Learn a route to every destination through neighbor 1.
    let vector: BTreeMap<RouterId, PathCost> = (3..destinations)
        .map(|index| (rid(index), PathCost::try_new((index % 13) as u8).unwrap()))
        .collect();
    table.apply_vector(&rid(1), LinkCost::try_new(2).unwrap(), &vector, 1.0, &timers);
    (table, timers)
}

fn bench_apply_vector(c: &mut Criterion) {
    let (mut table, timers) = populated_table(64);
    let link = LinkCost::try_new(3).unwrap();
    let vector: BTreeMap<RouterId, PathCost> = (3..64)
        .map(|index| (rid(index), PathCost::try_new((index % 11) as u8).unwrap()))
        .collect();

    let mut now = 2.0;
    c.bench_function("apply_vector_64_destinations", |b| {
        b.iter(|| {
            now += 0.001;
            black_box(table.apply_vector(&rid(2), link, black_box(&vector), now, &timers));
        });
    });
}

fn bench_advertisement(c: &mut Criterion) {
    let (mut table, _timers) = populated_table(64);
    c.bench_function("advertisement_64_destinations", |b| {
        b.iter(|| {
            black_box(table.advertisement_for(&rid(1), black_box(10.0)));
        });
    });
}

criterion_group!(benches, bench_apply_vector, bench_advertisement);
criterion_main!(benches);
