//! Shared helpers for integration tests.
#![allow(dead_code)]

use ripsim::routing_table::RouteRow;
use ripsim::{EngineConfig, Network, RouterId, Topology};
use std::time::Duration;

/// Builds a router identifier from a label.
pub fn rid(label: &str) -> RouterId {
    RouterId::try_new(label.to_string()).unwrap()
}

/// The default 4-router network with a fixed seed and no random dynamics.
pub fn deterministic_network(seed: u64) -> Network {
    Network::new(&Topology::default(), EngineConfig::deterministic(seed)).unwrap()
}

/// Advances virtual time; under paused tokio time this drives every engine
/// task forward deterministically fast.
pub async fn advance(seconds: f64) {
    tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
}

/// Snapshot of one routing-table row.
pub async fn route(network: &Network, router: &str, dest: &str) -> RouteRow {
    let tables = network.snapshot_tables().await;
    tables[&rid(router)][&rid(dest)].clone()
}

/// Asserts a VALID row with the given cost and next hop.
pub async fn assert_route(network: &Network, router: &str, dest: &str, cost: u8, next_hop: &str) {
    let row = route(network, router, dest).await;
    assert_eq!(
        row.cost.as_u8(),
        cost,
        "{router} -> {dest}: expected cost {cost}, got {}",
        row.cost
    );
    assert_eq!(
        row.next_hop.as_ref(),
        Some(&rid(next_hop)),
        "{router} -> {dest}: expected next hop {next_hop}, got {:?}",
        row.next_hop
    );
    assert_eq!(row.status, ripsim::RouteStatus::Valid, "{router} -> {dest}");
}

/// Asserts the row is unreachable.
pub async fn assert_unreachable(network: &Network, router: &str, dest: &str) {
    let row = route(network, router, dest).await;
    assert!(
        row.cost.is_unreachable(),
        "{router} -> {dest}: expected unreachable, got {} via {:?}",
        row.cost,
        row.next_hop
    );
}
