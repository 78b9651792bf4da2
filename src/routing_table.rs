//! Routing-table state machine
//!
//! The per-router table is a pure state machine over monotonic time: every
//! transition is a plain function of `(now, timers)` and returns what
//! changed, so the protocol core can be driven directly by unit and
//! property tests without any async machinery. The owning router task
//! translates the returned changes into events, statistics, and triggered
//! updates.
//!
//! Route lifecycle: `VALID -> INVALID -> GARBAGE`. A VALID route that is
//! not refreshed within the route timeout becomes INVALID (cost infinity,
//! garbage collection pending, destination held down); an INVALID route is
//! garbage-collected after the collection interval and then no longer
//! advertised.

use crate::config::ProtocolTimers;
use crate::domain_types::{LinkCost, PathCost, RouterId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

/// Lifecycle state of a route entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteStatus {
    Valid,
    Invalid,
    Garbage,
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::Invalid => write!(f, "INVALID"),
            Self::Garbage => write!(f, "GARBAGE"),
        }
    }
}

/// One row of a routing table.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub cost: PathCost,
    pub next_hop: Option<RouterId>,
    pub status: RouteStatus,
    pub last_update_time: f64,
    pub timeout_time: f64,
    pub garbage_time: f64,
}

impl RouteEntry {
    fn unreachable(now: f64) -> Self {
        Self {
            cost: PathCost::unreachable(),
            next_hop: None,
            status: RouteStatus::Invalid,
            last_update_time: now,
            timeout_time: 0.0,
            garbage_time: 0.0,
        }
    }
}

/// A route mutation reported back to the owning router.
#[derive(Debug, Clone)]
pub struct RouteChange {
    pub dest: RouterId,
    pub old_cost: PathCost,
    pub new_cost: PathCost,
    pub next_hop: Option<RouterId>,
}

/// Result of a timer sweep.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Destinations whose VALID route expired.
    pub timed_out: Vec<RouterId>,
    /// Destinations garbage-collected out of the table.
    pub collected: Vec<RouterId>,
}

impl SweepOutcome {
    /// True when the sweep changed at least one route.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.timed_out.is_empty() || !self.collected.is_empty()
    }
}

/// A per-neighbor advertisement: the distance vector plus the set of
/// destinations poison-reversed in it.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub vector: BTreeMap<RouterId, PathCost>,
    pub poison_set: BTreeSet<RouterId>,
}

impl Advertisement {
    /// True when at least one destination is poison-reversed.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        !self.poison_set.is_empty()
    }
}

/// Snapshot row exposed to observers.
#[derive(Debug, Clone, Serialize)]
pub struct RouteRow {
    pub dest: RouterId,
    pub cost: PathCost,
    pub next_hop: Option<RouterId>,
    pub status: RouteStatus,
    pub last_update_time: f64,
}

/// A router's routing table together with its hold-down set.
#[derive(Debug)]
pub struct RoutingTable {
    owner: RouterId,
    entries: BTreeMap<RouterId, RouteEntry>,
    hold_down: BTreeMap<RouterId, f64>,
}

impl RoutingTable {
    /// Creates an empty table owned by `owner`.
    #[must_use]
    pub fn new(owner: RouterId) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
            hold_down: BTreeMap::new(),
        }
    }

    /// The router this table belongs to.
    #[must_use]
    pub fn owner(&self) -> &RouterId {
        &self.owner
    }

    /// (Re-)initializes the table over the full router set.
    ///
    /// The self-route is VALID at cost zero; every other destination starts
    /// unreachable, then each operational neighbor is written in directly at
    /// its link cost. Any previous entries and hold-downs are discarded.
    pub fn initialize(
        &mut self,
        all_routers: &[RouterId],
        neighbors: &[(RouterId, LinkCost)],
        now: f64,
        timers: &ProtocolTimers,
    ) {
        self.entries.clear();
        self.hold_down.clear();

        for dest in all_routers {
            let entry = if *dest == self.owner {
                RouteEntry {
                    cost: PathCost::zero(),
                    next_hop: Some(self.owner.clone()),
                    status: RouteStatus::Valid,
                    last_update_time: now,
                    timeout_time: 0.0,
                    garbage_time: 0.0,
                }
            } else {
                RouteEntry::unreachable(now)
            };
            self.entries.insert(dest.clone(), entry);
        }

        for (neighbor, cost) in neighbors {
            let entry = self
                .entries
                .entry(neighbor.clone())
                .or_insert_with(|| RouteEntry::unreachable(now));
            entry.cost = PathCost::from_link(*cost);
            entry.next_hop = Some(neighbor.clone());
            entry.status = RouteStatus::Valid;
            entry.last_update_time = now;
            entry.timeout_time = now + timers.route_timeout;
            entry.garbage_time = 0.0;
        }
    }

    /// Builds the advertisement for `neighbor`.
    ///
    /// Destinations routed through `neighbor` are poison-reversed to
    /// infinity; held-down destinations are withheld until their hold-down
    /// expires (expiry prunes them here); GARBAGE entries are omitted.
    pub fn advertisement_for(&mut self, neighbor: &RouterId, now: f64) -> Advertisement {
        let mut vector = BTreeMap::new();
        let mut poison_set = BTreeSet::new();

        let mut expired = Vec::new();
        for (dest, entry) in &self.entries {
            if entry.status == RouteStatus::Garbage {
                continue;
            }
            if let Some(&expiry) = self.hold_down.get(dest) {
                if now < expiry {
                    continue;
                }
                expired.push(dest.clone());
            }
            if entry.next_hop.as_ref() == Some(neighbor) && *dest != self.owner {
                vector.insert(dest.clone(), PathCost::unreachable());
                poison_set.insert(dest.clone());
            } else {
                vector.insert(dest.clone(), entry.cost);
            }
        }
        for dest in expired {
            self.hold_down.remove(&dest);
        }

        Advertisement { vector, poison_set }
    }

    /// Applies a received distance vector from `from` across a link of cost
    /// `link_cost`, returning every route that changed.
    pub fn apply_vector(
        &mut self,
        from: &RouterId,
        link_cost: LinkCost,
        vector: &BTreeMap<RouterId, PathCost>,
        now: f64,
        timers: &ProtocolTimers,
    ) -> Vec<RouteChange> {
        // Hearing from the neighbor at all refreshes its own row.
        if let Some(entry) = self.entries.get_mut(from) {
            entry.last_update_time = now;
            entry.timeout_time = now + timers.route_timeout;
        }

        let mut changes = Vec::new();
        for (dest, advertised) in vector {
            if *dest == self.owner {
                continue;
            }
            let new_cost = advertised.saturating_add(link_cost);
            let entry = self
                .entries
                .entry(dest.clone())
                .or_insert_with(|| RouteEntry::unreachable(now));

            if entry.next_hop.as_ref() == Some(from) {
                entry.last_update_time = now;
                entry.timeout_time = now + timers.route_timeout;
                if new_cost != entry.cost {
                    let old_cost = entry.cost;
                    entry.cost = new_cost;
                    if new_cost.is_unreachable() {
                        entry.status = RouteStatus::Invalid;
                        entry.garbage_time = now + timers.garbage_collection;
                        self.hold_down.insert(dest.clone(), now + timers.hold_down);
                    } else {
                        entry.status = RouteStatus::Valid;
                        entry.garbage_time = 0.0;
                    }
                    changes.push(RouteChange {
                        dest: dest.clone(),
                        old_cost,
                        new_cost,
                        next_hop: entry.next_hop.clone(),
                    });
                }
            } else if new_cost < entry.cost && !new_cost.is_unreachable() {
                match self.hold_down.get(dest) {
                    Some(&expiry) if now < expiry => {
                        debug!(owner = %self.owner, dest = %dest, via = %from,
                               "better route rejected during hold-down");
                        continue;
                    }
                    Some(_) => {
                        self.hold_down.remove(dest);
                    }
                    None => {}
                }
                let old_cost = entry.cost;
                entry.cost = new_cost;
                entry.next_hop = Some(from.clone());
                entry.status = RouteStatus::Valid;
                entry.last_update_time = now;
                entry.timeout_time = now + timers.route_timeout;
                entry.garbage_time = 0.0;
                changes.push(RouteChange {
                    dest: dest.clone(),
                    old_cost,
                    new_cost,
                    next_hop: Some(from.clone()),
                });
            }
        }
        changes
    }

    /// Expires VALID routes past their timeout and garbage-collects INVALID
    /// routes past their collection deadline.
    pub fn sweep(&mut self, now: f64, timers: &ProtocolTimers) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        let owner = self.owner.clone();
        for (dest, entry) in &mut self.entries {
            if *dest == owner {
                continue;
            }
            match entry.status {
                RouteStatus::Valid if entry.timeout_time > 0.0 && now > entry.timeout_time => {
                    entry.status = RouteStatus::Invalid;
                    entry.cost = PathCost::unreachable();
                    entry.garbage_time = now + timers.garbage_collection;
                    self.hold_down.insert(dest.clone(), now + timers.hold_down);
                    outcome.timed_out.push(dest.clone());
                }
                RouteStatus::Invalid if entry.garbage_time > 0.0 && now > entry.garbage_time => {
                    entry.status = RouteStatus::Garbage;
                    outcome.collected.push(dest.clone());
                }
                _ => {}
            }
        }
        outcome
    }

    /// Invalidates every route through `neighbor` after its link failed.
    pub fn fail_neighbor(
        &mut self,
        neighbor: &RouterId,
        now: f64,
        timers: &ProtocolTimers,
    ) -> Vec<RouteChange> {
        let mut changes = Vec::new();
        let owner = self.owner.clone();
        for (dest, entry) in &mut self.entries {
            if *dest == owner || entry.next_hop.as_ref() != Some(neighbor) {
                continue;
            }
            let old_cost = entry.cost;
            entry.cost = PathCost::unreachable();
            entry.status = RouteStatus::Invalid;
            entry.garbage_time = now + timers.garbage_collection;
            self.hold_down.insert(dest.clone(), now + timers.hold_down);
            changes.push(RouteChange {
                dest: dest.clone(),
                old_cost,
                new_cost: PathCost::unreachable(),
                next_hop: entry.next_hop.clone(),
            });
        }
        changes
    }

    /// Rewrites the direct route to `neighbor` after its link recovered or
    /// changed cost. Other destinations reconverge through the following
    /// advertisement exchange.
    pub fn recover_neighbor(
        &mut self,
        neighbor: &RouterId,
        cost: LinkCost,
        now: f64,
        timers: &ProtocolTimers,
    ) -> RouteChange {
        let entry = self
            .entries
            .entry(neighbor.clone())
            .or_insert_with(|| RouteEntry::unreachable(now));
        let old_cost = entry.cost;
        entry.cost = PathCost::from_link(cost);
        entry.next_hop = Some(neighbor.clone());
        entry.status = RouteStatus::Valid;
        entry.last_update_time = now;
        entry.timeout_time = now + timers.route_timeout;
        entry.garbage_time = 0.0;
        RouteChange {
            dest: neighbor.clone(),
            old_cost,
            new_cost: entry.cost,
            next_hop: Some(neighbor.clone()),
        }
    }

    /// The entry for `dest`, if any.
    #[must_use]
    pub fn entry(&self, dest: &RouterId) -> Option<&RouteEntry> {
        self.entries.get(dest)
    }

    /// True when `dest` is currently held down.
    #[must_use]
    pub fn is_held_down(&self, dest: &RouterId, now: f64) -> bool {
        self.hold_down.get(dest).is_some_and(|&expiry| now < expiry)
    }

    /// Snapshot of the table, keyed by destination.
    #[must_use]
    pub fn rows(&self) -> BTreeMap<RouterId, RouteRow> {
        self.entries
            .iter()
            .map(|(dest, entry)| {
                (
                    dest.clone(),
                    RouteRow {
                        dest: dest.clone(),
                        cost: entry.cost,
                        next_hop: entry.next_hop.clone(),
                        status: entry.status,
                        last_update_time: entry.last_update_time,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(label: &str) -> RouterId {
        RouterId::try_new(label.to_string()).unwrap()
    }

    fn cost(value: u8) -> LinkCost {
        LinkCost::try_new(value).unwrap()
    }

    fn path(value: u8) -> PathCost {
        PathCost::try_new(value).unwrap()
    }

    fn timers() -> ProtocolTimers {
        ProtocolTimers::default()
    }

    /// Table for router B of the demonstration topology, freshly initialized.
    fn table_for_b(now: f64) -> RoutingTable {
        let mut table = RoutingTable::new(id("B"));
        let all = vec![id("A"), id("B"), id("C"), id("D")];
        let neighbors = vec![(id("A"), cost(2)), (id("C"), cost(1)), (id("D"), cost(3))];
        table.initialize(&all, &neighbors, now, &timers());
        table
    }

    #[test]
    fn initialize_sets_self_route_and_neighbors() {
        let table = table_for_b(0.0);

        let self_route = table.entry(&id("B")).unwrap();
        assert_eq!(self_route.cost, PathCost::zero());
        assert_eq!(self_route.next_hop, Some(id("B")));
        assert_eq!(self_route.status, RouteStatus::Valid);

        let to_c = table.entry(&id("C")).unwrap();
        assert_eq!(to_c.cost, path(1));
        assert_eq!(to_c.next_hop, Some(id("C")));
        assert_eq!(to_c.status, RouteStatus::Valid);
        assert!(to_c.timeout_time > 0.0);
    }

    #[test]
    fn initialize_marks_non_neighbors_unreachable() {
        let mut table = RoutingTable::new(id("A"));
        let all = vec![id("A"), id("B"), id("Z")];
        table.initialize(&all, &[(id("B"), cost(2))], 0.0, &timers());

        let to_z = table.entry(&id("Z")).unwrap();
        assert!(to_z.cost.is_unreachable());
        assert_eq!(to_z.next_hop, None);
        assert_eq!(to_z.status, RouteStatus::Invalid);
    }

    #[test]
    fn adopts_strictly_better_route() {
        let mut table = table_for_b(0.0);
        // C advertises A at 2; via C that is 3, worse than the direct 2.
        let vector: BTreeMap<_, _> = [(id("A"), path(2))].into();
        let changes = table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers());
        assert!(changes.is_empty());

        // C advertises A at 1: cost 2 via C equals the current 2, ignored.
        let vector: BTreeMap<_, _> = [(id("A"), path(1))].into();
        assert!(table
            .apply_vector(&id("C"), cost(1), &vector, 2.0, &timers())
            .is_empty());

        // D advertises A at 1: cost 4 via D is worse, ignored.
        let vector: BTreeMap<_, _> = [(id("A"), path(1))].into();
        assert!(table
            .apply_vector(&id("D"), cost(3), &vector, 3.0, &timers())
            .is_empty());

        // A advertises D at 1: 3 via A ties the direct 3, ignored.
        let vector: BTreeMap<_, _> = [(id("D"), path(1))].into();
        assert!(table
            .apply_vector(&id("A"), cost(2), &vector, 4.0, &timers())
            .is_empty());

        // C advertises D at 1: 2 via C beats the direct 3.
        let vector: BTreeMap<_, _> = [(id("D"), path(1))].into();
        let changes = table.apply_vector(&id("C"), cost(1), &vector, 5.0, &timers());
        assert_eq!(changes.len(), 1);
        let to_d = table.entry(&id("D")).unwrap();
        assert_eq!(to_d.cost, path(2));
        assert_eq!(to_d.next_hop, Some(id("C")));
        assert_eq!(to_d.status, RouteStatus::Valid);
    }

    #[test]
    fn applying_the_same_vector_twice_changes_nothing_the_second_time() {
        let mut table = table_for_b(0.0);
        let vector: BTreeMap<_, _> = [(id("A"), path(4)), (id("D"), path(1))].into();

        let first = table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers());
        assert!(!first.is_empty());
        let second = table.apply_vector(&id("C"), cost(1), &vector, 1.5, &timers());
        assert!(second.is_empty());
    }

    #[test]
    fn same_next_hop_worsening_to_infinity_invalidates_and_holds_down() {
        let mut table = table_for_b(0.0);
        // Route D via C first.
        let vector: BTreeMap<_, _> = [(id("D"), path(1))].into();
        table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers());

        // C now reports D unreachable.
        let vector: BTreeMap<_, _> = [(id("D"), PathCost::unreachable())].into();
        let changes = table.apply_vector(&id("C"), cost(1), &vector, 2.0, &timers());
        assert_eq!(changes.len(), 1);

        let to_d = table.entry(&id("D")).unwrap();
        assert!(to_d.cost.is_unreachable());
        assert_eq!(to_d.status, RouteStatus::Invalid);
        assert!(to_d.garbage_time > 0.0);
        assert!(table.is_held_down(&id("D"), 2.0));
    }

    #[test]
    fn same_next_hop_cost_change_is_accepted_even_when_worse() {
        let mut table = table_for_b(0.0);
        // C advertises A at 6: via C that is 7; current next hop for A is A
        // itself, so nothing changes. Then A itself worsens.
        let vector: BTreeMap<_, _> = [(id("A"), path(9))].into();
        let changes = table.apply_vector(&id("A"), cost(2), &vector, 1.0, &timers());
        // A advertising a route to itself at 9 means 11 via A.
        assert_eq!(changes.len(), 1);
        let to_a = table.entry(&id("A")).unwrap();
        assert_eq!(to_a.cost, path(11));
        assert_eq!(to_a.status, RouteStatus::Valid);
    }

    #[test]
    fn hold_down_blocks_better_route_until_expiry() {
        let mut table = table_for_b(0.0);
        let timers = timers();

        // C withdraws D.
        let vector: BTreeMap<_, _> = [(id("D"), path(1))].into();
        table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers);
        let withdraw: BTreeMap<_, _> = [(id("D"), PathCost::unreachable())].into();
        table.apply_vector(&id("C"), cost(1), &withdraw, 2.0, &timers);
        assert!(table.is_held_down(&id("D"), 2.0));

        // A offers a finite route to D during hold-down: rejected.
        let offer: BTreeMap<_, _> = [(id("D"), path(2))].into();
        let changes = table.apply_vector(&id("A"), cost(2), &offer, 10.0, &timers);
        assert!(changes.is_empty());
        assert!(table.entry(&id("D")).unwrap().cost.is_unreachable());

        // After expiry the same offer is adopted.
        let later = 2.0 + timers.hold_down + 1.0;
        let changes = table.apply_vector(&id("A"), cost(2), &offer, later, &timers);
        assert_eq!(changes.len(), 1);
        let to_d = table.entry(&id("D")).unwrap();
        assert_eq!(to_d.cost, path(4));
        assert_eq!(to_d.next_hop, Some(id("A")));
    }

    #[test]
    fn advertisement_poison_reverses_routes_through_target() {
        let mut table = table_for_b(0.0);
        // Route D via C.
        let vector: BTreeMap<_, _> = [(id("D"), path(1))].into();
        table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers());

        let advert = table.advertisement_for(&id("C"), 2.0);
        // C and D both route through C, so both are poisoned toward C.
        assert!(advert.vector[&id("C")].is_unreachable());
        assert!(advert.vector[&id("D")].is_unreachable());
        assert!(advert.poison_set.contains(&id("C")));
        assert!(advert.poison_set.contains(&id("D")));
        // The self-route and the route via A are advertised at cost.
        assert_eq!(advert.vector[&id("B")], PathCost::zero());
        assert_eq!(advert.vector[&id("A")], path(2));

        // Toward A only A's own route is poisoned.
        let advert = table.advertisement_for(&id("A"), 2.0);
        assert!(advert.vector[&id("A")].is_unreachable());
        assert_eq!(advert.vector[&id("D")], path(2));
        assert_eq!(advert.poison_set.len(), 1);
    }

    #[test]
    fn advertisement_withholds_held_down_and_garbage_destinations() {
        let mut table = table_for_b(0.0);
        let timers = timers();

        // Withdraw D so it is held down and pending collection.
        let withdraw: BTreeMap<_, _> = [(id("D"), PathCost::unreachable())].into();
        table.apply_vector(&id("D"), cost(3), &withdraw, 1.0, &timers);
        assert!(table.is_held_down(&id("D"), 1.0));

        let advert = table.advertisement_for(&id("A"), 2.0);
        assert!(!advert.vector.contains_key(&id("D")));

        // After hold-down expiry the (still INVALID) route is advertised
        // again at infinity, and the hold-down entry is pruned.
        let later = 1.0 + timers.hold_down + 1.0;
        let advert = table.advertisement_for(&id("A"), later);
        assert!(advert.vector[&id("D")].is_unreachable());
        assert!(!table.is_held_down(&id("D"), later));

        // Collect the route into GARBAGE; it disappears entirely.
        let collected_at = later + timers.garbage_collection + 1.0;
        let outcome = table.sweep(collected_at, &timers);
        assert!(outcome.collected.contains(&id("D")));
        let advert = table.advertisement_for(&id("A"), collected_at);
        assert!(!advert.vector.contains_key(&id("D")));
    }

    #[test]
    fn sweep_times_out_stale_routes_then_collects_them() {
        let timers = timers();
        let mut table = table_for_b(0.0);

        // Nothing expires early.
        let outcome = table.sweep(timers.route_timeout - 1.0, &timers);
        assert!(!outcome.changed());

        // All three neighbor routes expire after the timeout.
        let expiry = timers.route_timeout + 1.0;
        let outcome = table.sweep(expiry, &timers);
        assert_eq!(outcome.timed_out.len(), 3);
        let to_a = table.entry(&id("A")).unwrap();
        assert_eq!(to_a.status, RouteStatus::Invalid);
        assert!(to_a.cost.is_unreachable());
        assert!(table.is_held_down(&id("A"), expiry));

        // Still INVALID until the garbage deadline.
        let outcome = table.sweep(expiry + timers.garbage_collection - 1.0, &timers);
        assert!(outcome.collected.is_empty());

        let outcome = table.sweep(expiry + timers.garbage_collection + 1.0, &timers);
        assert_eq!(outcome.collected.len(), 3);
        assert_eq!(
            table.entry(&id("A")).unwrap().status,
            RouteStatus::Garbage
        );

        // The self-route never expires.
        let self_route = table.entry(&id("B")).unwrap();
        assert_eq!(self_route.status, RouteStatus::Valid);
        assert_eq!(self_route.cost, PathCost::zero());
    }

    #[test]
    fn refresh_from_neighbor_postpones_timeout() {
        let timers = timers();
        let mut table = table_for_b(0.0);

        // A keeps talking; an empty vector still refreshes A's row.
        let refresh_at = timers.route_timeout - 5.0;
        table.apply_vector(&id("A"), cost(2), &BTreeMap::new(), refresh_at, &timers);

        let outcome = table.sweep(timers.route_timeout + 1.0, &timers);
        assert!(!outcome.timed_out.contains(&id("A")));
        assert!(outcome.timed_out.contains(&id("C")));
    }

    #[test]
    fn fail_neighbor_invalidates_all_routes_through_it() {
        let mut table = table_for_b(0.0);
        let timers = timers();
        // Route D via C, so C carries two destinations.
        let vector: BTreeMap<_, _> = [(id("D"), path(1))].into();
        table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers);

        let changes = table.fail_neighbor(&id("C"), 2.0, &timers);
        let mut dests: Vec<String> = changes.iter().map(|c| c.dest.to_string()).collect();
        dests.sort();
        assert_eq!(dests, vec!["C", "D"]);
        assert!(table.entry(&id("C")).unwrap().cost.is_unreachable());
        assert!(table.is_held_down(&id("D"), 2.0));

        // Routes through other neighbors are untouched.
        assert_eq!(table.entry(&id("A")).unwrap().status, RouteStatus::Valid);
    }

    #[test]
    fn recover_neighbor_rewrites_only_the_direct_row() {
        let mut table = table_for_b(0.0);
        let timers = timers();
        table.fail_neighbor(&id("C"), 1.0, &timers);

        let change = table.recover_neighbor(&id("C"), cost(4), 20.0, &timers);
        assert_eq!(change.new_cost, path(4));
        let to_c = table.entry(&id("C")).unwrap();
        assert_eq!(to_c.status, RouteStatus::Valid);
        assert_eq!(to_c.next_hop, Some(id("C")));
        assert!((to_c.timeout_time - (20.0 + timers.route_timeout)).abs() < f64::EPSILON);
    }

    #[test]
    fn received_routes_to_self_are_ignored() {
        let mut table = table_for_b(0.0);
        let vector: BTreeMap<_, _> = [(id("B"), path(9))].into();
        let changes = table.apply_vector(&id("A"), cost(2), &vector, 1.0, &timers());
        assert!(changes.is_empty());
        assert_eq!(table.entry(&id("B")).unwrap().cost, PathCost::zero());
    }

    #[test]
    fn unknown_destination_is_learned_from_advertisement() {
        let mut table = table_for_b(0.0);
        let vector: BTreeMap<_, _> = [(id("E"), path(3))].into();
        let changes = table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers());
        assert_eq!(changes.len(), 1);
        let to_e = table.entry(&id("E")).unwrap();
        assert_eq!(to_e.cost, path(4));
        assert_eq!(to_e.next_hop, Some(id("C")));
        assert_eq!(to_e.status, RouteStatus::Valid);
    }

    #[test]
    fn cost_arithmetic_saturates_through_vectors() {
        let mut table = table_for_b(0.0);
        let vector: BTreeMap<_, _> = [(id("E"), path(14))].into();
        table.apply_vector(&id("C"), cost(1), &vector, 1.0, &timers());
        assert_eq!(table.entry(&id("E")).unwrap().cost, path(15));

        // 15 + 1 saturates to infinity; an unreachable sum is never adopted
        // as a better route.
        let vector: BTreeMap<_, _> = [(id("F"), path(15))].into();
        let changes = table.apply_vector(&id("C"), cost(1), &vector, 2.0, &timers());
        assert!(changes.is_empty());
        assert!(table.entry(&id("F")).unwrap().cost.is_unreachable());
    }
}
