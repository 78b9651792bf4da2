//! Link fabric
//!
//! Links are pure state: operational status, cost, propagation delay, and a
//! stochastic loss rate. They are owned by a coordinator-side store indexed
//! by the unordered endpoint pair; routers hold shared read access while all
//! mutation goes through the coordinator and the dynamics driver.

use crate::domain_types::{LinkCost, LossRate, PropagationDelay, RouterId};
use crate::random::SharedRng;
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;
use std::fmt;

/// Operational status of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkStatus {
    Up,
    Down,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

/// Canonical identifier of an undirected link: endpoints in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LinkKey {
    first: RouterId,
    second: RouterId,
}

impl LinkKey {
    /// Builds the canonical key for a pair of endpoints.
    #[must_use]
    pub fn new(a: RouterId, b: RouterId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    /// Lower endpoint in identifier order.
    #[must_use]
    pub fn first(&self) -> &RouterId {
        &self.first
    }

    /// Higher endpoint in identifier order.
    #[must_use]
    pub fn second(&self) -> &RouterId {
        &self.second
    }

    /// The endpoint opposite `router`, if `router` is an endpoint at all.
    #[must_use]
    pub fn peer_of(&self, router: &RouterId) -> Option<&RouterId> {
        if *router == self.first {
            Some(&self.second)
        } else if *router == self.second {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.first, self.second)
    }
}

/// State of a single undirected link.
#[derive(Debug, Clone)]
pub struct Link {
    pub cost: LinkCost,
    pub delay: PropagationDelay,
    pub loss_rate: LossRate,
    pub status: LinkStatus,
    pub last_failure_time: f64,
}

impl Link {
    /// Creates an UP link with the given attributes.
    #[must_use]
    pub fn new(cost: LinkCost, delay: PropagationDelay, loss_rate: LossRate) -> Self {
        Self {
            cost,
            delay,
            loss_rate,
            status: LinkStatus::Up,
            last_failure_time: 0.0,
        }
    }

    /// True when the link carries traffic.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.status == LinkStatus::Up
    }
}

/// Read-only view of a link for snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub router1: RouterId,
    pub router2: RouterId,
    pub cost: LinkCost,
    pub delay: PropagationDelay,
    pub loss_rate: LossRate,
    pub status: LinkStatus,
    pub last_failure_time: f64,
}

/// Coordinator-owned store of every link, keyed by canonical endpoint pair.
///
/// Routers share the store for reads; status and cost writes happen only on
/// the coordinator side (fault injection, recovery, restart).
#[derive(Debug)]
pub struct LinkStore {
    links: DashMap<LinkKey, Link>,
    rng: SharedRng,
}

impl LinkStore {
    /// Creates an empty store drawing loss decisions from `rng`.
    #[must_use]
    pub fn new(rng: SharedRng) -> Self {
        Self {
            links: DashMap::new(),
            rng,
        }
    }

    /// Inserts a link. Returns false when the key was already present.
    pub fn insert(&self, key: LinkKey, link: Link) -> bool {
        self.links.insert(key, link).is_none()
    }

    /// Copies out the link state for `key`.
    #[must_use]
    pub fn get(&self, key: &LinkKey) -> Option<Link> {
        self.links.get(key).map(|entry| entry.value().clone())
    }

    /// True when the link exists and is UP.
    #[must_use]
    pub fn is_operational(&self, key: &LinkKey) -> bool {
        self.links
            .get(key)
            .map(|entry| entry.is_operational())
            .unwrap_or(false)
    }

    /// Current cost of the link, if it exists.
    #[must_use]
    pub fn cost_of(&self, key: &LinkKey) -> Option<LinkCost> {
        self.links.get(key).map(|entry| entry.cost)
    }

    /// Bernoulli loss draw against the link's loss rate.
    ///
    /// Each invocation is an independent draw from the shared random stream.
    #[must_use]
    pub fn should_drop(&self, key: &LinkKey) -> bool {
        let Some(rate) = self.links.get(key).map(|entry| entry.loss_rate) else {
            return true;
        };
        if rate.as_f64() <= 0.0 {
            return false;
        }
        if rate.as_f64() >= 1.0 {
            return true;
        }
        self.rng.lock().gen_bool(rate.as_f64())
    }

    /// Sets the operational status, recording `now` as the failure time on a
    /// transition to DOWN. Returns the previous status.
    pub fn set_status(&self, key: &LinkKey, status: LinkStatus, now: f64) -> Option<LinkStatus> {
        let mut entry = self.links.get_mut(key)?;
        let previous = entry.status;
        entry.status = status;
        if status == LinkStatus::Down && previous == LinkStatus::Up {
            entry.last_failure_time = now;
        }
        Some(previous)
    }

    /// Rewrites the link cost, returning the previous cost.
    pub fn set_cost(&self, key: &LinkKey, cost: LinkCost) -> Option<LinkCost> {
        let mut entry = self.links.get_mut(key)?;
        let previous = entry.cost;
        entry.cost = cost;
        Some(previous)
    }

    /// Forces every link UP. Used by `restart`.
    pub fn force_all_up(&self) {
        for mut entry in self.links.iter_mut() {
            entry.status = LinkStatus::Up;
        }
    }

    /// Canonical keys of all currently UP links, in deterministic order.
    #[must_use]
    pub fn up_links(&self) -> Vec<LinkKey> {
        let mut keys: Vec<LinkKey> = self
            .links
            .iter()
            .filter(|entry| entry.is_operational())
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    /// Snapshot of every link, sorted by canonical key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LinkView> {
        let mut views: Vec<LinkView> = self
            .links
            .iter()
            .map(|entry| LinkView {
                router1: entry.key().first().clone(),
                router2: entry.key().second().clone(),
                cost: entry.cost,
                delay: entry.delay,
                loss_rate: entry.loss_rate,
                status: entry.status,
                last_failure_time: entry.last_failure_time,
            })
            .collect();
        views.sort_by(|a, b| (&a.router1, &a.router2).cmp(&(&b.router1, &b.router2)));
        views
    }
}
