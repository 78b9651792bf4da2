//! Fault injection and network dynamics
//!
//! The [`FaultInjector`] is the single writer of link state: it flips links
//! DOWN and UP, rewrites costs, and notifies the affected routers through
//! their inboxes. The [`DynamicsDriver`] task drives it with randomized
//! faults drawn from the shared random stream; scenario tests and control
//! surfaces drive it directly.

use crate::clock::SimClock;
use crate::config::ProtocolTimers;
use crate::domain_types::{LinkCost, RouterId};
use crate::events::{EventBus, NetworkEvent};
use crate::link::{LinkKey, LinkStatus, LinkStore};
use crate::random::SharedRng;
use crate::router::RouterInbound;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Relative weights of the three fault kinds: link failure, cost change,
/// node failure.
const FAULT_WEIGHTS: [f64; 3] = [0.4, 0.5, 0.1];

/// Coordinator-side handle that mutates link state and notifies endpoints.
#[derive(Clone)]
pub(crate) struct FaultInjector {
    links: Arc<LinkStore>,
    inboxes: Arc<BTreeMap<RouterId, mpsc::Sender<RouterInbound>>>,
    neighbors: Arc<BTreeMap<RouterId, Vec<(RouterId, LinkKey)>>>,
    events: EventBus,
    rng: SharedRng,
    timers: ProtocolTimers,
    clock: SimClock,
    shutdown: watch::Receiver<bool>,
}

impl FaultInjector {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        links: Arc<LinkStore>,
        inboxes: Arc<BTreeMap<RouterId, mpsc::Sender<RouterInbound>>>,
        neighbors: Arc<BTreeMap<RouterId, Vec<(RouterId, LinkKey)>>>,
        events: EventBus,
        rng: SharedRng,
        timers: ProtocolTimers,
        clock: SimClock,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            links,
            inboxes,
            neighbors,
            events,
            rng,
            timers,
            clock,
            shutdown,
        }
    }

    fn notify(&self, router: &RouterId, inbound: RouterInbound) {
        let Some(inbox) = self.inboxes.get(router) else {
            return;
        };
        if inbox.try_send(inbound).is_err() {
            warn!(router = %router, "router inbox full, link notification dropped");
        }
    }

    /// Flips an UP link to DOWN and tells both endpoints. With
    /// `auto_recover` a recovery fires after the configured random delay.
    ///
    /// Returns false when the link is unknown or already DOWN.
    pub(crate) fn fail_link(&self, key: &LinkKey, auto_recover: bool) -> bool {
        let now = self.clock.now();
        match self.links.set_status(key, LinkStatus::Down, now) {
            Some(LinkStatus::Up) => {}
            _ => return false,
        }
        warn!(link = %key, "link failure");
        self.events.publish(NetworkEvent::LinkDown { link: key.clone() });
        self.notify(
            key.first(),
            RouterInbound::LinkFailed {
                neighbor: key.second().clone(),
            },
        );
        self.notify(
            key.second(),
            RouterInbound::LinkFailed {
                neighbor: key.first().clone(),
            },
        );
        if auto_recover {
            self.schedule_recovery(key.clone());
        }
        true
    }

    fn schedule_recovery(&self, key: LinkKey) {
        let (lo, hi) = self.timers.recovery_delay;
        let delay = { self.rng.lock().gen_range(lo..=hi) };
        debug!(link = %key, delay, "recovery scheduled");
        let injector = self.clone();
        tokio::spawn(async move {
            let mut shutdown = injector.shutdown.clone();
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs_f64(delay)) => {}
                _ = shutdown.changed() => return,
            }
            if *shutdown.borrow() {
                return;
            }
            injector.recover_link(&key);
        });
    }

    /// Brings a DOWN link back UP at its stored cost and tells both
    /// endpoints. A link that is already UP again (for instance after a
    /// restart) is left alone.
    pub(crate) fn recover_link(&self, key: &LinkKey) -> bool {
        let now = self.clock.now();
        let Some(link) = self.links.get(key) else {
            return false;
        };
        if link.is_operational() {
            return false;
        }
        self.links.set_status(key, LinkStatus::Up, now);
        info!(link = %key, cost = %link.cost, "link recovery");
        self.events.publish(NetworkEvent::LinkUp {
            link: key.clone(),
            cost: link.cost,
        });
        self.notify(
            key.first(),
            RouterInbound::LinkRecovered {
                neighbor: key.second().clone(),
                cost: link.cost,
            },
        );
        self.notify(
            key.second(),
            RouterInbound::LinkRecovered {
                neighbor: key.first().clone(),
                cost: link.cost,
            },
        );
        true
    }

    /// Rewrites the cost of an UP link and tells both endpoints. Drawing
    /// the current cost again is a no-op.
    pub(crate) fn change_cost(&self, key: &LinkKey, new_cost: LinkCost) -> bool {
        let Some(link) = self.links.get(key) else {
            return false;
        };
        if !link.is_operational() || link.cost == new_cost {
            return false;
        }
        self.links.set_cost(key, new_cost);
        info!(link = %key, old_cost = %link.cost, new_cost = %new_cost, "cost change");
        self.events.publish(NetworkEvent::CostChange {
            link: key.clone(),
            old_cost: link.cost,
            new_cost,
        });
        self.notify(
            key.first(),
            RouterInbound::LinkRecovered {
                neighbor: key.second().clone(),
                cost: new_cost,
            },
        );
        self.notify(
            key.second(),
            RouterInbound::LinkRecovered {
                neighbor: key.first().clone(),
                cost: new_cost,
            },
        );
        true
    }

    /// Takes a whole node offline by failing every UP link incident to it.
    /// Each failed link schedules its own independent recovery when
    /// `auto_recover` is set.
    pub(crate) fn fail_node(&self, router: &RouterId, auto_recover: bool) -> bool {
        let Some(incident) = self.neighbors.get(router) else {
            return false;
        };
        if incident.is_empty() {
            return false;
        }
        warn!(router = %router, "node failure");
        self.events.publish(NetworkEvent::NodeDown {
            router: router.clone(),
        });
        let mut any = false;
        for (_, key) in incident {
            if self.links.is_operational(key) {
                any |= self.fail_link(key, auto_recover);
            }
        }
        any
    }
}

/// Background task injecting randomized faults.
pub(crate) struct DynamicsDriver {
    injector: FaultInjector,
    fault_kind: WeightedIndex<f64>,
}

impl DynamicsDriver {
    pub(crate) fn new(injector: FaultInjector) -> Self {
        let fault_kind =
            WeightedIndex::new(FAULT_WEIGHTS).expect("static fault weights are valid");
        Self {
            injector,
            fault_kind,
        }
    }

    /// Runs the fault loop until shutdown: an initial grace period, then a
    /// randomized pause and one weighted-random fault per iteration.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let grace = Duration::from_secs_f64(self.injector.timers.dynamics_grace);
        tokio::select! {
            () = tokio::time::sleep(grace) => {}
            _ = shutdown.changed() => return,
        }
        info!("dynamics driver active");

        loop {
            let (lo, hi) = self.injector.timers.fault_interval;
            let pause = { self.injector.rng.lock().gen_range(lo..=hi) };
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs_f64(pause)) => {}
                _ = shutdown.changed() => break,
            }
            if *shutdown.borrow() {
                break;
            }
            self.inject_one_fault();
        }
        debug!("dynamics driver stopped");
    }

    fn inject_one_fault(&self) {
        let choice = {
            let mut rng = self.injector.rng.lock();
            self.fault_kind.sample(&mut *rng)
        };
        match choice {
            0 => self.random_link_failure(),
            1 => self.random_cost_change(),
            _ => self.random_node_failure(),
        }
    }

    fn random_link_failure(&self) {
        let Some(key) = self.pick_up_link() else {
            return;
        };
        self.injector.fail_link(&key, true);
    }

    fn random_cost_change(&self) {
        let Some(key) = self.pick_up_link() else {
            return;
        };
        let raw = { self.injector.rng.lock().gen_range(1..=10u8) };
        let new_cost = LinkCost::try_new(raw).expect("drawn cost is within range");
        self.injector.change_cost(&key, new_cost);
    }

    fn random_node_failure(&self) {
        let candidates: Vec<&RouterId> = self
            .injector
            .neighbors
            .iter()
            .filter(|(_, incident)| !incident.is_empty())
            .map(|(router, _)| router)
            .collect();
        if candidates.is_empty() {
            return;
        }
        let index = { self.injector.rng.lock().gen_range(0..candidates.len()) };
        let router = candidates[index].clone();
        self.injector.fail_node(&router, true);
    }

    fn pick_up_link(&self) -> Option<LinkKey> {
        let keys = self.injector.links.up_links();
        if keys.is_empty() {
            return None;
        }
        let index = { self.injector.rng.lock().gen_range(0..keys.len()) };
        Some(keys[index].clone())
    }
}
