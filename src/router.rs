//! Per-router engine task
//!
//! Each router runs one cooperative task that interleaves three activities:
//! draining its inbox (advertisements plus link up/down notifications from
//! the coordinator), firing periodic advertisements, and sweeping route
//! timers. All routing-table mutation happens inside this task, so
//! per-router processing is strictly serial.

use crate::bus::{Message, MessageBus, MessageKind};
use crate::clock::SimClock;
use crate::config::ProtocolTimers;
use crate::domain_types::{LinkCost, MessageId, RouterId};
use crate::events::{EventBus, NetworkEvent};
use crate::link::{LinkKey, LinkStore};
use crate::random::SharedRng;
use crate::routing_table::{RouteChange, RoutingTable};
use crate::stats::NetworkStats;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Everything a router can find in its inbox.
#[derive(Debug)]
pub(crate) enum RouterInbound {
    /// An advertisement delivered by the message bus.
    Advert(Message),
    /// The coordinator reports the link to `neighbor` went DOWN.
    LinkFailed { neighbor: RouterId },
    /// The coordinator reports the link to `neighbor` is UP at `cost`.
    /// Also used for cost changes on a live link.
    LinkRecovered { neighbor: RouterId, cost: LinkCost },
}

/// State of one router task.
pub(crate) struct Router {
    id: RouterId,
    table: Arc<RwLock<RoutingTable>>,
    neighbors: Vec<(RouterId, LinkKey)>,
    links: Arc<LinkStore>,
    bus: MessageBus,
    stats: Arc<NetworkStats>,
    events: EventBus,
    rng: SharedRng,
    timers: ProtocolTimers,
    clock: SimClock,
    last_periodic_update: f64,
    last_triggered_update: f64,
    periodic_interval: f64,
}

impl Router {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: RouterId,
        table: Arc<RwLock<RoutingTable>>,
        neighbors: Vec<(RouterId, LinkKey)>,
        links: Arc<LinkStore>,
        bus: MessageBus,
        stats: Arc<NetworkStats>,
        events: EventBus,
        rng: SharedRng,
        timers: ProtocolTimers,
        clock: SimClock,
    ) -> Self {
        let periodic_interval = draw_periodic_interval(&rng, &timers);
        Self {
            id,
            table,
            neighbors,
            links,
            bus,
            stats,
            events,
            rng,
            timers,
            clock,
            last_periodic_update: 0.0,
            last_triggered_update: 0.0,
            periodic_interval,
        }
    }

    /// Runs the router loop until shutdown.
    pub(crate) async fn run(
        mut self,
        mut inbox: mpsc::Receiver<RouterInbound>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let (lo, hi) = self.timers.startup_jitter;
        let jitter = { self.rng.lock().gen_range(lo..=hi) };
        debug!(router = %self.id, jitter, "router starting");
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs_f64(jitter)) => {}
            _ = shutdown.changed() => return,
        }

        let mut sweep = tokio::time::interval(Duration::from_secs_f64(self.timers.sweep_interval));
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                inbound = inbox.recv() => match inbound {
                    Some(inbound) => self.on_inbound(inbound).await,
                    None => break,
                },
                _ = sweep.tick() => self.on_tick().await,
            }
        }
        debug!(router = %self.id, "router stopped");
    }

    async fn on_inbound(&mut self, inbound: RouterInbound) {
        match inbound {
            RouterInbound::Advert(message) => self.process_advert(message).await,
            RouterInbound::LinkFailed { neighbor } => self.on_link_failed(&neighbor).await,
            RouterInbound::LinkRecovered { neighbor, cost } => {
                self.on_link_recovered(&neighbor, cost).await;
            }
        }
    }

    /// Applies a received advertisement and fires a triggered update when it
    /// changed the table.
    async fn process_advert(&mut self, message: Message) {
        let key = LinkKey::new(self.id.clone(), message.source.clone());
        // A message can cross a link that failed after it was sent.
        if !self.links.is_operational(&key) {
            debug!(router = %self.id, source = %message.source,
                   "dropping advertisement received over DOWN link");
            return;
        }
        let Some(link_cost) = self.links.cost_of(&key) else {
            return;
        };

        let now = self.clock.now();
        let changes = {
            let mut table = self.table.write().await;
            table.apply_vector(&message.source, link_cost, &message.vector, now, &self.timers)
        };
        if changes.is_empty() {
            return;
        }
        self.stats.record_route_changes(changes.len() as u64, now);
        self.publish_route_changes(&changes);
        self.send_triggered().await;
    }

    /// Periodic advertisement check plus the route timer sweep.
    async fn on_tick(&mut self) {
        let now = self.clock.now();

        if self.stats.periodic_updates_enabled()
            && now - self.last_periodic_update >= self.periodic_interval
        {
            self.advertise_to_all(MessageKind::Regular).await;
            self.last_periodic_update = now;
            self.periodic_interval = draw_periodic_interval(&self.rng, &self.timers);
        }

        let outcome = {
            let mut table = self.table.write().await;
            table.sweep(now, &self.timers)
        };
        if !outcome.changed() {
            return;
        }
        for dest in &outcome.timed_out {
            warn!(router = %self.id, dest = %dest, "route timed out");
            self.events.publish(NetworkEvent::RouteTimedOut {
                router: self.id.clone(),
                dest: dest.clone(),
            });
        }
        for dest in &outcome.collected {
            debug!(router = %self.id, dest = %dest, "route garbage-collected");
        }
        self.stats.record_route_activity(now);
        self.send_triggered().await;
    }

    async fn on_link_failed(&mut self, neighbor: &RouterId) {
        let now = self.clock.now();
        let changes = {
            let mut table = self.table.write().await;
            table.fail_neighbor(neighbor, now, &self.timers)
        };
        if changes.is_empty() {
            return;
        }
        warn!(router = %self.id, neighbor = %neighbor, routes = changes.len(),
              "link failed, routes invalidated");
        self.stats.record_route_activity(now);
        self.publish_route_changes(&changes);
        self.send_triggered().await;
    }

    async fn on_link_recovered(&mut self, neighbor: &RouterId, cost: LinkCost) {
        let now = self.clock.now();
        let change = {
            let mut table = self.table.write().await;
            table.recover_neighbor(neighbor, cost, now, &self.timers)
        };
        info!(router = %self.id, neighbor = %neighbor, cost = %cost, "direct route rewritten");
        self.stats.record_route_activity(now);
        self.publish_route_changes(std::slice::from_ref(&change));
        self.send_triggered().await;
    }

    fn publish_route_changes(&self, changes: &[RouteChange]) {
        for change in changes {
            info!(router = %self.id, dest = %change.dest,
                  old_cost = %change.old_cost, new_cost = %change.new_cost,
                  "route changed");
            self.events.publish(NetworkEvent::RouteChanged {
                router: self.id.clone(),
                dest: change.dest.clone(),
                old_cost: change.old_cost,
                new_cost: change.new_cost,
                next_hop: change.next_hop.clone(),
            });
        }
    }

    /// Sends a rate-limited triggered update to every operational neighbor.
    async fn send_triggered(&mut self) {
        let now = self.clock.now();
        if now - self.last_triggered_update < self.timers.min_triggered_interval {
            return;
        }
        self.advertise_to_all(MessageKind::Triggered).await;
        self.last_triggered_update = now;
    }

    async fn advertise_to_all(&mut self, kind: MessageKind) {
        let neighbors = self.neighbors.clone();
        for (neighbor, key) in neighbors {
            if !self.links.is_operational(&key) {
                continue;
            }
            self.send_to(&neighbor, kind).await;
        }
    }

    async fn send_to(&mut self, neighbor: &RouterId, kind: MessageKind) {
        let now = self.clock.now();
        let advert = {
            let mut table = self.table.write().await;
            table.advertisement_for(neighbor, now)
        };
        let poisoned = advert.is_poisoned();
        let kind = if poisoned {
            MessageKind::PoisonReverse
        } else {
            kind
        };

        let message = Message {
            id: MessageId::generate(),
            source: self.id.clone(),
            destination: neighbor.clone(),
            vector: advert.vector,
            poison_set: advert.poison_set.clone(),
            sent_at: now,
            kind,
        };
        if !self.bus.send(message) {
            return;
        }

        self.stats.record_message(poisoned);
        self.events.publish(NetworkEvent::MessageSent {
            source: self.id.clone(),
            destination: neighbor.clone(),
            kind,
        });
        if poisoned {
            self.events.publish(NetworkEvent::PoisonReverseSent {
                source: self.id.clone(),
                destination: neighbor.clone(),
                poisoned: advert.poison_set.into_iter().collect(),
            });
        }
    }
}

/// Draws the next periodic interval with uniform jitter around the base.
fn draw_periodic_interval(rng: &SharedRng, timers: &ProtocolTimers) -> f64 {
    let jitter = rng
        .lock()
        .gen_range(-timers.periodic_jitter..=timers.periodic_jitter);
    timers.periodic_update * (1.0 + jitter)
}
