//! Network coordinator
//!
//! Owns the topology, the routers, and the link store; wires every
//! component together and runs the background tasks: one task per router,
//! the message delivery task, the convergence monitor, and (when enabled)
//! the dynamics driver. Front-ends observe through pull-based snapshots
//! and the event stream, and steer through the control methods.

use crate::bus::{Message, MessageBus};
use crate::clock::SimClock;
use crate::config::EngineConfig;
use crate::convergence;
use crate::domain_types::{LinkCost, RouterId};
use crate::dynamics::{DynamicsDriver, FaultInjector};
use crate::error::EngineError;
use crate::events::{EventBus, EventStream, NetworkEvent};
use crate::link::{Link, LinkKey, LinkStore, LinkView};
use crate::random::shared_rng;
use crate::router::{Router, RouterInbound};
use crate::routing_table::{RouteRow, RoutingTable};
use crate::stats::{NetworkStats, StatsSnapshot};
use crate::topology::Topology;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Components handed to the background tasks exactly once, at start.
struct PendingTasks {
    routers: Vec<(Router, mpsc::Receiver<RouterInbound>)>,
    bus_rx: mpsc::Receiver<Message>,
}

/// The assembled simulation engine.
pub struct Network {
    config: EngineConfig,
    clock: SimClock,
    links: Arc<LinkStore>,
    stats: Arc<NetworkStats>,
    events: EventBus,
    router_ids: Vec<RouterId>,
    tables: BTreeMap<RouterId, Arc<RwLock<RoutingTable>>>,
    inboxes: Arc<BTreeMap<RouterId, mpsc::Sender<RouterInbound>>>,
    neighbors: Arc<BTreeMap<RouterId, Vec<(RouterId, LinkKey)>>>,
    injector: FaultInjector,
    pending: Mutex<Option<PendingTasks>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Network {
    /// Builds the engine from a validated topology.
    ///
    /// Routing tables are initialized over the full router set before any
    /// task runs, so snapshots are meaningful immediately.
    ///
    /// # Errors
    /// Returns [`EngineError::Configuration`] for an invalid configuration.
    pub fn new(topology: &Topology, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let rng = shared_rng(config.seed);
        let clock = SimClock::start();
        let stats = Arc::new(NetworkStats::default());
        let events = EventBus::new(config.event_capacity.as_usize());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let links = Arc::new(LinkStore::new(rng.clone()));
        for link in topology.links() {
            links.insert(
                link.key.clone(),
                Link::new(link.cost, link.delay, link.loss_rate),
            );
        }

        let router_ids = topology.router_ids();
        let neighbors = Arc::new(topology.neighbors());
        let (bus, bus_rx) = MessageBus::channel(config.bus_capacity.as_usize(), links.clone(), clock);

        let mut tables = BTreeMap::new();
        let mut inboxes = BTreeMap::new();
        let mut routers = Vec::new();
        let now = clock.now();
        for id in &router_ids {
            let adjacency = neighbors.get(id).cloned().unwrap_or_default();
            let mut table = RoutingTable::new(id.clone());
            let with_costs = Self::operational_neighbors(&links, &adjacency);
            table.initialize(&router_ids, &with_costs, now, &config.timers);
            let table = Arc::new(RwLock::new(table));
            tables.insert(id.clone(), table.clone());

            let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity.as_usize());
            inboxes.insert(id.clone(), inbox_tx);

            let router = Router::new(
                id.clone(),
                table,
                adjacency,
                links.clone(),
                bus.clone(),
                stats.clone(),
                events.clone(),
                rng.clone(),
                config.timers.clone(),
                clock,
            );
            routers.push((router, inbox_rx));
        }
        let inboxes = Arc::new(inboxes);

        let injector = FaultInjector::new(
            links.clone(),
            inboxes.clone(),
            neighbors.clone(),
            events.clone(),
            rng.clone(),
            config.timers.clone(),
            clock,
            shutdown_rx,
        );

        Ok(Self {
            config,
            clock,
            links,
            stats,
            events,
            router_ids,
            tables,
            inboxes,
            neighbors,
            injector,
            pending: Mutex::new(Some(PendingTasks { routers, bus_rx })),
            tasks: Mutex::new(Vec::new()),
            shutdown_tx,
        })
    }

    fn operational_neighbors(
        links: &LinkStore,
        adjacency: &[(RouterId, LinkKey)],
    ) -> Vec<(RouterId, LinkCost)> {
        adjacency
            .iter()
            .filter(|(_, key)| links.is_operational(key))
            .filter_map(|(neighbor, key)| links.cost_of(key).map(|cost| (neighbor.clone(), cost)))
            .collect()
    }

    /// Spawns every background task. Callable once.
    ///
    /// # Errors
    /// Returns [`EngineError::AlreadyStarted`] on a second call.
    pub fn start(&self) -> Result<(), EngineError> {
        let PendingTasks { routers, mut bus_rx } = self
            .pending
            .lock()
            .take()
            .ok_or(EngineError::AlreadyStarted)?;

        let mut tasks = Vec::new();
        for (router, inbox_rx) in routers {
            let shutdown = self.shutdown_tx.subscribe();
            tasks.push(tokio::spawn(router.run(inbox_rx, shutdown)));
        }

        // Message delivery: bus to destination inbox.
        let inboxes = self.inboxes.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    delivered = bus_rx.recv() => match delivered {
                        Some(message) => match inboxes.get(&message.destination) {
                            Some(inbox) => {
                                let _ = inbox.try_send(RouterInbound::Advert(message));
                            }
                            None => {
                                debug!(destination = %message.destination,
                                       "dropping message for unknown router");
                            }
                        },
                        None => break,
                    },
                }
            }
            debug!("message delivery stopped");
        }));

        tasks.push(tokio::spawn(convergence::run(
            self.stats.clone(),
            self.events.clone(),
            self.config.timers.clone(),
            self.clock,
            self.shutdown_tx.subscribe(),
        )));

        if self.config.dynamics_enabled {
            let driver = DynamicsDriver::new(self.injector.clone());
            tasks.push(tokio::spawn(driver.run(self.shutdown_tx.subscribe())));
        }

        info!(
            routers = self.router_ids.len(),
            dynamics = self.config.dynamics_enabled,
            "network started"
        );
        self.tasks.lock().extend(tasks);
        Ok(())
    }

    /// Identifiers of every router, in identifier order.
    #[must_use]
    pub fn router_ids(&self) -> &[RouterId] {
        &self.router_ids
    }

    /// Opens a subscription to the domain event stream.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Seconds of simulation time elapsed since construction.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Routing tables of every router, keyed by router then destination.
    pub async fn snapshot_tables(&self) -> BTreeMap<RouterId, BTreeMap<RouterId, RouteRow>> {
        let mut snapshot = BTreeMap::new();
        for (id, table) in &self.tables {
            snapshot.insert(id.clone(), table.read().await.rows());
        }
        snapshot
    }

    /// Current state of every link.
    #[must_use]
    pub fn snapshot_links(&self) -> Vec<LinkView> {
        self.links.snapshot()
    }

    /// Current statistics.
    #[must_use]
    pub fn snapshot_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Flips periodic advertisements on or off, returning the new setting.
    pub fn toggle_periodic_updates(&self) -> bool {
        let enabled = self.stats.toggle_periodic_updates();
        info!(enabled, "periodic updates toggled");
        self.events
            .publish(NetworkEvent::PeriodicUpdatesToggled { enabled });
        enabled
    }

    /// Reinitializes every routing table, forces every link UP, and resets
    /// the statistics, as if the engine had just been built.
    pub async fn restart(&self) {
        self.links.force_all_up();

        let now = self.clock.now();
        for (id, table) in &self.tables {
            let adjacency = self.neighbors.get(id).cloned().unwrap_or_default();
            let with_costs = Self::operational_neighbors(&self.links, &adjacency);
            table
                .write()
                .await
                .initialize(&self.router_ids, &with_costs, now, &self.config.timers);
        }
        self.stats.reset();

        info!("simulation restarted");
        self.events.publish(NetworkEvent::Restarted);
    }

    /// Takes the link between `a` and `b` DOWN, notifying both endpoints.
    /// The link stays DOWN until [`Self::recover_link`] or a restart.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownLink`] when no such link exists.
    pub fn fail_link(&self, a: &RouterId, b: &RouterId) -> Result<bool, EngineError> {
        let key = self.link_key(a, b)?;
        Ok(self.injector.fail_link(&key, false))
    }

    /// Brings the link between `a` and `b` back UP at its stored cost.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownLink`] when no such link exists.
    pub fn recover_link(&self, a: &RouterId, b: &RouterId) -> Result<bool, EngineError> {
        let key = self.link_key(a, b)?;
        Ok(self.injector.recover_link(&key))
    }

    /// Rewrites the cost of the UP link between `a` and `b`.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownLink`] when no such link exists.
    pub fn change_link_cost(
        &self,
        a: &RouterId,
        b: &RouterId,
        cost: LinkCost,
    ) -> Result<bool, EngineError> {
        let key = self.link_key(a, b)?;
        Ok(self.injector.change_cost(&key, cost))
    }

    /// Fails every UP link incident to `router`.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownRouter`] when no such router exists.
    pub fn fail_node(&self, router: &RouterId) -> Result<bool, EngineError> {
        if !self.neighbors.contains_key(router) {
            return Err(EngineError::UnknownRouter(router.to_string()));
        }
        Ok(self.injector.fail_node(router, false))
    }

    fn link_key(&self, a: &RouterId, b: &RouterId) -> Result<LinkKey, EngineError> {
        let key = LinkKey::new(a.clone(), b.clone());
        if self.links.get(&key).is_none() {
            return Err(EngineError::UnknownLink {
                router1: a.to_string(),
                router2: b.to_string(),
            });
        }
        Ok(key)
    }

    /// Stops every task and waits for them to exit. Pending scheduled
    /// recoveries observe the shutdown and become no-ops.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let tasks: Vec<JoinHandle<()>> = std::mem::take(&mut *self.tasks.lock());
        join_all(tasks).await;
        info!("network shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let network = Network::new(&Topology::default(), EngineConfig::deterministic(1)).unwrap();
        network.start().unwrap();
        assert!(matches!(network.start(), Err(EngineError::AlreadyStarted)));
        network.shutdown().await;
    }

    #[tokio::test]
    async fn fresh_tables_have_self_routes_and_neighbor_costs() {
        let network = Network::new(&Topology::default(), EngineConfig::deterministic(1)).unwrap();
        let tables = network.snapshot_tables().await;

        for id in network.router_ids() {
            let row = &tables[id][id];
            assert_eq!(row.cost.as_u8(), 0);
            assert_eq!(row.next_hop.as_ref(), Some(id));
        }

        let a = RouterId::try_new("A".to_string()).unwrap();
        let b = RouterId::try_new("B".to_string()).unwrap();
        assert_eq!(tables[&a][&b].cost.as_u8(), 2);
    }

    #[tokio::test]
    async fn unknown_link_and_router_are_reported() {
        let network = Network::new(&Topology::default(), EngineConfig::deterministic(1)).unwrap();
        let a = RouterId::try_new("A".to_string()).unwrap();
        let d = RouterId::try_new("D".to_string()).unwrap();
        let z = RouterId::try_new("Z".to_string()).unwrap();

        assert!(matches!(
            network.fail_link(&a, &d),
            Err(EngineError::UnknownLink { .. })
        ));
        assert!(matches!(
            network.fail_node(&z),
            Err(EngineError::UnknownRouter(_))
        ));
    }
}
