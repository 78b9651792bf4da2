//! # ripsim - distance-vector routing simulator
//!
//! ripsim simulates a RIP-style distance-vector routing protocol over a
//! configurable topology, reproducing the dynamics that make such protocols
//! interesting: periodic and triggered advertisements, split horizon with
//! poison reverse, route expiration and garbage collection, hold-down, and
//! reconvergence after link failures, recoveries, cost changes, and whole
//! node outages.
//!
//! The engine is a set of cooperative tokio tasks: one per router, one
//! delivering in-flight messages, one injecting randomized faults, and one
//! watching for convergence. Front-ends never touch engine internals; they
//! observe through pull-based snapshots and a bounded event stream.
//!
//! ```rust,no_run
//! use ripsim::{EngineConfig, Network, Topology};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let network = Network::new(&Topology::default(), EngineConfig::default())?;
//!     network.start()?;
//!
//!     let mut events = network.subscribe();
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!
//!     network.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod clock;
pub mod config;
pub mod convergence;
pub mod domain_types;
pub mod dynamics;
pub mod error;
pub mod events;
pub mod link;
pub mod network;
pub mod random;
pub mod router;
pub mod routing_table;
pub mod stats;
pub mod topology;

pub use bus::{Message, MessageKind};
pub use config::{EngineConfig, ProtocolTimers};
pub use domain_types::{
    ChannelCapacity, LinkCost, LossRate, MessageId, PathCost, PropagationDelay, RouterId,
    INFINITY_COST,
};
pub use error::{EngineError, TopologyError};
pub use events::{EventBus, EventStream, NetworkEvent};
pub use link::{LinkKey, LinkStatus, LinkView};
pub use network::Network;
pub use routing_table::{Advertisement, RouteEntry, RouteRow, RouteStatus, RoutingTable};
pub use stats::{ConvergenceState, NetworkStats, StatsSnapshot};
pub use topology::Topology;
