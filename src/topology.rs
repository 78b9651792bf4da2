//! Topology description loading
//!
//! Topologies are JSON documents listing undirected links:
//!
//! ```json
//! { "links": [ { "router1": "A", "router2": "B", "cost": 2,
//!               "delay": 0.01, "loss_rate": 0.0 } ] }
//! ```
//!
//! Unknown keys are ignored; `delay` and `loss_rate` are optional. The
//! router set is the union of referenced endpoints. Validation is fatal:
//! duplicate edges, self-loops, bad costs, and malformed attributes abort
//! startup with a descriptive error.

use crate::domain_types::{LinkCost, LossRate, PropagationDelay, RouterId};
use crate::error::TopologyError;
use crate::link::LinkKey;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// One validated undirected link of the topology.
#[derive(Debug, Clone)]
pub struct TopologyLink {
    pub key: LinkKey,
    pub cost: LinkCost,
    pub delay: PropagationDelay,
    pub loss_rate: LossRate,
}

/// A validated network topology.
#[derive(Debug, Clone)]
pub struct Topology {
    links: Vec<TopologyLink>,
}

#[derive(Debug, Deserialize)]
struct TopologyFile {
    links: Vec<LinkSpec>,
}

#[derive(Debug, Deserialize)]
struct LinkSpec {
    router1: String,
    router2: String,
    cost: i64,
    #[serde(default)]
    delay: Option<f64>,
    #[serde(default)]
    loss_rate: Option<f64>,
}

impl Topology {
    /// Loads and validates a topology from a JSON file.
    ///
    /// # Errors
    /// Returns a [`TopologyError`] describing the first problem found.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses and validates a topology from a JSON string.
    ///
    /// # Errors
    /// Returns a [`TopologyError`] describing the first problem found.
    pub fn from_json_str(raw: &str) -> Result<Self, TopologyError> {
        let file: TopologyFile = serde_json::from_str(raw)?;
        Self::from_specs(file.links)
    }

    fn from_specs(specs: Vec<LinkSpec>) -> Result<Self, TopologyError> {
        if specs.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut seen = BTreeSet::new();
        let mut links = Vec::with_capacity(specs.len());
        for spec in specs {
            if spec.router1.is_empty() || spec.router2.is_empty() {
                return Err(TopologyError::MissingEndpoint {
                    router1: spec.router1,
                    router2: spec.router2,
                });
            }
            if spec.router1 == spec.router2 {
                return Err(TopologyError::SelfLoop {
                    router: spec.router1,
                });
            }

            let router1 = parse_router_id(&spec.router1)?;
            let router2 = parse_router_id(&spec.router2)?;

            let cost = u8::try_from(spec.cost)
                .ok()
                .and_then(|value| LinkCost::try_new(value).ok())
                .ok_or_else(|| TopologyError::InvalidCost {
                    router1: spec.router1.clone(),
                    router2: spec.router2.clone(),
                    cost: spec.cost,
                    reason: "cost must be an integer in [1, 15]".to_string(),
                })?;

            let delay = match spec.delay {
                None => PropagationDelay::default(),
                Some(value) => PropagationDelay::try_new(value).map_err(|_| {
                    TopologyError::InvalidAttribute {
                        router1: spec.router1.clone(),
                        router2: spec.router2.clone(),
                        attribute: "delay",
                        value,
                        reason: "delay must be a finite number of seconds >= 0".to_string(),
                    }
                })?,
            };
            let loss_rate = match spec.loss_rate {
                None => LossRate::default(),
                Some(value) => {
                    LossRate::try_new(value).map_err(|_| TopologyError::InvalidAttribute {
                        router1: spec.router1.clone(),
                        router2: spec.router2.clone(),
                        attribute: "loss_rate",
                        value,
                        reason: "loss_rate must be a finite number in [0, 1]".to_string(),
                    })?
                }
            };

            let key = LinkKey::new(router1, router2);
            if !seen.insert(key.clone()) {
                return Err(TopologyError::DuplicateLink {
                    router1: spec.router1,
                    router2: spec.router2,
                });
            }
            links.push(TopologyLink {
                key,
                cost,
                delay,
                loss_rate,
            });
        }

        Ok(Self { links })
    }

    /// The validated links.
    #[must_use]
    pub fn links(&self) -> &[TopologyLink] {
        &self.links
    }

    /// The router set, in identifier order.
    #[must_use]
    pub fn router_ids(&self) -> Vec<RouterId> {
        let mut ids = BTreeSet::new();
        for link in &self.links {
            ids.insert(link.key.first().clone());
            ids.insert(link.key.second().clone());
        }
        ids.into_iter().collect()
    }

    /// Neighbor map: router to its adjacent routers with link keys.
    #[must_use]
    pub fn neighbors(&self) -> BTreeMap<RouterId, Vec<(RouterId, LinkKey)>> {
        let mut map: BTreeMap<RouterId, Vec<(RouterId, LinkKey)>> = BTreeMap::new();
        for id in self.router_ids() {
            map.entry(id).or_default();
        }
        for link in &self.links {
            let a = link.key.first().clone();
            let b = link.key.second().clone();
            map.entry(a.clone())
                .or_default()
                .push((b.clone(), link.key.clone()));
            map.entry(b).or_default().push((a, link.key.clone()));
        }
        for neighbors in map.values_mut() {
            neighbors.sort_by(|x, y| x.0.cmp(&y.0));
        }
        map
    }
}

impl Default for Topology {
    /// The built-in demonstration topology: four routers A through D with
    /// five links of costs 2, 5, 1, 3, and 2.
    fn default() -> Self {
        let specs = [
            ("A", "B", 2),
            ("A", "C", 5),
            ("B", "C", 1),
            ("B", "D", 3),
            ("C", "D", 2),
        ];
        let links = specs
            .into_iter()
            .map(|(a, b, cost)| LinkSpec {
                router1: a.to_string(),
                router2: b.to_string(),
                cost,
                delay: None,
                loss_rate: None,
            })
            .collect();
        Self::from_specs(links).expect("built-in topology is valid")
    }
}

fn parse_router_id(label: &str) -> Result<RouterId, TopologyError> {
    RouterId::try_new(label.to_string()).map_err(|err| TopologyError::InvalidRouterId {
        label: label.to_string(),
        reason: err.to_string(),
    })
}
