//! Domain types for the routing simulator
//!
//! This module defines strongly-typed domain values to prevent primitive
//! obsession and keep validation at the edges of the system.

use nutype::nutype;
use std::fmt;
use uuid::Uuid;

/// Cost value conventionally treated as unreachable.
pub const INFINITY_COST: u8 = 16;

/// Identifier of a router, a short opaque label such as `"A"` or `"edge-3"`.
///
/// Ordering is derived so that router collections iterate deterministically.
#[nutype(
    validate(not_empty, len_char_max = 32),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        TryFrom,
        Into
    )
)]
pub struct RouterId(String);

/// Cost attributed to a single link.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 15),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        Hash,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        TryFrom,
        Into
    )
)]
pub struct LinkCost(u8);

impl LinkCost {
    /// Gets the value as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.into_inner()
    }
}

/// End-to-end cost of a route, saturating at [`INFINITY_COST`].
#[nutype(
    validate(less_or_equal = 16),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Default,
        TryFrom,
        Into
    ),
    default = 16
)]
pub struct PathCost(u8);

impl PathCost {
    /// The zero cost of a router's route to itself.
    ///
    /// # Panics
    /// Never panics; zero is always within the valid range.
    #[must_use]
    pub fn zero() -> Self {
        Self::try_new(0).unwrap()
    }

    /// The unreachable cost.
    #[must_use]
    pub fn unreachable() -> Self {
        Self::default()
    }

    /// Promotes a link cost to a path cost.
    ///
    /// # Panics
    /// Never panics; link costs are below the unreachable bound.
    #[must_use]
    pub fn from_link(cost: LinkCost) -> Self {
        Self::try_new(cost.as_u8()).unwrap()
    }

    /// True when this cost means the destination cannot be reached.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        self.into_inner() == INFINITY_COST
    }

    /// Adds a link cost, saturating at the unreachable bound.
    #[must_use]
    pub fn saturating_add(self, link: LinkCost) -> Self {
        if self.is_unreachable() {
            return Self::unreachable();
        }
        let sum = self.into_inner().saturating_add(link.as_u8());
        Self::try_new(sum.min(INFINITY_COST)).unwrap_or_else(|_| Self::unreachable())
    }

    /// Gets the value as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.into_inner()
    }
}

impl fmt::Display for PathCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unreachable() {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.into_inner())
        }
    }
}

/// One-way propagation delay of a link, in seconds.
#[nutype(
    validate(finite, greater_or_equal = 0.0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        PartialOrd,
        Serialize,
        Deserialize,
        Display,
        Default,
        TryFrom,
        Into
    ),
    default = 0.01
)]
pub struct PropagationDelay(f64);

impl PropagationDelay {
    /// Gets the delay in seconds.
    #[must_use]
    pub fn as_secs_f64(&self) -> f64 {
        self.into_inner()
    }
}

/// Probability that a link drops a given packet.
#[nutype(
    validate(finite, greater_or_equal = 0.0, less_or_equal = 1.0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        PartialOrd,
        Serialize,
        Deserialize,
        Display,
        Default,
        TryFrom,
        Into
    ),
    default = 0.0
)]
pub struct LossRate(f64);

impl LossRate {
    /// Gets the rate as f64 in `[0, 1]`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.into_inner()
    }
}

/// Channel capacity for bounded queues.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 1_000_000),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Serialize,
        Deserialize,
        Display,
        Default,
        TryFrom,
        Into
    ),
    default = 1000
)]
pub struct ChannelCapacity(usize);

impl ChannelCapacity {
    /// Gets the value as usize for use with tokio channels.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Unique identifier for an advertisement message.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    From,
    Into
))]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_id_rejects_empty_and_oversized_labels() {
        assert!(RouterId::try_new(String::new()).is_err());
        assert!(RouterId::try_new("x".repeat(33)).is_err());
        assert!(RouterId::try_new("A".to_string()).is_ok());
    }

    #[test]
    fn router_ids_order_by_label() {
        let a = RouterId::try_new("A".to_string()).unwrap();
        let b = RouterId::try_new("B".to_string()).unwrap();
        assert!(a < b);
    }

    #[test]
    fn link_cost_bounds() {
        assert!(LinkCost::try_new(0).is_err());
        assert!(LinkCost::try_new(16).is_err());
        assert_eq!(LinkCost::try_new(15).unwrap().as_u8(), 15);
    }

    #[test]
    fn path_cost_saturates_at_infinity() {
        let near = PathCost::try_new(14).unwrap();
        let link = LinkCost::try_new(5).unwrap();
        assert!(near.saturating_add(link).is_unreachable());

        let far = PathCost::unreachable();
        assert!(far.saturating_add(link).is_unreachable());

        let low = PathCost::try_new(2).unwrap();
        assert_eq!(low.saturating_add(link).as_u8(), 7);
    }

    #[test]
    fn path_cost_displays_infinity() {
        assert_eq!(PathCost::unreachable().to_string(), "inf");
        assert_eq!(PathCost::zero().to_string(), "0");
    }

    #[test]
    fn loss_rate_bounds() {
        assert!(LossRate::try_new(-0.1).is_err());
        assert!(LossRate::try_new(1.1).is_err());
        assert!(LossRate::try_new(f64::NAN).is_err());
        assert!(LossRate::try_new(0.5).is_ok());
    }
}
