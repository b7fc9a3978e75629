use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// Lifecycle status of an order.
///
/// ```text
/// Placed ──► Accepted ──► Delivering ──► Delivered
/// ```
///
/// Transitions are strictly sequential. Cancellation is an out-of-band
/// action allowed from any status except `Delivered` and does not change
/// the status itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Placed,
    Accepted,
    Delivering,
    Delivered,
}

impl OrderStatus {
    /// Integer code used in the persisted record.
    pub fn code(&self) -> i32 {
        match self {
            OrderStatus::Placed => 0,
            OrderStatus::Accepted => 1,
            OrderStatus::Delivering => 2,
            OrderStatus::Delivered => 3,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, OrderError> {
        match code {
            0 => Ok(OrderStatus::Placed),
            1 => Ok(OrderStatus::Accepted),
            2 => Ok(OrderStatus::Delivering),
            3 => Ok(OrderStatus::Delivered),
            other => Err(OrderError::UnknownStatus(other)),
        }
    }

    /// The only status reachable from this one, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Placed => Some(OrderStatus::Accepted),
            OrderStatus::Accepted => Some(OrderStatus::Delivering),
            OrderStatus::Delivering => Some(OrderStatus::Delivered),
            OrderStatus::Delivered => None,
        }
    }

    /// Moves to `target`, which must be the immediate successor.
    pub fn advance(self, target: OrderStatus, action: &'static str) -> Result<Self, OrderError> {
        if self.next() == Some(target) {
            Ok(target)
        } else {
            Err(OrderError::InvalidTransition {
                current: self,
                action,
            })
        }
    }

    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Delivering => "Delivering",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Placed" => Ok(OrderStatus::Placed),
            "Accepted" => Ok(OrderStatus::Accepted),
            "Delivering" => Ok(OrderStatus::Delivering),
            "Delivered" => Ok(OrderStatus::Delivered),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 4] = [
        OrderStatus::Placed,
        OrderStatus::Accepted,
        OrderStatus::Delivering,
        OrderStatus::Delivered,
    ];

    #[test]
    fn test_codes_round_trip_and_reject_unknown() {
        for status in ALL {
            assert_eq!(OrderStatus::from_code(status.code()).unwrap(), status);
        }
        assert_eq!(
            OrderStatus::from_code(7),
            Err(OrderError::UnknownStatus(7))
        );
    }

    #[test]
    fn test_only_immediate_successor_is_reachable() {
        for from in ALL {
            for to in ALL {
                let result = from.advance(to, "advance");
                if from.next() == Some(to) {
                    assert_eq!(result, Ok(to));
                } else {
                    let rejected = matches!(
                        result,
                        Err(OrderError::InvalidTransition { current, .. }) if current == from
                    );
                    assert!(rejected, "{from} -> {to} should be rejected");
                }
            }
        }
    }

    #[test]
    fn test_walking_next_yields_lifecycle_sequence() {
        let mut seen = vec![OrderStatus::Placed];
        while let Some(next) = seen.last().and_then(|s| s.next()) {
            seen.push(next);
        }
        assert_eq!(seen, ALL);
    }

    #[test]
    fn test_cancel_allowed_until_delivered() {
        assert!(OrderStatus::Placed.can_cancel());
        assert!(OrderStatus::Accepted.can_cancel());
        assert!(OrderStatus::Delivering.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("Accepted".parse::<OrderStatus>(), Ok(OrderStatus::Accepted));
        assert!("Shipped".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::Delivering.to_string(), "Delivering");
    }
}
