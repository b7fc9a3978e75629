//! Value objects shared by orders and collaborators.

use serde::{Deserialize, Serialize};

common::uuid_id!(
    /// Identifier of a user (customer, seller, deliverer or admin).
    UserId
);

common::uuid_id!(
    /// Identifier of a product owned by a seller.
    ProductId
);

common::uuid_id!(
    /// Identifier of a user's wallet.
    WalletId
);

/// Role a user holds in the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Seller,
    Deliverer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Seller => "Seller",
            Role::Deliverer => "Deliverer",
            Role::Admin => "Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Money amount represented in cents to avoid floating point drift.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    /// Converts a floating point amount, rounding to the nearest cent.
    pub fn from_f64(amount: f64) -> Self {
        Self {
            cents: (amount * 100.0).round() as i64,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// The amount as a floating point number of whole units.
    pub fn as_f64(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_mul(&self, quantity: u32) -> Option<Money> {
        self.cents.checked_mul(i64::from(quantity)).map(Money::from_cents)
    }

    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_add(rhs.cents).map(Money::from_cents)
    }

    pub fn checked_sub(&self, rhs: Money) -> Option<Money> {
        self.cents.checked_sub(rhs.cents).map(Money::from_cents)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct_types_with_unique_values() {
        assert_ne!(UserId::new(), UserId::new());
        let product = ProductId::new();
        assert_eq!(ProductId::from_uuid(product.as_uuid()), product);
    }

    #[test]
    fn test_money_float_conversion_rounds_to_cents() {
        assert_eq!(Money::from_f64(10.0).cents(), 1000);
        assert_eq!(Money::from_f64(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_cents(3200).as_f64(), 32.0);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_dollars(10);
        let b = Money::from_dollars(2);

        let total = a.checked_mul(3).and_then(|m| m.checked_add(b));
        assert_eq!(total.map(|m| m.cents()), Some(3200));
        assert_eq!(a.checked_sub(b).map(|m| m.cents()), Some(800));
        assert!(b.checked_sub(a).is_some_and(|m| m.is_negative()));
    }

    #[test]
    fn test_money_arithmetic_overflow_is_none() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!(huge.checked_mul(3), None);
        assert_eq!(huge.checked_add(huge).and_then(|m| m.checked_add(huge)), None);
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(i64::MIN).to_string(), "-$92233720368547758.08");
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Deliverer.to_string(), "Deliverer");
    }
}
