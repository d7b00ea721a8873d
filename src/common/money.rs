use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Money - Immutable Value Object
// ============================================================================
//
// Equality and hashing are by value. Arithmetic is checked: an operation that
// would leave the i64 range fails with MoneyError::Overflow rather than
// wrapping or saturating.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Money arithmetic overflowed")]
    Overflow,
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Returns a new instance worth `self * multiplier`
    pub fn multiply(&self, multiplier: i64) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(multiplier)
            .map(Money)
            .ok_or(MoneyError::Overflow)
    }

    pub fn plus(&self, other: Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(MoneyError::Overflow)
    }

    /// Sum a sequence of amounts, failing on the first overflow
    pub fn sum<I>(amounts: I) -> Result<Money, MoneyError>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.plus(amount))
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_multiply_returns_new_instance() {
        let price = Money::new(1000);
        let total = price.multiply(3).unwrap();

        assert_eq!(total, Money::new(3000));
        assert_eq!(price.value(), 1000);
    }

    #[test]
    fn test_equality_and_hash_by_value() {
        let mut set = HashSet::new();
        set.insert(Money::new(500));
        set.insert(Money::new(500));
        set.insert(Money::new(700));

        assert_eq!(set.len(), 2);
        assert_eq!(Money::new(500), Money::from(500));
    }

    #[test]
    fn test_multiply_overflow_fails() {
        let result = Money::new(i64::MAX).multiply(2);
        assert_eq!(result, Err(MoneyError::Overflow));
    }

    #[test]
    fn test_sum_of_amounts() {
        let total = Money::sum(vec![Money::new(2000), Money::new(500)]).unwrap();
        assert_eq!(total, Money::new(2500));
        assert_eq!(Money::sum(Vec::new()).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_sum_overflow_fails() {
        let result = Money::sum(vec![Money::new(i64::MAX), Money::new(1)]);
        assert!(matches!(result, Err(MoneyError::Overflow)));
    }

    #[test]
    fn test_display_and_serialization() {
        let money = Money::new(2500);
        assert_eq!(money.to_string(), "2500");

        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "2500");
        let deserialized: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, money);
    }
}
