use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::OrderError;
use crate::common::Money;

// ============================================================================
// Order Value Objects
// ============================================================================

/// Order number, the aggregate identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNo(String);

impl OrderNo {
    pub fn new(number: impl Into<String>) -> Result<Self, OrderError> {
        let number = number.into();
        if number.trim().is_empty() {
            return Err(OrderError::EmptyOrderNumber);
        }
        Ok(Self(number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OrderNo {
    type Error = OrderError;

    fn try_from(number: String) -> Result<Self, Self::Error> {
        Self::new(number)
    }
}

impl From<OrderNo> for String {
    fn from(number: OrderNo) -> Self {
        number.0
    }
}

impl fmt::Display for OrderNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Customer who placed the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orderer {
    pub member_id: String,
    pub name: String,
}

impl Orderer {
    pub fn new(member_id: impl Into<String>, name: impl Into<String>) -> Result<Self, OrderError> {
        let member_id = member_id.into();
        if member_id.trim().is_empty() {
            return Err(OrderError::EmptyOrderer);
        }
        Ok(Self {
            member_id,
            name: name.into(),
        })
    }
}

/// One purchased product. `amounts` is always `price * quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderLineFields")]
pub struct OrderLine {
    product_id: String,
    price: Money,
    quantity: i32,
    amounts: Money,
}

impl OrderLine {
    pub fn new(product_id: impl Into<String>, price: Money, quantity: i32) -> Result<Self, OrderError> {
        if quantity <= 0 {
            return Err(OrderError::InvalidQuantity(quantity));
        }
        let amounts = price.multiply(i64::from(quantity))?;

        Ok(Self {
            product_id: product_id.into(),
            price,
            quantity,
            amounts,
        })
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn amounts(&self) -> Money {
        self.amounts
    }
}

// Wire shape of an OrderLine; amounts is derived, so it is not read back
#[derive(Deserialize)]
struct OrderLineFields {
    product_id: String,
    price: Money,
    quantity: i32,
}

impl TryFrom<OrderLineFields> for OrderLine {
    type Error = OrderError;

    fn try_from(fields: OrderLineFields) -> Result<Self, Self::Error> {
        Self::new(fields.product_id, fields.price, fields.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub zip_code: String,
    pub address1: String,
    pub address2: String,
}

/// Where and to whom the order ships. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub receiver: Receiver,
    pub address: Address,
    pub message: Option<String>,
}

impl ShippingInfo {
    pub fn new(receiver: Receiver, address: Address, message: Option<String>) -> Self {
        Self {
            receiver,
            address,
            message,
        }
    }

    pub fn validate(&self) -> Result<(), OrderError> {
        if self.receiver.name.trim().is_empty() {
            return Err(OrderError::InvalidShippingInfo("receiver name is empty".to_string()));
        }
        if self.address.address1.trim().is_empty() {
            return Err(OrderError::InvalidShippingInfo("address is empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    #[default]
    PaymentWaiting,
    Preparing,
    Shipped,
    Canceled,
}

impl OrderState {
    /// States in which shipping info may change and the order may be
    /// canceled or shipped
    pub fn is_not_yet_shipped(&self) -> bool {
        matches!(self, OrderState::PaymentWaiting | OrderState::Preparing)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_not_yet_shipped()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_line_amounts() {
        let line = OrderLine::new("prod-1", Money::new(1000), 2).unwrap();
        assert_eq!(line.amounts(), Money::new(2000));
        assert_eq!(line.price(), Money::new(1000));
        assert_eq!(line.quantity(), 2);
    }

    #[test]
    fn test_order_line_rejects_non_positive_quantity() {
        assert!(matches!(
            OrderLine::new("prod-1", Money::new(1000), 0),
            Err(OrderError::InvalidQuantity(0))
        ));
        assert!(matches!(
            OrderLine::new("prod-1", Money::new(1000), -3),
            Err(OrderError::InvalidQuantity(-3))
        ));
    }

    #[test]
    fn test_order_line_amount_overflow() {
        let result = OrderLine::new("prod-1", Money::new(i64::MAX), 2);
        assert!(matches!(result, Err(OrderError::AmountOverflow(_))));
    }

    #[test]
    fn test_order_no_must_not_be_blank() {
        assert!(matches!(OrderNo::new("  "), Err(OrderError::EmptyOrderNumber)));
        assert_eq!(OrderNo::new("10").unwrap().as_str(), "10");
    }

    #[test]
    fn test_shipping_info_validation() {
        let mut info = ShippingInfo::new(
            Receiver { name: "Kim".to_string(), phone: "010-0000-0000".to_string() },
            Address {
                zip_code: "12345".to_string(),
                address1: "Seoul".to_string(),
                address2: "Gangnam".to_string(),
            },
            None,
        );
        assert!(info.validate().is_ok());

        info.receiver.name = String::new();
        assert!(matches!(info.validate(), Err(OrderError::InvalidShippingInfo(_))));
    }

    #[test]
    fn test_order_state_groups() {
        assert!(OrderState::PaymentWaiting.is_not_yet_shipped());
        assert!(OrderState::Preparing.is_not_yet_shipped());
        assert!(OrderState::Shipped.is_terminal());
        assert!(OrderState::Canceled.is_terminal());
        assert_eq!(OrderState::default(), OrderState::PaymentWaiting);
    }

    #[test]
    fn test_order_no_deserialization_is_validated() {
        let number: OrderNo = serde_json::from_str("\"10\"").unwrap();
        assert_eq!(number.as_str(), "10");
        assert_eq!(serde_json::to_string(&number).unwrap(), "\"10\"");

        assert!(serde_json::from_str::<OrderNo>("\"  \"").is_err());
    }

    #[test]
    fn test_order_line_deserialization_is_validated() {
        let json = r#"{"product_id":"prod-1","price":1000,"quantity":3,"amounts":1}"#;
        let line: OrderLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.amounts(), Money::new(3000));

        let zero = r#"{"product_id":"prod-1","price":1000,"quantity":0,"amounts":0}"#;
        assert!(serde_json::from_str::<OrderLine>(zero).is_err());

        let overflow = format!(r#"{{"product_id":"prod-1","price":{},"quantity":2}}"#, i64::MAX);
        assert!(serde_json::from_str::<OrderLine>(&overflow).is_err());
    }

    #[test]
    fn test_order_state_serialization() {
        let json = serde_json::to_string(&OrderState::PaymentWaiting).unwrap();
        assert_eq!(json, "\"PAYMENT_WAITING\"");
        let deserialized: OrderState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, OrderState::PaymentWaiting);
    }
}
