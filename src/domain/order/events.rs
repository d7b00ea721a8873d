use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{OrderLine, OrderNo, Orderer, ShippingInfo};
use crate::common::Money;
use crate::infrastructure::core::DomainEvent;

// ============================================================================
// Order Events - Domain Events for Order Aggregate
// ============================================================================

/// Order Event - Union type for all order events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    Placed(OrderPlaced),
    ShippingInfoChanged(ShippingInfoChanged),
    Canceled(OrderCanceled),
    ShippingStarted(ShippingStarted),
}

impl OrderEvent {
    pub fn order_number(&self) -> &OrderNo {
        match self {
            OrderEvent::Placed(e) => &e.order_number,
            OrderEvent::ShippingInfoChanged(e) => &e.order_number,
            OrderEvent::Canceled(e) => &e.order_number,
            OrderEvent::ShippingStarted(e) => &e.order_number,
        }
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::ShippingInfoChanged(_) => "ShippingInfoChanged",
            OrderEvent::Canceled(_) => "OrderCanceled",
            OrderEvent::ShippingStarted(_) => "ShippingStarted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Placed(e) => e.order_date,
            OrderEvent::ShippingInfoChanged(e) => e.changed_at,
            OrderEvent::Canceled(e) => e.canceled_at,
            OrderEvent::ShippingStarted(e) => e.started_at,
        }
    }
}

// ============================================================================
// Individual Event Types
// ============================================================================

/// Order Placed - Initial event in order lifecycle
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderPlaced {
    pub order_number: OrderNo,
    pub orderer: Orderer,
    pub order_lines: Vec<OrderLine>,
    pub total_amounts: Money,
    pub order_date: DateTime<Utc>,
}

/// Shipping Info Changed - Destination replaced before shipment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShippingInfoChanged {
    pub order_number: OrderNo,
    pub shipping_info: ShippingInfo,
    pub changed_at: DateTime<Utc>,
}

/// Order Canceled - Order lifecycle ended before shipment
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderCanceled {
    pub order_number: OrderNo,
    pub canceled_at: DateTime<Utc>,
}

/// Shipping Started - Order left the warehouse
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ShippingStarted {
    pub order_number: OrderNo,
    pub started_at: DateTime<Utc>,
}
