use chrono::{DateTime, Utc};
use serde::Serialize;

use super::commands::{OrderCommand, PlaceOrder};
use super::errors::OrderError;
use super::events::*;
use super::value_objects::{OrderLine, OrderNo, OrderState, Orderer, ShippingInfo};
use crate::common::Money;
use crate::infrastructure::core::{AggregateRoot, INITIAL_VERSION};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// Invariants held after every operation:
// - at least one order line
// - total_amounts equals the sum of line amounts
// - shipping info changes, cancel and start_shipping are only reachable
//   while the order is PAYMENT_WAITING or PREPARING
//
// Every guard runs before any field is written.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    // Identity
    number: OrderNo,
    version: i64,

    orderer: Orderer,
    order_lines: Vec<OrderLine>,
    total_amounts: Money,
    shipping_info: ShippingInfo,
    state: OrderState,

    order_date: DateTime<Utc>,
}

impl Order {
    /// Construct a fully valid order, or fail without producing one
    pub fn place(command: PlaceOrder, order_date: DateTime<Utc>) -> Result<(Self, OrderEvent), OrderError> {
        let PlaceOrder {
            number,
            orderer,
            order_lines,
            shipping_info,
            initial_state,
        } = command;

        Self::verify_at_least_one_order_line(&order_lines)?;
        shipping_info.validate()?;
        let total_amounts = Self::calculate_total_amounts(&order_lines)?;

        let order = Self {
            number,
            version: INITIAL_VERSION,
            orderer,
            order_lines,
            total_amounts,
            shipping_info,
            state: initial_state,
            order_date,
        };

        let event = OrderEvent::Placed(OrderPlaced {
            order_number: order.number.clone(),
            orderer: order.orderer.clone(),
            order_lines: order.order_lines.clone(),
            total_amounts,
            order_date,
        });

        Ok((order, event))
    }

    pub fn number(&self) -> &OrderNo {
        &self.number
    }

    pub fn orderer(&self) -> &Orderer {
        &self.orderer
    }

    pub fn order_lines(&self) -> &[OrderLine] {
        &self.order_lines
    }

    pub fn total_amounts(&self) -> Money {
        self.total_amounts
    }

    pub fn shipping_info(&self) -> &ShippingInfo {
        &self.shipping_info
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn is_not_yet_shipped(&self) -> bool {
        self.state.is_not_yet_shipped()
    }

    /// Replace the destination. Only allowed before shipment.
    pub fn change_shipping_info(
        &mut self,
        new_shipping_info: ShippingInfo,
        changed_at: DateTime<Utc>,
    ) -> Result<OrderEvent, OrderError> {
        self.verify_not_yet_shipped()?;
        new_shipping_info.validate()?;

        self.shipping_info = new_shipping_info;

        Ok(OrderEvent::ShippingInfoChanged(ShippingInfoChanged {
            order_number: self.number.clone(),
            shipping_info: self.shipping_info.clone(),
            changed_at,
        }))
    }

    /// Cancel before shipment
    pub fn cancel(&mut self, canceled_at: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        self.verify_not_yet_shipped()?;

        self.state = OrderState::Canceled;

        Ok(OrderEvent::Canceled(OrderCanceled {
            order_number: self.number.clone(),
            canceled_at,
        }))
    }

    pub fn start_shipping(&mut self, started_at: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        self.verify_shippable_state()?;

        self.state = OrderState::Shipped;

        Ok(OrderEvent::ShippingStarted(ShippingStarted {
            order_number: self.number.clone(),
            started_at,
        }))
    }

    fn verify_at_least_one_order_line(order_lines: &[OrderLine]) -> Result<(), OrderError> {
        if order_lines.is_empty() {
            return Err(OrderError::NoOrderLines);
        }
        Ok(())
    }

    fn calculate_total_amounts(order_lines: &[OrderLine]) -> Result<Money, OrderError> {
        Ok(Money::sum(order_lines.iter().map(OrderLine::amounts))?)
    }

    fn verify_not_yet_shipped(&self) -> Result<(), OrderError> {
        match self.state {
            OrderState::PaymentWaiting | OrderState::Preparing => Ok(()),
            OrderState::Shipped => Err(OrderError::AlreadyShipped),
            OrderState::Canceled => Err(OrderError::AlreadyCanceled),
        }
    }

    fn verify_shippable_state(&self) -> Result<(), OrderError> {
        self.verify_not_canceled()?;
        self.verify_not_yet_shipped()
    }

    fn verify_not_canceled(&self) -> Result<(), OrderError> {
        if self.state == OrderState::Canceled {
            return Err(OrderError::AlreadyCanceled);
        }
        Ok(())
    }
}

// ============================================================================
// Aggregate Trait Implementation
// ============================================================================

impl AggregateRoot for Order {
    type Id = OrderNo;
    type Event = OrderEvent;
    type Command = OrderCommand;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn aggregate_id(&self) -> &OrderNo {
        &self.number
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn handle_command(&mut self, command: &OrderCommand, at: DateTime<Utc>) -> Result<OrderEvent, OrderError> {
        match command {
            OrderCommand::ChangeShippingInfo { shipping_info } => self.change_shipping_info(shipping_info.clone(), at),
            OrderCommand::Cancel => self.cancel(at),
            OrderCommand::StartShipping => self.start_shipping(at),
        }
    }

    fn with_committed_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::{Address, Receiver};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn shipping_info(receiver: &str) -> ShippingInfo {
        ShippingInfo::new(
            Receiver {
                name: receiver.to_string(),
                phone: "010-1234-5678".to_string(),
            },
            Address {
                zip_code: "06236".to_string(),
                address1: "Teheran-ro 152".to_string(),
                address2: "12F".to_string(),
            },
            Some("Leave at the door".to_string()),
        )
    }

    fn place_command(lines: Vec<OrderLine>) -> PlaceOrder {
        PlaceOrder::new(
            OrderNo::new("10").unwrap(),
            Orderer::new("member-1", "Choi").unwrap(),
            lines,
            shipping_info("Choi"),
        )
    }

    fn test_lines() -> Vec<OrderLine> {
        vec![
            OrderLine::new("prod-1", Money::new(1000), 2).unwrap(),
            OrderLine::new("prod-2", Money::new(500), 1).unwrap(),
        ]
    }

    fn placed_order() -> Order {
        Order::place(place_command(test_lines()), at()).unwrap().0
    }

    #[test]
    fn test_place_computes_total_and_emits_event() {
        let (order, event) = Order::place(place_command(test_lines()), at()).unwrap();

        assert_eq!(order.total_amounts(), Money::new(2500));
        assert_eq!(order.state(), OrderState::PaymentWaiting);
        assert_eq!(order.version(), INITIAL_VERSION);
        assert_eq!(order.order_lines().len(), 2);

        assert_eq!(order.order_date(), at());
        match event {
            OrderEvent::Placed(e) => {
                assert_eq!(e.order_number.as_str(), "10");
                assert_eq!(e.order_date, at());
                assert_eq!(e.total_amounts, Money::new(2500));
                assert_eq!(e.order_lines.len(), 2);
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_place_with_no_lines_fails() {
        let result = Order::place(place_command(vec![]), at());
        assert!(matches!(result, Err(OrderError::NoOrderLines)));
    }

    #[test]
    fn test_place_with_total_overflow_fails() {
        let lines = vec![
            OrderLine::new("prod-1", Money::new(i64::MAX), 1).unwrap(),
            OrderLine::new("prod-2", Money::new(1), 1).unwrap(),
        ];
        let result = Order::place(place_command(lines), at());
        assert!(matches!(result, Err(OrderError::AmountOverflow(_))));
    }

    #[test]
    fn test_place_with_invalid_shipping_info_fails() {
        let mut command = place_command(test_lines());
        command.shipping_info.address.address1 = String::new();

        let result = Order::place(command, at());
        assert!(matches!(result, Err(OrderError::InvalidShippingInfo(_))));
    }

    #[test]
    fn test_place_with_initial_state() {
        let command = place_command(test_lines()).with_initial_state(OrderState::Preparing);
        let (order, _) = Order::place(command, at()).unwrap();
        assert_eq!(order.state(), OrderState::Preparing);
    }

    #[test]
    fn test_start_shipping_then_again_fails() {
        let mut order = placed_order();

        let event = order.start_shipping(at()).unwrap();
        assert_eq!(order.state(), OrderState::Shipped);
        match event {
            OrderEvent::ShippingStarted(e) => {
                assert_eq!(e.order_number.as_str(), "10");
                assert_eq!(e.started_at, at());
            }
            other => panic!("Unexpected event: {:?}", other),
        }

        assert_eq!(order.start_shipping(at()), Err(OrderError::AlreadyShipped));
        assert_eq!(order.state(), OrderState::Shipped);
    }

    #[test]
    fn test_cancel_then_start_shipping_fails_with_already_canceled() {
        let mut order = placed_order();

        let event = order.cancel(at()).unwrap();
        assert!(matches!(event, OrderEvent::Canceled(_)));
        assert_eq!(order.state(), OrderState::Canceled);

        assert_eq!(order.start_shipping(at()), Err(OrderError::AlreadyCanceled));
        assert_eq!(order.state(), OrderState::Canceled);
    }

    #[test]
    fn test_start_shipping_then_cancel_fails_with_already_shipped() {
        let mut order = placed_order();
        order.start_shipping(at()).unwrap();

        assert_eq!(order.cancel(at()), Err(OrderError::AlreadyShipped));
        assert_eq!(order.state(), OrderState::Shipped);
    }

    #[test]
    fn test_cancel_twice_fails() {
        let mut order = placed_order();
        order.cancel(at()).unwrap();
        assert_eq!(order.cancel(at()), Err(OrderError::AlreadyCanceled));
    }

    #[test]
    fn test_cancel_from_preparing() {
        let command = place_command(test_lines()).with_initial_state(OrderState::Preparing);
        let (mut order, _) = Order::place(command, at()).unwrap();

        order.cancel(at()).unwrap();
        assert_eq!(order.state(), OrderState::Canceled);
    }

    #[test]
    fn test_change_shipping_info_before_shipping() {
        let mut order = placed_order();
        let new_info = shipping_info("Lee");

        let event = order.change_shipping_info(new_info.clone(), at()).unwrap();

        assert_eq!(order.shipping_info(), &new_info);
        match event {
            OrderEvent::ShippingInfoChanged(e) => assert_eq!(e.shipping_info, new_info),
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_change_shipping_info_after_shipping_fails() {
        let mut order = placed_order();
        let original = order.shipping_info().clone();
        order.start_shipping(at()).unwrap();

        let result = order.change_shipping_info(shipping_info("Lee"), at());
        assert_eq!(result, Err(OrderError::AlreadyShipped));
        assert_eq!(order.shipping_info(), &original);
    }

    #[test]
    fn test_change_shipping_info_after_cancel_fails() {
        let mut order = placed_order();
        order.cancel(at()).unwrap();

        let result = order.change_shipping_info(shipping_info("Lee"), at());
        assert_eq!(result, Err(OrderError::AlreadyCanceled));
    }

    #[test]
    fn test_invalid_shipping_info_leaves_order_unchanged() {
        let mut order = placed_order();
        let before = order.clone();

        let result = order.change_shipping_info(shipping_info(""), at());
        assert!(matches!(result, Err(OrderError::InvalidShippingInfo(_))));
        assert_eq!(order, before);
    }

    #[test]
    fn test_match_version_is_pure() {
        let order = placed_order().with_committed_version(4);

        assert!(order.match_version(4));
        assert!(!order.match_version(3));
        assert_eq!(order.version(), 4);
    }

    #[test]
    fn test_handle_command_dispatches() {
        let mut order = placed_order();

        let event = order.handle_command(&OrderCommand::StartShipping, at()).unwrap();
        assert!(matches!(event, OrderEvent::ShippingStarted(_)));

        let result = order.handle_command(&OrderCommand::Cancel, at());
        assert_eq!(result, Err(OrderError::AlreadyShipped));
    }

    #[test]
    fn test_failed_commands_do_not_touch_version() {
        let mut order = placed_order().with_committed_version(2);
        order.cancel(at()).unwrap();
        let _ = order.start_shipping(at());
        assert_eq!(order.version(), 2);
    }

    #[test]
    fn test_total_invariant_holds_through_lifecycle() {
        let mut order = placed_order();
        let expected = Money::sum(order.order_lines().iter().map(OrderLine::amounts)).unwrap();

        order.change_shipping_info(shipping_info("Lee"), at()).unwrap();
        assert_eq!(order.total_amounts(), expected);

        order.start_shipping(at()).unwrap();
        assert_eq!(order.total_amounts(), expected);
    }
}
