use super::value_objects::{OrderLine, OrderNo, OrderState, Orderer, ShippingInfo};

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// Everything needed to construct an order in one step
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub number: OrderNo,
    pub orderer: Orderer,
    pub order_lines: Vec<OrderLine>,
    pub shipping_info: ShippingInfo,
    pub initial_state: OrderState,
}

impl PlaceOrder {
    pub fn new(
        number: OrderNo,
        orderer: Orderer,
        order_lines: Vec<OrderLine>,
        shipping_info: ShippingInfo,
    ) -> Self {
        Self {
            number,
            orderer,
            order_lines,
            shipping_info,
            initial_state: OrderState::PaymentWaiting,
        }
    }

    pub fn with_initial_state(mut self, state: OrderState) -> Self {
        self.initial_state = state;
        self
    }
}

#[derive(Debug, Clone)]
pub enum OrderCommand {
    ChangeShippingInfo { shipping_info: ShippingInfo },
    Cancel,
    StartShipping,
}

impl OrderCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OrderCommand::ChangeShippingInfo { .. } => "change_shipping_info",
            OrderCommand::Cancel => "cancel",
            OrderCommand::StartShipping => "start_shipping",
        }
    }
}
