use crate::common::MoneyError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    // Validation
    #[error("Order number cannot be empty")]
    EmptyOrderNumber,

    #[error("Orderer member id cannot be empty")]
    EmptyOrderer,

    #[error("Order must have at least one order line")]
    NoOrderLines,

    #[error("Invalid item quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Invalid shipping info: {0}")]
    InvalidShippingInfo(String),

    #[error("Order amount out of range: {0}")]
    AmountOverflow(#[from] MoneyError),

    // State transitions
    #[error("Order is already shipped")]
    AlreadyShipped,

    #[error("Order is already canceled")]
    AlreadyCanceled,
}

impl OrderError {
    /// Stable label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            OrderError::EmptyOrderNumber => "empty_order_number",
            OrderError::EmptyOrderer => "empty_orderer",
            OrderError::NoOrderLines => "no_order_lines",
            OrderError::InvalidQuantity(_) => "invalid_quantity",
            OrderError::InvalidShippingInfo(_) => "invalid_shipping_info",
            OrderError::AmountOverflow(_) => "amount_overflow",
            OrderError::AlreadyShipped => "already_shipped",
            OrderError::AlreadyCanceled => "already_canceled",
        }
    }

    pub fn is_state_transition(&self) -> bool {
        matches!(self, OrderError::AlreadyShipped | OrderError::AlreadyCanceled)
    }
}
