// ============================================================================
// Order Domain - Business Logic for Order Aggregate
// ============================================================================
//
// This module contains ALL Order-specific code:
// - Value objects (OrderNo, Orderer, OrderLine, ShippingInfo, OrderState)
// - Events (OrderPlaced, ShippingInfoChanged, OrderCanceled, ShippingStarted)
// - Commands (PlaceOrder, OrderCommand)
// - Errors (OrderError enum)
// - Aggregate (Order with lifecycle rules)
// - Use cases (OrderService)
//
// ============================================================================

pub mod value_objects;
pub mod events;
pub mod commands;
pub mod errors;
pub mod aggregate;
pub mod command_handler;

// Re-export for convenience
pub use value_objects::*;
pub use events::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
pub use command_handler::*;
