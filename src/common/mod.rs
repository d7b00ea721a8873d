// ============================================================================
// Shared Kernel - Value types used across modules
// ============================================================================

pub mod clock;
pub mod money;

pub use clock::{Clock, ManualClock, SystemClock};
pub use money::{Money, MoneyError};
