pub mod dispatcher;

pub use dispatcher::{BroadcastEventDispatcher, DispatchError, EventDispatcher};
