use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::hash::Hash;

// ============================================================================
// Aggregate Root - Version guard shared by every aggregate
// ============================================================================
//
// Key Principles:
// 1. Aggregates enforce business invariants; a failed guard changes nothing
// 2. Every successful command yields exactly one event, returned as data
// 3. The version is read-only to the aggregate: it is compared through
//    match_version and only advanced by the persistence layer on commit
//
// ============================================================================

/// Version of an aggregate that has never been committed
pub const INITIAL_VERSION: i64 = 0;

/// Generic aggregate root
///
/// Type Parameters:
/// - `Id`: Identity of the aggregate, also used as the lock subject id
/// - `Event`: The domain event type emitted by commands
/// - `Command`: The command type for this aggregate
/// - `Error`: The error type for business rule violations
pub trait AggregateRoot: Sized + Send + Sync {
    type Id: Clone + Eq + Hash + Display + Send + Sync;
    type Event;
    type Command;
    type Error;

    /// Tag naming the kind of aggregate, e.g. "Order"
    fn aggregate_type() -> &'static str;

    fn aggregate_id(&self) -> &Self::Id;

    /// Version this instance was loaded (or last committed) at
    fn version(&self) -> i64;

    /// Optimistic concurrency check against the version a caller last saw
    fn match_version(&self, expected: i64) -> bool {
        self.version() == expected
    }

    /// Run guards, mutate, and return the single resulting event stamped `at`
    fn handle_command(&mut self, command: &Self::Command, at: DateTime<Utc>) -> Result<Self::Event, Self::Error>;

    /// Stamp the version assigned by a successful commit.
    /// Only persistence adapters should call this.
    fn with_committed_version(self, version: i64) -> Self;
}
