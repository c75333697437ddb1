//! Notification dispatch & delivery-tracking engine.
//!
//! A logical "notify someone" request (immediate, bulk, or scheduled) is
//! turned into per-channel delivery attempts recorded in the
//! `notification_logs` store:
//!
//! 1. [`store::LogStore`] — durable record of every attempt, the single
//!    source of truth; all state transitions are conditional updates.
//! 2. [`dispatcher::Dispatcher`] — resolves the channel sender and records
//!    the outcome (`pending → sent | failed`).
//! 3. [`resolver::RecipientResolver`] — expands a logical audience into
//!    concrete per-channel recipient addresses.
//! 4. [`fanout::FanoutCoordinator`] — audience × channels → independent
//!    pending rows, then bounded-concurrency dispatch.
//! 5. [`scheduler::Scheduler`] — claims due scheduled rows atomically and
//!    dispatches them on a fixed tick.
//! 6. [`inbox::InboxService`] / [`stats::StatsAggregator`] — per-user
//!    in-app views and date-ranged delivery counts.

pub mod dispatcher;
pub mod fanout;
pub mod inbox;
pub mod resolver;
pub mod scheduler;
pub mod stats;
pub mod store;
