//! Structured trace-log dispatcher.
//!
//! Application code builds a [`entry::LogEntry`] and hands it to a
//! [`dispatcher::Dispatcher`], which stamps it into a
//! [`record::TraceLog`] and forwards the serialized record to exactly one
//! [`driver::TraceDriver`]: the console, a Postgres audit table, or a
//! Pub/Sub topic. The driver is chosen from the runtime environment on
//! first use, with the console as fallback when the preferred driver
//! cannot be constructed.

pub mod record;
pub mod clock;
pub mod error;
pub mod driver;
pub mod entry;

pub mod config;
pub mod env;
pub mod diagnostics;
pub mod init;

pub mod console;
pub mod relational;
pub mod topic;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "pubsub")]
pub mod pubsub;

pub mod backend;
pub mod dispatcher;

pub use dispatcher::Dispatcher;
pub use entry::LogEntry;
pub use record::LogLevel;
