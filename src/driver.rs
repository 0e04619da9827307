use crate::error::SinkError;
use crate::record::TraceMap;
use async_trait::async_trait;

/// Destination for serialized [`TraceMap`] records.
///
/// Implementations own the transport to one concrete backend (stdout, a
/// Postgres table, a Pub/Sub topic). The dispatcher holds exactly one
/// driver at a time behind an `Arc`, so `send` may be called from many
/// tasks at once; drivers whose transport is not safe for concurrent use
/// must serialize internally.
#[async_trait]
pub trait TraceDriver: Send + Sync {
    /// Short name used in diagnostics (`"console"`, `"postgres"`, ...).
    fn name(&self) -> &'static str;

    /// Deliver a single record.
    ///
    /// **Parameters**
    /// - `record`: the sparse mapping produced by
    ///   [`crate::record::TraceLog::to_map`]. It is never mutated.
    ///
    /// **Returns**
    /// - `Ok(ack)` with a sink-defined acknowledgment: a row id, a
    ///   message id, or a fixed sentinel for sinks without one.
    /// - `Err(..)` if connecting, preparing or writing failed. Errors are
    ///   not retried by the caller.
    ///
    /// Calling `send` repeatedly is always allowed, including after
    /// [`TraceDriver::close`]; stateful drivers reconnect lazily.
    async fn send(&self, record: &TraceMap) -> Result<String, SinkError>;

    /// Release connections and handles.
    ///
    /// Idempotent: safe on a driver that never connected and safe to call
    /// twice. Failures while releasing are reported to diagnostics, never
    /// to the caller.
    async fn close(&self) {}
}
