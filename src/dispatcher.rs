use std::sync::{Arc, Mutex, PoisonError};

use crate::backend::{DriverFactory, EnvironmentFactory};
use crate::clock::{Clock, SystemClock};
use crate::config::DispatcherConfig;
use crate::console::ConsoleDriver;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::driver::TraceDriver;
use crate::entry::LogEntry;
use crate::error::SinkError;
use crate::record::TraceLog;

/// Routes trace records to a single, lazily resolved [`TraceDriver`].
///
/// The driver is built on first use by the configured [`DriverFactory`].
/// If that fails, one warning is emitted and a [`ConsoleDriver`] takes its
/// place for the rest of the dispatcher's life. Resolution happens under a
/// lock, so concurrent first calls construct exactly one driver.
///
/// A dispatcher is meant to be shared (e.g. behind an `Arc`) by all
/// request handlers of a process. It never closes its driver on drop;
/// call [`Dispatcher::close`] explicitly.
pub struct Dispatcher {
    service: String,
    factory: Arc<dyn DriverFactory>,
    diagnostics: Arc<dyn Diagnostics>,
    clock: Arc<dyn Clock>,
    fallback: ConsoleDriver,
    driver: Mutex<Option<Arc<dyn TraceDriver>>>,
}

impl Dispatcher {
    /// Dispatcher that selects its driver from `config.environment`.
    pub fn new(config: DispatcherConfig) -> Self {
        let service = config.service.clone();
        Self::with_factory(service, Arc::new(EnvironmentFactory::new(config)))
    }

    /// Shorthand for `Dispatcher::new(DispatcherConfig::from_env())`.
    pub fn from_env() -> Self {
        Self::new(DispatcherConfig::from_env())
    }

    /// Dispatcher using a custom factory for its preferred driver.
    pub fn with_factory(service: impl Into<String>, factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            service: service.into(),
            factory,
            diagnostics: Arc::new(TracingDiagnostics),
            clock: Arc::new(SystemClock),
            fallback: ConsoleDriver::new(),
            driver: Mutex::new(None),
        }
    }

    /// Side channel for fallback warnings and for the operational messages
    /// of every driver this dispatcher builds.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Console driver substituted when the preferred driver cannot be
    /// built. Defaults to stdout.
    pub fn with_fallback(mut self, fallback: ConsoleDriver) -> Self {
        self.fallback = fallback;
        self
    }

    /// Default service name stamped on records.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Whether a driver has been resolved or injected yet.
    pub fn has_driver(&self) -> bool {
        self.slot().is_some()
    }

    /// The active driver, resolving it on first call.
    pub fn driver(&self) -> Arc<dyn TraceDriver> {
        let mut slot = self.slot();
        if let Some(driver) = slot.as_ref() {
            return Arc::clone(driver);
        }
        let driver = self.create_driver();
        *slot = Some(Arc::clone(&driver));
        driver
    }

    /// Replace the active driver, bypassing selection entirely.
    ///
    /// The previous driver, if any, is not closed.
    pub fn set_driver(&self, driver: Arc<dyn TraceDriver>) {
        *self.slot() = Some(driver);
    }

    /// Build a record from `entry`, stamp it and send it.
    ///
    /// **Returns**
    /// - The driver's acknowledgment id.
    /// - Errors raised by the resolved driver while sending, unchanged.
    pub async fn log(&self, entry: LogEntry) -> Result<String, SinkError> {
        let trace = entry.into_trace(self.clock.timestamp(), &self.service);
        self.send_trace_log(&trace).await
    }

    /// Serialize an already-built record and hand it to the driver.
    pub async fn send_trace_log(&self, trace: &TraceLog) -> Result<String, SinkError> {
        let record = trace.to_map();
        self.driver().send(&record).await
    }

    /// Close the resolved driver, if any. The driver stays cached and
    /// reconnects on its next send.
    pub async fn close(&self) {
        let driver = self.slot().clone();
        if let Some(driver) = driver {
            driver.close().await;
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn TraceDriver>>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_driver(&self) -> Arc<dyn TraceDriver> {
        let kind = self.factory.kind();
        match self.factory.create(Arc::clone(&self.diagnostics)) {
            Ok(driver) => driver,
            Err(e) => {
                self.diagnostics
                    .error(&format!("could not initialise {kind}: {e}"));
                self.diagnostics.warning("using ConsoleDriver as fallback");
                Arc::new(self.fallback.clone())
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::from_env()
    }
}
