use std::fmt;
use std::sync::Arc;

use crate::config::{DispatcherConfig, EnvironmentInfo};
use crate::console::ConsoleDriver;
use crate::diagnostics::Diagnostics;
use crate::driver::TraceDriver;
use crate::error::BuildError;

/// Supported driver kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Console,
    Postgres,
    PubSub,
}

impl DriverKind {
    /// Driver to try first: Pub/Sub on managed cloud compute, Postgres
    /// everywhere else.
    pub fn preferred(environment: &EnvironmentInfo) -> Self {
        if environment.hosted_in_cloud {
            DriverKind::PubSub
        } else {
            DriverKind::Postgres
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverKind::Console => "ConsoleDriver",
            DriverKind::Postgres => "PostgresDriver",
            DriverKind::PubSub => "PubSubDriver",
        };
        f.write_str(name)
    }
}

/// Constructs the driver a dispatcher should prefer.
///
/// Called at most once per dispatcher. Errors are not retried: the
/// dispatcher substitutes a [`ConsoleDriver`] instead.
pub trait DriverFactory: Send + Sync {
    /// Kind that [`DriverFactory::create`] attempts to build.
    fn kind(&self) -> DriverKind;

    /// Build the driver, reporting its own operational messages (connects,
    /// schema setup) to `diagnostics`.
    fn create(&self, diagnostics: Arc<dyn Diagnostics>) -> Result<Arc<dyn TraceDriver>, BuildError>;
}

/// Factory that selects the driver from [`EnvironmentInfo`].
pub struct EnvironmentFactory {
    config: DispatcherConfig,
}

impl EnvironmentFactory {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }
}

impl DriverFactory for EnvironmentFactory {
    fn kind(&self) -> DriverKind {
        DriverKind::preferred(&self.config.environment)
    }

    fn create(&self, diagnostics: Arc<dyn Diagnostics>) -> Result<Arc<dyn TraceDriver>, BuildError> {
        make_driver(self.kind(), &self.config, diagnostics)
    }
}

/// Create a concrete [`TraceDriver`] of the requested kind.
///
/// No connection is opened here; stateful drivers connect on first send.
/// Kinds whose cargo feature is disabled fail with
/// [`BuildError::FeatureDisabled`].
pub fn make_driver(
    kind: DriverKind,
    config: &DispatcherConfig,
    diagnostics: Arc<dyn Diagnostics>,
) -> Result<Arc<dyn TraceDriver>, BuildError> {
    match kind {
        DriverKind::Console => Ok(Arc::new(ConsoleDriver::new())),
        DriverKind::Postgres => {
            #[cfg(feature = "postgres")]
            {
                use crate::postgres::PostgresDriver;

                let driver = PostgresDriver::new(&config.postgres)?.with_diagnostics(diagnostics);
                Ok(Arc::new(driver) as Arc<dyn TraceDriver>)
            }

            #[cfg(not(feature = "postgres"))]
            {
                let _ = (config, diagnostics);
                Err(BuildError::FeatureDisabled("postgres"))
            }
        }
        DriverKind::PubSub => {
            #[cfg(feature = "pubsub")]
            {
                use crate::pubsub::PubSubDriver;

                let driver = PubSubDriver::new(&config.pubsub)?.with_diagnostics(diagnostics);
                Ok(Arc::new(driver) as Arc<dyn TraceDriver>)
            }

            #[cfg(not(feature = "pubsub"))]
            {
                let _ = (config, diagnostics);
                Err(BuildError::FeatureDisabled("pubsub"))
            }
        }
    }
}
