use crate::config::PubSubConfig;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::driver::TraceDriver;
use crate::error::{BuildError, SinkError};
use crate::record::{render_bytes, TraceMap};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Acknowledgment returned when publishing is switched off.
pub const PUBLISH_DISABLED_ACK: &str = "publish-disabled";

/// Builds a publisher for one topic.
#[async_trait]
pub trait PublishConnector: Send + Sync + 'static {
    type Publisher: TopicPublisher;

    async fn connect(&self, project_id: &str, topic: &str) -> Result<Self::Publisher, SinkError>;
}

/// Handle able to publish raw payloads to a topic.
#[async_trait]
pub trait TopicPublisher: Send + Sync + 'static {
    /// Fully-qualified topic, `projects/{project}/topics/{topic}`.
    fn topic_path(&self) -> &str;

    /// Publish one message and wait for the transport's acknowledgment.
    ///
    /// **Returns**
    /// - `Ok(message_id)` assigned by the transport.
    async fn publish(&self, payload: Vec<u8>) -> Result<String, SinkError>;
}

/// `projects/{project}/topics/{topic}`.
pub fn topic_path(project_id: &str, topic: &str) -> String {
    format!("projects/{project_id}/topics/{topic}")
}

/// Driver that publishes each record as a compact JSON message.
///
/// The publisher is created on the first enabled `send`. When publishing
/// is disabled, `send` returns [`PUBLISH_DISABLED_ACK`] and no publisher
/// is ever created.
pub struct TopicDriver<C: PublishConnector> {
    project_id: String,
    topic_name: String,
    publish_enabled: bool,
    connector: C,
    publisher: OnceCell<C::Publisher>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<C: PublishConnector> TopicDriver<C> {
    /// Create a driver without connecting.
    ///
    /// **Returns**
    /// - `Err(BuildError::MissingProjectId)` if no project id is configured.
    pub fn with_connector(config: &PubSubConfig, connector: C) -> Result<Self, BuildError> {
        let project_id = config
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(BuildError::MissingProjectId)?
            .to_string();
        if config.topic_name.trim().is_empty() {
            return Err(BuildError::InvalidConfig("empty topic name".into()));
        }

        Ok(Self {
            project_id,
            topic_name: config.topic_name.clone(),
            publish_enabled: config.publish_enabled,
            connector,
            publisher: OnceCell::new(),
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Whether a publisher has been created yet.
    pub fn is_connected(&self) -> bool {
        self.publisher.initialized()
    }

    async fn publisher(&self) -> Result<&C::Publisher, SinkError> {
        self.publisher
            .get_or_try_init(|| async {
                let publisher = self
                    .connector
                    .connect(&self.project_id, &self.topic_name)
                    .await?;
                self.diagnostics
                    .info(&format!("Pub/Sub connected to topic {}", publisher.topic_path()));
                Ok::<_, SinkError>(publisher)
            })
            .await
    }
}

#[async_trait]
impl<C: PublishConnector> TraceDriver for TopicDriver<C> {
    fn name(&self) -> &'static str {
        "pubsub"
    }

    async fn send(&self, record: &TraceMap) -> Result<String, SinkError> {
        if !self.publish_enabled {
            return Ok(PUBLISH_DISABLED_ACK.to_string());
        }

        let publisher = self.publisher().await?;
        publisher.publish(render_bytes(record)).await
    }

    // Publishers hold no server-side resources; dropping the driver is
    // enough to release them.
    async fn close(&self) {}
}
