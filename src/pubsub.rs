use crate::config::PubSubConfig;
use crate::error::{BuildError, SinkError};
use crate::topic::{topic_path, PublishConnector, TopicDriver, TopicPublisher};
use async_trait::async_trait;
use base64::engine::general_purpose;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Public Pub/Sub REST endpoint.
pub const PUBSUB_API_URL: &str = "https://pubsub.googleapis.com";

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before the server-declared expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Pub/Sub driver talking to the REST API over `reqwest`.
pub type PubSubDriver = TopicDriver<HttpPubSubConnector>;

impl PubSubDriver {
    /// Create a driver from configuration without touching the network.
    pub fn new(config: &PubSubConfig) -> Result<Self, BuildError> {
        TopicDriver::with_connector(config, HttpPubSubConnector::from_config(config))
    }
}

/// Builds [`HttpPublisher`]s for the public API or a local emulator.
#[derive(Debug, Clone, Default)]
pub struct HttpPubSubConnector {
    /// `host:port` of the emulator; requests go over plain HTTP without auth.
    pub emulator_host: Option<String>,
    /// Static bearer token; otherwise the metadata server is used.
    pub access_token: Option<String>,
}

impl HttpPubSubConnector {
    pub fn from_config(config: &PubSubConfig) -> Self {
        Self {
            emulator_host: config.emulator_host.clone(),
            access_token: config.access_token.clone(),
        }
    }

    fn base_url(&self) -> String {
        match &self.emulator_host {
            Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
                host.trim_end_matches('/').to_string()
            }
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => PUBSUB_API_URL.to_string(),
        }
    }

    fn token_source(&self) -> TokenSource {
        if self.emulator_host.is_some() {
            TokenSource::Anonymous
        } else if let Some(token) = &self.access_token {
            TokenSource::Static(token.clone())
        } else {
            TokenSource::Metadata(Mutex::new(None))
        }
    }
}

/// `{base}/v1/projects/{project}/topics/{topic}:publish`
pub fn publish_endpoint(base_url: &str, project_id: &str, topic: &str) -> String {
    format!(
        "{}/v1/projects/{}/topics/{}:publish",
        base_url.trim_end_matches('/'),
        urlencoding::encode(project_id),
        urlencoding::encode(topic)
    )
}

#[async_trait]
impl PublishConnector for HttpPubSubConnector {
    type Publisher = HttpPublisher;

    async fn connect(&self, project_id: &str, topic: &str) -> Result<HttpPublisher, SinkError> {
        let client = Client::builder().build().map_err(SinkError::connect)?;
        Ok(HttpPublisher {
            client,
            endpoint: publish_endpoint(&self.base_url(), project_id, topic),
            topic_path: topic_path(project_id, topic),
            auth: self.token_source(),
        })
    }
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

enum TokenSource {
    Anonymous,
    Static(String),
    Metadata(Mutex<Option<CachedToken>>),
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

impl TokenSource {
    async fn token(&self, client: &Client) -> Result<Option<String>, SinkError> {
        match self {
            TokenSource::Anonymous => Ok(None),
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Metadata(cache) => {
                let mut cache = cache.lock().await;
                if let Some(cached) = cache.as_ref().filter(|c| Instant::now() < c.refresh_at) {
                    return Ok(Some(cached.value.clone()));
                }

                let fetched = fetch_metadata_token(client).await?;
                let lifetime = Duration::from_secs(fetched.expires_in)
                    .saturating_sub(TOKEN_REFRESH_MARGIN);
                let value = fetched.access_token;
                *cache = Some(CachedToken {
                    value: value.clone(),
                    refresh_at: Instant::now() + lifetime,
                });
                Ok(Some(value))
            }
        }
    }
}

async fn fetch_metadata_token(client: &Client) -> Result<MetadataToken, SinkError> {
    let resp = client
        .get(METADATA_TOKEN_URL)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| SinkError::Auth(format!("metadata server unreachable: {e}")))?;
    if !resp.status().is_success() {
        return Err(SinkError::Auth(format!(
            "metadata server responded with status {}",
            resp.status()
        )));
    }
    resp.json()
        .await
        .map_err(|e| SinkError::Auth(format!("malformed metadata token: {e}")))
}

#[derive(Serialize)]
struct PublishRequest<'a> {
    messages: [OutgoingMessage<'a>; 1],
}

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    data: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Publisher bound to a single topic.
pub struct HttpPublisher {
    client: Client,
    endpoint: String,
    topic_path: String,
    auth: TokenSource,
}

impl HttpPublisher {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn publish_body(payload: &[u8]) -> String {
    let data = general_purpose::STANDARD.encode(payload);
    let request = PublishRequest {
        messages: [OutgoingMessage { data: &data }],
    };
    // Serializing a struct of plain strings cannot fail.
    serde_json::to_string(&request).unwrap_or_default()
}

#[async_trait]
impl TopicPublisher for HttpPublisher {
    fn topic_path(&self) -> &str {
        &self.topic_path
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<String, SinkError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .body(publish_body(&payload));
        if let Some(token) = self.auth.token(&self.client).await? {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(SinkError::publish)?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(SinkError::PublishRejected { status, body });
        }

        let parsed: PublishResponse = resp.json().await.map_err(SinkError::publish)?;
        parsed
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| SinkError::InvalidResponse("publish response carried no message id".into()))
    }
}
