use crate::device::{CapabilityArgument, CapabilityKey, DeviceId, DeviceSpec, DeviceUpdate};
use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Buffer between the subscribe-stream reader and the cache's ingest loop.
const UPDATE_CHANNEL_CAPACITY: usize = 32;

/// Errors surfaced by the upstream hub boundary.
#[derive(Debug)]
pub enum UpstreamError {
    /// The hub does not know the addressed device.
    DeviceNotFound(DeviceId),
    /// Transport-level failure talking to the hub.
    Request(reqwest::Error),
    /// The hub answered an unexpected status code.
    Status { status: u16, context: String },
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamError::DeviceNotFound(id) => {
                write!(f, "upstream hub does not know device '{}'", id)
            }
            UpstreamError::Request(e) => write!(f, "upstream request failed: {}", e),
            UpstreamError::Status { status, context } => {
                write!(f, "upstream answered status {} for {}", status, context)
            }
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UpstreamError::Request(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        UpstreamError::Request(e)
    }
}

/// The upstream hub as seen by the cache: one snapshot plus an ordered
/// update stream, and capability passthrough.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    /// Connects to the hub and returns the current device snapshot together
    /// with the ordered stream of subsequent updates. The stream closes
    /// when the hub connection ends.
    async fn initialize(
        &self,
    ) -> Result<(Vec<DeviceSpec>, mpsc::Receiver<DeviceUpdate>), UpstreamError>;

    /// Invokes a device capability on the hub.
    async fn trigger_capability(
        &self,
        device: &DeviceId,
        capability: &CapabilityKey,
        argument: &CapabilityArgument,
    ) -> Result<(), UpstreamError>;
}

/// HTTP implementation of [`UpstreamSource`].
///
/// Snapshot and capability calls are plain JSON endpoints; updates arrive
/// as `data:` frames on a server-sent-event stream.
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl HttpUpstream {
    /// `request_timeout` bounds snapshot and capability calls. The
    /// subscribe stream is deliberately unbounded in time; only its
    /// connection setup shares the timeout.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            request_timeout,
        })
    }

    async fn fetch_snapshot(&self) -> Result<Vec<DeviceSpec>, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/devices", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
                context: "device snapshot".to_string(),
            });
        }
        Ok(response.json().await?)
    }

    async fn open_update_stream(&self) -> Result<reqwest::Response, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/subscribe", self.base_url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
                context: "update subscription".to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl UpstreamSource for HttpUpstream {
    async fn initialize(
        &self,
    ) -> Result<(Vec<DeviceSpec>, mpsc::Receiver<DeviceUpdate>), UpstreamError> {
        let snapshot = self.fetch_snapshot().await?;
        let stream = self.open_update_stream().await?;
        info!(
            devices = snapshot.len(),
            upstream = %self.base_url,
            "Connected to upstream hub"
        );

        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        tokio::spawn(pump_updates(stream, tx));

        Ok((snapshot, rx))
    }

    async fn trigger_capability(
        &self,
        device: &DeviceId,
        capability: &CapabilityKey,
        argument: &CapabilityArgument,
    ) -> Result<(), UpstreamError> {
        let response = self
            .client
            .post(format!(
                "{}/capability/{}/{}",
                self.base_url, device, capability
            ))
            .timeout(self.request_timeout)
            .json(argument)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(UpstreamError::DeviceNotFound(device.clone()))
        } else {
            Err(UpstreamError::Status {
                status: status.as_u16(),
                context: format!("capability '{}'", capability),
            })
        }
    }
}

/// Reads `data:` frames off the event stream and forwards each decoded
/// update in arrival order. Ends when the stream or the receiving side
/// closes; either way the channel closes with it.
async fn pump_updates(response: reqwest::Response, tx: mpsc::Sender<DeviceUpdate>) {
    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                error!(error = %e, "Upstream event stream failed");
                break;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            let line = line.trim_end();
            let Some(data) = line
                .strip_prefix("data: ")
                .or_else(|| line.strip_prefix("data:"))
            else {
                // Comment, id or blank separator line.
                continue;
            };

            match serde_json::from_str::<DeviceUpdate>(data.trim()) {
                Ok(update) => {
                    if tx.send(update).await.is_err() {
                        return;
                    }
                }
                Err(e) => warn!(error = %e, "Skipping undecodable update frame"),
            }
        }
    }

    info!("Upstream update stream ended");
}
