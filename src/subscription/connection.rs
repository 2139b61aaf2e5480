use crate::device::{DeviceId, DeviceUpdate};
use crate::subscription::protocol::{ClientMessage, ErrorMessage, UpdateMessage};
use crate::subscription::SubscriptionHandle;
use axum::extract::ws::{Message, WebSocket};
use std::collections::HashSet;
use tracing::{error, info, warn};

/// Drives a single WebSocket connection fed by one subscription handle.
pub struct ConnectionManager {
    /// Devices this connection asked for. Empty set means everything.
    interests: HashSet<DeviceId>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            interests: HashSet::new(),
        }
    }

    /// Runs until the client disconnects or the update stream ends.
    pub async fn handle(mut self, mut socket: WebSocket, mut subscription: SubscriptionHandle) {
        info!("WebSocket subscriber connected");

        loop {
            tokio::select! {
                Some(msg) = socket.recv() => {
                    match msg {
                        Ok(Message::Text(text)) => {
                            if let Err(e) = self.handle_client_message(&text) {
                                warn!(error = %e, "Malformed client message");
                                if send_error(&mut socket, e.to_string()).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(Message::Close(_)) => {
                            info!("WebSocket subscriber disconnected");
                            break;
                        }
                        Ok(Message::Ping(data)) => {
                            if socket.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {
                            // Ignore binary and pong frames.
                        }
                        Err(e) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                update = subscription.recv() => {
                    match update {
                        Some(update) => {
                            if self.wants(&update.id) {
                                if let Err(e) = send_update(&mut socket, update).await {
                                    error!(error = %e, "Failed to send device update");
                                    break;
                                }
                            }
                        }
                        None => {
                            // Source stream closed; end the connection too.
                            let _ = socket.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }

                else => {
                    break;
                }
            }
        }

        info!("WebSocket connection closed");
    }

    fn handle_client_message(&mut self, text: &str) -> Result<(), serde_json::Error> {
        match serde_json::from_str::<ClientMessage>(text)? {
            ClientMessage::Subscribe { device_id } => {
                info!(device = %device_id, "Client subscribed to device");
                self.interests.insert(device_id);
            }
            ClientMessage::Unsubscribe { device_id } => {
                info!(device = %device_id, "Client unsubscribed from device");
                self.interests.remove(&device_id);
            }
        }
        Ok(())
    }

    fn wants(&self, id: &DeviceId) -> bool {
        self.interests.is_empty() || self.interests.contains(id)
    }
}

async fn send_update(socket: &mut WebSocket, update: DeviceUpdate) -> anyhow::Result<()> {
    let msg = UpdateMessage::from(update);
    socket.send(Message::Text(serde_json::to_string(&msg)?)).await?;
    Ok(())
}

async fn send_error(socket: &mut WebSocket, error: String) -> anyhow::Result<()> {
    let msg = ErrorMessage::new(error);
    socket.send(Message::Text(serde_json::to_string(&msg)?)).await?;
    Ok(())
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
