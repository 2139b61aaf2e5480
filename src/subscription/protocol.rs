use crate::device::{AttributeKey, AttributeState, DeviceId, DeviceUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Client → Server: narrow or widen the set of devices delivered on this
/// connection. With no subscription at all, every update is delivered.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe { device_id: DeviceId },
    Unsubscribe { device_id: DeviceId },
}

/// Server → Client: one device update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub id: DeviceId,
    pub attributes: HashMap<AttributeKey, AttributeState>,
}

impl From<DeviceUpdate> for UpdateMessage {
    fn from(update: DeviceUpdate) -> Self {
        Self {
            msg_type: "device_update".to_string(),
            id: update.id,
            attributes: update.attributes,
        }
    }
}

/// Server → Client: error notification.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub error: String,
}

impl ErrorMessage {
    pub fn new(error: String) -> Self {
        Self {
            msg_type: "error".to_string(),
            error,
        }
    }
}
