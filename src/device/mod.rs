use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

#[cfg(test)]
mod tests;

/// Opaque unique identifier of a device. Immutable once assigned.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

/// Name of an attribute within a device.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeKey(pub String);

/// Name of a capability exposed by a device.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityKey(pub String);

macro_rules! string_newtype {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_newtype!(DeviceId);
string_newtype!(AttributeKey);
string_newtype!(CapabilityKey);

/// The active value of an attribute. An attribute carries at most one of
/// these type classes at a time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    Numeric(f64),
    Text(String),
    Boolean(bool),
}

/// Current state of one attribute. `None` means the attribute exists on the
/// device but currently carries no value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeState {
    pub value: Option<AttributeValue>,
}

impl AttributeState {
    pub fn numeric(value: f64) -> Self {
        Self {
            value: Some(AttributeValue::Numeric(value)),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Some(AttributeValue::Text(value.into())),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            value: Some(AttributeValue::Boolean(value)),
        }
    }

    /// An attribute that is present but carries no value.
    pub fn unset() -> Self {
        Self { value: None }
    }
}

/// An attribute as exposed by a device: mutable state plus immutable
/// metadata reported at discovery time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    #[serde(default)]
    pub state: AttributeState,

    /// Unit hint from the upstream hub (e.g. "percent"). Never changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl AttributeSpec {
    pub fn new(state: AttributeState) -> Self {
        Self { state, unit: None }
    }
}

/// A device and the fixed set of attributes it was discovered with.
///
/// Updates mutate attribute states in place; the key set itself only
/// changes when the whole spec is replaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub attributes: HashMap<AttributeKey, AttributeSpec>,
}

/// A sparse change event for a single device: only touched attributes
/// appear in the map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub id: DeviceId,
    pub attributes: HashMap<AttributeKey, AttributeState>,
}

/// Opaque argument object forwarded to the upstream hub when triggering a
/// capability.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityArgument(pub serde_json::Map<String, serde_json::Value>);
