use crate::device::{DeviceId, DeviceSpec, DeviceUpdate};
use crate::filter::{self, AttributeFilter, FilterError};
use dashmap::DashMap;
use std::fmt;
use tracing::warn;


/// Returned by point lookups and diff application when the device id is
/// unknown to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceNotFound(pub DeviceId);

impl fmt::Display for DeviceNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no device with id '{}'", self.0)
    }
}

impl std::error::Error for DeviceNotFound {}

/// In-memory table of device specifications.
///
/// The ingest loop is the only writer; queries clone entries out under the
/// shard lock. `apply_diff` holds the device entry for the whole diff, so a
/// reader never observes a half-written attribute value.
pub struct DeviceStore {
    devices: DashMap<DeviceId, DeviceSpec>,
}

impl DeviceStore {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
        }
    }

    /// Point lookup by device id.
    pub fn get(&self, id: &DeviceId) -> Option<DeviceSpec> {
        self.devices.get(id).map(|device| device.clone())
    }

    /// Inserts a device, replacing any existing entry with the same id.
    pub fn insert(&self, spec: DeviceSpec) {
        self.devices.insert(spec.id.clone(), spec);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Lists every device satisfying all of `filters`. Order is
    /// unspecified.
    ///
    /// A terminal filter error on any device aborts the whole listing.
    pub fn list(&self, filters: &[AttributeFilter]) -> Result<Vec<DeviceSpec>, FilterError> {
        let mut specs = Vec::new();
        for device in self.devices.iter() {
            if filter::matches(device.value(), filters)? {
                specs.push(device.value().clone());
            }
        }
        Ok(specs)
    }

    /// Applies a sparse update to an existing device.
    ///
    /// Keys the device was not discovered with are skipped with a warning;
    /// the remaining keys of the same diff still apply. An unknown device
    /// rejects the diff entirely and leaves the store untouched.
    pub fn apply_diff(&self, update: &DeviceUpdate) -> Result<(), DeviceNotFound> {
        let mut device = self
            .devices
            .get_mut(&update.id)
            .ok_or_else(|| DeviceNotFound(update.id.clone()))?;

        for (key, state) in &update.attributes {
            match device.attributes.get_mut(key) {
                Some(attribute) => attribute.state = state.clone(),
                None => warn!(
                    device = %update.id,
                    attribute = %key,
                    "Update touches unknown attribute, skipping key"
                ),
            }
        }
        Ok(())
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}
