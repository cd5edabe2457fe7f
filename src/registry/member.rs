//! Member records for the community registry.

use crate::types::DeviceId;

/// One community member in the registry arena.
///
/// A member is identified externally by an opaque address string and
/// internally by its arena index. Members are never deleted; leaving the
/// community only clears the `active` flag so balance history stays
/// attached to a stable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    address: String,
    share_bps: u32,
    active: bool,
    devices: Vec<DeviceId>,
}

impl Member {
    /// Create an active member with no devices attached yet.
    pub fn new(address: impl Into<String>, share_bps: u32) -> Self {
        Member {
            address: address.into(),
            share_bps,
            active: true,
            devices: Vec::new(),
        }
    }

    /// External address of this member.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Ownership share in basis points (10000 = 100%).
    pub fn share_bps(&self) -> u32 {
        self.share_bps
    }

    /// Whether the member currently participates in clearing.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Device ids owned by this member, in attachment order.
    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    /// Mark the member inactive. Devices and share stay untouched.
    pub(crate) fn deactivate(&mut self) {
        self.active = false;
    }

    /// Attach a device to this member.
    pub(crate) fn attach_device(&mut self, device_id: DeviceId) {
        if !self.devices.contains(&device_id) {
            self.devices.push(device_id);
        }
    }

    /// Detach a device from this member, if attached.
    pub(crate) fn detach_device(&mut self, device_id: DeviceId) {
        self.devices.retain(|&id| id != device_id);
    }
}
