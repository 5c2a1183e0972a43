//! Per-device replay protection.
//!
//! The guard lives outside the stateless codec. When frames from one device
//! are handled by several workers, route each device to a single owner of
//! the guard rather than sharing it behind a lock.

use std::collections::HashMap;

/// Highest accepted sequence number per device.
#[derive(Debug, Clone, Default)]
pub struct SequenceGuard {
    watermarks: HashMap<u16, u32>,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `sequence` if it is strictly above the device watermark.
    ///
    /// The first frame seen from a device is always accepted. On acceptance
    /// the watermark moves to `sequence`; on rejection it is unchanged.
    pub fn accept(&mut self, device_id: u16, sequence: u32) -> bool {
        match self.watermarks.get_mut(&device_id) {
            Some(watermark) if sequence <= *watermark => {
                tracing::debug!(
                    device_id,
                    sequence,
                    watermark = *watermark,
                    "rejected replayed or reordered frame"
                );
                false
            }
            Some(watermark) => {
                *watermark = sequence;
                true
            }
            None => {
                self.watermarks.insert(device_id, sequence);
                true
            }
        }
    }

    /// Current watermark, or `None` if nothing was accepted from the device.
    pub fn watermark(&self, device_id: u16) -> Option<u32> {
        self.watermarks.get(&device_id).copied()
    }

    /// Forget one device, e.g. after it reports a reboot.
    pub fn reset(&mut self, device_id: u16) -> Option<u32> {
        self.watermarks.remove(&device_id)
    }

    /// Forget every device; used when a session ends.
    pub fn clear(&mut self) {
        self.watermarks.clear();
    }

    /// Number of devices with a watermark.
    pub fn len(&self) -> usize {
        self.watermarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watermarks.is_empty()
    }
}
