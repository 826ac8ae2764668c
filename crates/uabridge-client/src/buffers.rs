// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared IO blob pair.
//!
//! Exchanges the current write and read blobs between the bridge task and an
//! arbitrary number of caller threads. One mutex guards both blobs; every
//! critical section is a bounded copy. No I/O or codec work ever runs under
//! the lock, so callers can never block longer than a memcpy.

use parking_lot::Mutex;

use uabridge_core::StatusCode;

// =============================================================================
// SharedIo
// =============================================================================

/// Thread-safe exchange of the current write/read blobs.
///
/// Copy-in/copy-out semantics: callers never receive a reference into the
/// live buffers. A zero-length blob is a valid not-yet-populated state,
/// distinguishable from any error status.
///
/// # Examples
///
/// ```
/// use uabridge_client::SharedIo;
/// use uabridge_core::StatusCode;
///
/// let io = SharedIo::new();
/// let previous = io.set_outputs(&[1, 2, 3]);
/// assert_eq!(previous, StatusCode::GOOD); // no write attempted yet
///
/// let (outputs, _) = io.get_outputs();
/// assert_eq!(outputs, vec![1, 2, 3]);
/// ```
#[derive(Debug, Default)]
pub struct SharedIo {
    slots: Mutex<IoSlots>,
}

#[derive(Debug, Default)]
struct IoSlots {
    /// Blob transmitted to the server each cycle.
    outputs: Vec<u8>,

    /// Blob last received from the server.
    inputs: Vec<u8>,

    /// Status of the last cyclic write.
    write_status: StatusCode,

    /// Status of the last cyclic read.
    read_status: StatusCode,
}

impl SharedIo {
    /// Creates an empty blob pair.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the write blob wholesale.
    ///
    /// Returns the status of the *previous* cyclic write, not of this call.
    /// Callers use it to detect whether their last value was actually
    /// transmitted, accepting one cycle of staleness.
    pub fn set_outputs(&self, data: &[u8]) -> StatusCode {
        let mut slots = self.slots.lock();
        slots.outputs.clear();
        slots.outputs.extend_from_slice(data);
        slots.write_status
    }

    /// Copies out the current read blob and the last read status.
    pub fn get_inputs(&self) -> (Vec<u8>, StatusCode) {
        let slots = self.slots.lock();
        (slots.inputs.clone(), slots.read_status)
    }

    /// Copies out the current write blob and the last write status.
    pub fn get_outputs(&self) -> (Vec<u8>, StatusCode) {
        let slots = self.slots.lock();
        (slots.outputs.clone(), slots.write_status)
    }

    /// Copies out the write blob for transmission (bridge task only).
    pub(crate) fn outputs_snapshot(&self) -> Vec<u8> {
        self.slots.lock().outputs.clone()
    }

    /// Stores a freshly received read blob (bridge task only).
    pub(crate) fn store_inputs(&self, data: Vec<u8>) {
        self.slots.lock().inputs = data;
    }

    /// Records the status of the last cyclic write (bridge task only).
    pub(crate) fn set_write_status(&self, status: StatusCode) {
        self.slots.lock().write_status = status;
    }

    /// Records the status of the last cyclic read (bridge task only).
    pub(crate) fn set_read_status(&self, status: StatusCode) {
        self.slots.lock().read_status = status;
    }

    /// Seeds both blobs with the initial values read at discovery time
    /// (bridge task only). Keeps an already-set outputs blob: a caller may
    /// have staged a value before cyclic IO came up.
    pub(crate) fn seed(&self, outputs: Vec<u8>, inputs: Vec<u8>) {
        let mut slots = self.slots.lock();
        if slots.outputs.is_empty() {
            slots.outputs = outputs;
        }
        slots.inputs = inputs;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_outputs_returns_previous_write_status() {
        let io = SharedIo::new();
        assert_eq!(io.set_outputs(&[1]), StatusCode::GOOD);

        io.set_write_status(StatusCode::BAD_CONNECTION_CLOSED);
        assert_eq!(io.set_outputs(&[2]), StatusCode::BAD_CONNECTION_CLOSED);

        io.set_write_status(StatusCode::GOOD);
        assert_eq!(io.set_outputs(&[3]), StatusCode::GOOD);
    }

    #[test]
    fn test_get_after_set_observes_new_blob() {
        let io = SharedIo::new();
        io.set_outputs(&[1, 2, 3]);
        assert_eq!(io.get_outputs().0, vec![1, 2, 3]);

        // Replacement is wholesale, old content fully discarded.
        io.set_outputs(&[9]);
        assert_eq!(io.get_outputs().0, vec![9]);
    }

    #[test]
    fn test_empty_blob_is_valid_state() {
        let io = SharedIo::new();
        io.set_read_status(StatusCode::UNCERTAIN_INITIAL_VALUE);

        let (inputs, status) = io.get_inputs();
        assert!(inputs.is_empty());
        assert_eq!(status, StatusCode::UNCERTAIN_INITIAL_VALUE);
    }

    #[test]
    fn test_seed_keeps_staged_outputs() {
        let io = SharedIo::new();
        io.set_outputs(&[7, 7]);
        io.seed(vec![0, 0, 0], vec![1, 1, 1]);

        assert_eq!(io.get_outputs().0, vec![7, 7]);
        assert_eq!(io.get_inputs().0, vec![1, 1, 1]);

        let fresh = SharedIo::new();
        fresh.seed(vec![0, 0], vec![1, 1]);
        assert_eq!(fresh.get_outputs().0, vec![0, 0]);
    }

    #[test]
    fn test_concurrent_access_is_consistent() {
        use std::sync::Arc;

        let io = Arc::new(SharedIo::new());
        let writer = {
            let io = Arc::clone(&io);
            std::thread::spawn(move || {
                for i in 0..1000u32 {
                    let b = (i % 251) as u8;
                    io.set_outputs(&[b; 32]);
                }
            })
        };
        let reader = {
            let io = Arc::clone(&io);
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    let (blob, _) = io.get_outputs();
                    if !blob.is_empty() {
                        // Never a torn mix of old and new bytes.
                        assert!(blob.iter().all(|b| *b == blob[0]));
                        assert_eq!(blob.len(), 32);
                    }
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
    }
}
