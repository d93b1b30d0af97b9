//! Latest detection set shared between the capture loop and API handlers.
//!
//! The writer builds a complete `Vec<Detection>` outside the lock and swaps it in
//! as a new snapshot. Readers take the lock only long enough to clone the `Arc`,
//! so a reader never sees a mix of two frames and never waits on detection work.

use std::sync::{Arc, PoisonError, RwLock};

use crate::detect::Detection;

/// Immutable detection set for one processed frame.
pub type Snapshot = Arc<[Detection]>;

#[derive(Debug)]
pub struct DetectionStore {
    current: RwLock<Snapshot>,
}

impl DetectionStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Replace the current set with `detections`.
    pub fn publish(&self, detections: Vec<Detection>) {
        let snapshot: Snapshot = Arc::from(detections);
        // A poisoned lock still guards a whole snapshot; overwrite it.
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    pub fn clear(&self) {
        self.publish(Vec::new());
    }

    /// The most recently published set. Reading has no side effects.
    pub fn snapshot(&self) -> Snapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for DetectionStore {
    fn default() -> Self {
        Self::new()
    }
}
