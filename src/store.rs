// Process-wide single-slot store for the most recent cropped avatar.

use std::sync::{Arc, Mutex};

use crate::crop::CroppedImage;

/// Single-slot holder for the most recent [`CroppedImage`].
///
/// Constructed once by the host view and handed to consumers; clones
/// share the same slot. Writers fully replace the prior value
/// (last write wins), and the content never outlives the process.
#[derive(Clone, Default)]
pub struct ResultStore {
    slot: Arc<Mutex<Option<CroppedImage>>>,
}

impl ResultStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored result.
    pub fn set(&self, image: CroppedImage) {
        *self.slot.lock().unwrap() = Some(image);
    }

    /// Snapshot of the current result, if any.
    pub fn get(&self) -> Option<CroppedImage> {
        self.slot.lock().unwrap().clone()
    }

    /// Drop the stored result.
    pub fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap().is_none()
    }
}
