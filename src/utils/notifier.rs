//! Change notifier that keeps every signal, for tests and demos

use std::sync::{Arc, Mutex};

use crate::traits::ChangeNotifier;
use crate::types::ResourceChange;

/// Records every change it is notified of
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    changes: Arc<Mutex<Vec<ResourceChange>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Changes received so far, oldest first
    pub fn changes(&self) -> Vec<ResourceChange> {
        match self.changes.lock() {
            Ok(changes) => changes.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn notify(&self, change: &ResourceChange) {
        let mut changes = match self.changes.lock() {
            Ok(changes) => changes,
            Err(poisoned) => poisoned.into_inner(),
        };
        changes.push(change.clone());
    }
}
