use std::sync::Arc;

use cas_store::ObjectStore;

use crate::notify::CallbackNotifier;

/// Shared per-request state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub notifier: CallbackNotifier,
}

impl AppState {
    pub fn new(store: Arc<dyn ObjectStore>, notifier: CallbackNotifier) -> Self {
        Self { store, notifier }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
