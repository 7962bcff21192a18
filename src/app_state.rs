use std::sync::Arc;

use crate::config;
use crate::db::Store;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub env: Arc<config::Config>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, env: Arc<config::Config>, sessions: SessionStore) -> Self {
        Self { store, env, sessions }
    }
}
