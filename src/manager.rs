use std::sync::Arc;

use crate::backend::{Backend, BackendRegistry};
use crate::protocol::routes::RouteTable;
use crate::users::UserManager;
use crate::Config;

/// Central coordinator handed to every connection.
///
/// Owns the immutable route table, the sorted backend registry and the
/// collaborator handles. Built once at startup and shared via `Arc`;
/// everything inside is read-only, so lookups need no locking.
pub struct Manager {
    config: Arc<Config>,
    users: Arc<dyn UserManager>,
    backends: BackendRegistry,
    routes: RouteTable,
}

impl Manager {
    pub fn new(
        config: Arc<Config>,
        users: Arc<dyn UserManager>,
        backends: Vec<Arc<dyn Backend>>,
    ) -> Self {
        Self {
            config,
            users,
            backends: BackendRegistry::new(backends),
            routes: RouteTable::new(),
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn users(&self) -> &Arc<dyn UserManager> {
        &self.users
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("backends", &self.backends)
            .field("routes", &self.routes.len())
            .finish()
    }
}
