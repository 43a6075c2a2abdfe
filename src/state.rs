use crate::auth::SessionStore;
use crate::catalog::CatalogService;
use crate::config::Config;
use crate::contact::ContactLog;
use crate::registry::UserRegistry;
use crate::storage::ObjectStore;
use std::sync::Arc;

/// Shared application state. Everything here is established once at startup
/// and read-only afterwards, except the session token table.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<CatalogService>,
    pub registry: Arc<UserRegistry>,
    pub contacts: Arc<ContactLog>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let registry_path = config.registry_path.clone();
        Self {
            config: Arc::new(config),
            catalog: Arc::new(CatalogService::new(store.clone())),
            registry: Arc::new(UserRegistry::new(store.clone(), registry_path)),
            contacts: Arc::new(ContactLog::new(store)),
            sessions: SessionStore::new(),
        }
    }
}
