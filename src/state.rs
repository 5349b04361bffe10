use std::sync::Arc;

use crate::service::attendance::AttendancePolicy;
use crate::store::Store;
use crate::utils::username_cache::UsernameCache;

/// Shared by every worker through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub usernames: UsernameCache,
    pub policy: AttendancePolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, usernames: UsernameCache, policy: AttendancePolicy) -> Self {
        Self {
            store,
            usernames,
            policy,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
