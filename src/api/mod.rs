pub mod attendance;
pub mod leave_request;
pub mod training;
pub mod users;

use serde::Serialize;

use crate::service::bulk::BulkSummary;

/// Bulk endpoints answer 200 even when items failed; callers inspect `failed`.
#[derive(Serialize)]
pub struct BulkResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub summary: BulkSummary<T>,
}

impl<T> From<BulkSummary<T>> for BulkResponse<T> {
    fn from(summary: BulkSummary<T>) -> Self {
        Self {
            success: true,
            summary,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use actix_web::web::Data;

    use crate::auth::jwt::JwtIdentity;
    use crate::model::role::Role;
    use crate::model::user::User;
    use crate::service::attendance::AttendancePolicy;
    use crate::service::fixtures::seed_user;
    use crate::state::AppState;
    use crate::store::MemoryStore;
    use crate::utils::username_cache::UsernameCache;
    use std::sync::Arc;

    pub struct Harness {
        pub store: Arc<MemoryStore>,
        pub state: Data<AppState>,
        pub identity: Data<JwtIdentity>,
    }

    impl Harness {
        pub fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let state = AppState::new(
                store.clone(),
                UsernameCache::default(),
                AttendancePolicy::default(),
            );
            Self {
                store,
                state: Data::new(state),
                identity: Data::new(JwtIdentity::new("test-secret", 900, 3600)),
            }
        }

        pub async fn user(&self, username: &str, role: Role) -> (User, String) {
            let user = seed_user(&self.store, username, role).await;
            let token = self.identity.access_token(&user).unwrap();
            (user, format!("Bearer {token}"))
        }
    }
}
