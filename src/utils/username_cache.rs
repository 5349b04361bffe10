use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;

use crate::error::AppResult;
use crate::store::Store;

/// Usernames known to be taken. A hit is authoritative enough to reject a
/// registration early; a miss always falls through to the store.
#[derive(Clone)]
pub struct UsernameCache {
    inner: Cache<String, ()>,
}

impl UsernameCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Mark a single username as taken
    pub async fn mark_taken(&self, username: &str) {
        self.inner.insert(username.to_lowercase(), ()).await;
    }

    /// Check if username is taken
    pub async fn is_taken(&self, username: &str) -> bool {
        self.inner.contains_key(&username.to_lowercase())
    }

    pub async fn forget(&self, username: &str) {
        self.inner.invalidate(&username.to_lowercase()).await;
    }

    /// Batch mark usernames as taken
    async fn batch_mark(&self, usernames: &[String]) {
        let futures: Vec<_> = usernames.iter().map(|u| self.mark_taken(u)).collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }

    /// Load usernames of recently active users into the cache, in batches.
    pub async fn warmup(
        &self,
        store: Arc<dyn Store>,
        days: u32,
        batch_size: usize,
    ) -> AppResult<usize> {
        let since = Utc::now() - chrono::Duration::days(i64::from(days));
        let usernames = store.usernames_active_since(since).await?;

        for batch in usernames.chunks(batch_size.max(1)) {
            self.batch_mark(batch).await;
        }

        tracing::info!(
            total = usernames.len(),
            days,
            "Username cache warmup complete"
        );
        Ok(usernames.len())
    }
}

impl Default for UsernameCache {
    fn default() -> Self {
        // 24h TTL
        Self::new(500_000, Duration::from_secs(86400))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::model::user::NewUser;
    use crate::store::MemoryStore;

    #[actix_web::test]
    async fn lookups_ignore_case() {
        let cache = UsernameCache::default();
        cache.mark_taken("Alice").await;

        assert!(cache.is_taken("alice").await);
        assert!(cache.is_taken("ALICE").await);
        assert!(!cache.is_taken("bob").await);

        cache.forget("aLiCe").await;
        assert!(!cache.is_taken("alice").await);
    }

    #[actix_web::test]
    async fn warmup_loads_recent_logins_only() {
        let store = Arc::new(MemoryStore::new());
        for name in ["recent", "dormant"] {
            store
                .insert_user(NewUser {
                    username: name.into(),
                    email: format!("{name}@example.com"),
                    name: name.into(),
                    role: Role::Employee,
                    department: None,
                    position: None,
                    employee_id: None,
                    qr_code: None,
                    join_date: Utc::now().date_naive(),
                    password_hash: None,
                })
                .await
                .unwrap();
        }
        let recent = store.find_user_by_username("recent").await.unwrap().unwrap();
        store.touch_last_login(recent.id, Utc::now()).await.unwrap();

        let cache = UsernameCache::default();
        let loaded = cache.warmup(store, 30, 10).await.unwrap();

        assert_eq!(loaded, 1);
        assert!(cache.is_taken("recent").await);
        assert!(!cache.is_taken("dormant").await);
    }
}
