use std::time::Duration;

use moka::future::Cache;

use super::phone_filter::normalize;

/// true  => phone is TAKEN
/// false => phone is AVAILABLE (usually we store only taken)
#[derive(Clone)]
pub struct PhoneCache {
    inner: Cache<String, bool>,
}

impl Default for PhoneCache {
    fn default() -> Self {
        Self::new(500_000, Duration::from_secs(86_400))
    }
}

impl PhoneCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn mark_taken(&self, phone: &str) {
        self.inner.insert(normalize(phone), true).await;
    }

    pub async fn forget(&self, phone: &str) {
        self.inner.invalidate(&normalize(phone)).await;
    }

    pub async fn is_taken(&self, phone: &str) -> bool {
        self.inner.get(&normalize(phone)).await.unwrap_or(false)
    }

    /// Batch mark phones as taken
    pub async fn batch_mark(&self, phones: &[String]) {
        let futures: Vec<_> = phones
            .iter()
            .map(|p| self.inner.insert(normalize(p), true))
            .collect();

        // Await all insertions concurrently
        futures::future::join_all(futures).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn marks_and_forgets() {
        let cache = PhoneCache::default();
        assert!(!cache.is_taken("1").await);
        cache.batch_mark(&["1".to_string(), "2".to_string()]).await;
        assert!(cache.is_taken("1").await);
        assert!(cache.is_taken(" 2 ").await);
        cache.forget("1").await;
        assert!(!cache.is_taken("1").await);
    }
}
