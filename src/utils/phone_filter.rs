use std::sync::{PoisonError, RwLock};

use autoscale_cuckoo_filter::CuckooFilter;

/// Expected capacity and false-positive rate.
/// Tune these based on real user counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

#[inline]
pub fn normalize(phone: &str) -> String {
    phone.trim().to_string()
}

/// Probabilistic set of registered phones. A miss is authoritative, a hit
/// has to be confirmed elsewhere.
pub struct PhoneFilter {
    inner: RwLock<CuckooFilter<String>>,
}

impl Default for PhoneFilter {
    fn default() -> Self {
        Self {
            inner: RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)),
        }
    }
}

impl PhoneFilter {
    /// Check if a phone might be registered (false positives possible)
    pub fn might_exist(&self, phone: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&normalize(phone))
    }

    pub fn insert(&self, phone: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(&normalize(phone));
    }

    pub fn remove(&self, phone: &str) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize(phone));
    }

    /// Insert a batch of phones under one write lock
    pub fn insert_batch(&self, phones: &[String]) {
        let mut filter = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for phone in phones {
            filter.add(&normalize(phone));
        }
    }
}
