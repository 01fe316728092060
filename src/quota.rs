use tracing::{error, info, warn};

use crate::storage::UsageStore;

/// Submissions allowed before the client is asked to upgrade
pub const DEFAULT_QUOTA_LIMIT: u64 = 3;

/// Gates submissions on the persisted usage counter
pub struct QuotaGuard<S> {
    store: S,
    limit: u64,
}

impl<S: UsageStore> QuotaGuard<S> {
    pub fn new(store: S, limit: u64) -> Self {
        Self { store, limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Current usage. A counter that cannot be read counts as zero so a
    /// damaged file never locks the user out.
    pub fn usage(&self) -> u64 {
        match self.store.read() {
            Ok(count) => count,
            Err(e) => {
                warn!("Usage counter unreadable, treating as 0: {}", e);
                0
            }
        }
    }

    /// Whether another submission may go ahead.
    pub fn check_and_maybe_block(&self) -> bool {
        let used = self.usage();
        let allowed = used < self.limit;
        if !allowed {
            info!("Quota reached: {}/{} submissions used", used, self.limit);
        }
        allowed
    }

    /// Count one successful submission. Returns the new total.
    pub fn record_usage(&self) -> u64 {
        let next = self.usage().saturating_add(1);
        if let Err(e) = self.store.write(next) {
            error!("Failed to persist usage counter ({}): {}", next, e);
        }
        next
    }
}
