pub mod usage_store;

pub use usage_store::{FileUsageStore, MemoryUsageStore, UsageStore, USAGE_KEY};
