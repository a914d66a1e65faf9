//! Single-entry workbook cache with a freshness window.
//!
//! The cache is either empty or holds one fully parsed workbook. An entry is
//! only ever replaced wholesale, never patched.

use super::workbook::Workbook;
use chrono::{DateTime, Local, TimeDelta};
use std::time::Duration;

/// Default freshness window: 30 minutes
pub const DEFAULT_FRESHNESS_SECS: u64 = 1800;

/// A workbook together with the moment it was fetched
#[derive(Debug, Clone, PartialEq)]
pub struct CachedWorkbook {
    /// Parsed workbook
    pub workbook: Workbook,
    /// Fetch time, shown to users as the "updated" stamp
    pub fetched_at: DateTime<Local>,
}

/// Holds the most recently fetched workbook
#[derive(Debug)]
pub struct WorkbookCache {
    entry: Option<CachedWorkbook>,
    window: TimeDelta,
}

impl WorkbookCache {
    /// Creates an empty cache with the given freshness window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            entry: None,
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Returns the entry if it is no older than the freshness window at `now`.
    #[must_use]
    pub fn fresh(&self, now: DateTime<Local>) -> Option<&CachedWorkbook> {
        self.entry
            .as_ref()
            .filter(|entry| now.signed_duration_since(entry.fetched_at) <= self.window)
    }

    /// Returns `true` if [`WorkbookCache::fresh`] would return an entry.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Local>) -> bool {
        self.fresh(now).is_some()
    }

    /// Current entry regardless of age.
    #[must_use]
    pub const fn entry(&self) -> Option<&CachedWorkbook> {
        self.entry.as_ref()
    }

    /// Replaces the entry and restarts the freshness timer.
    pub fn store(&mut self, workbook: Workbook, fetched_at: DateTime<Local>) -> &CachedWorkbook {
        self.entry.insert(CachedWorkbook {
            workbook,
            fetched_at,
        })
    }

    /// Drops the entry so the next section request fetches again.
    /// Returns `true` if there was an entry to drop.
    pub fn invalidate(&mut self) -> bool {
        self.entry.take().is_some()
    }
}

impl Default for WorkbookCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FRESHNESS_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::workbook::Sheet;

    fn sample() -> Workbook {
        Workbook::default().with_sheet("Stock", Sheet::with_stock(&["Name"], &[("Flour", Some(1.0))]))
    }

    #[test]
    fn test_empty_cache_is_stale() {
        let cache = WorkbookCache::default();
        assert!(!cache.is_fresh(Local::now()));
        assert!(cache.entry().is_none());
        assert_eq!(cache.window, TimeDelta::seconds(1800));
    }

    #[test]
    fn test_entry_expires_after_window() {
        let mut cache = WorkbookCache::default();
        let fetched_at = Local::now();
        cache.store(sample(), fetched_at);

        assert!(cache.is_fresh(fetched_at));
        assert!(cache.is_fresh(fetched_at + TimeDelta::seconds(1800)));
        assert!(!cache.is_fresh(fetched_at + TimeDelta::seconds(1801)));
        // Stale entries stay around until replaced or invalidated
        assert!(cache.entry().is_some());
    }

    #[test]
    fn test_store_replaces_entry() {
        let mut cache = WorkbookCache::default();
        let first = Local::now();
        cache.store(Workbook::default(), first);
        let second = first + TimeDelta::seconds(3600);
        let stored = cache.store(sample(), second);

        assert_eq!(stored.fetched_at, second);
        assert_eq!(stored.workbook.sheet_count(), 1);
        assert!(cache.is_fresh(second));
    }

    #[test]
    fn test_invalidate() {
        let mut cache = WorkbookCache::default();
        assert!(!cache.invalidate());

        let now = Local::now();
        cache.store(sample(), now);
        assert!(cache.invalidate());
        assert!(!cache.is_fresh(now));
        assert!(cache.entry().is_none());
    }

    #[test]
    fn test_huge_window_saturates() {
        let cache = WorkbookCache::new(Duration::from_secs(u64::MAX));
        assert_eq!(cache.window, TimeDelta::MAX);
    }
}
