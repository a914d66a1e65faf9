//! Shared entry point used by the transport handlers.

use super::cache::WorkbookCache;
use super::dispatcher::{dispatch, Reply};
use super::sections::{SectionMap, REFRESH_ACTION};
use super::source::WorkbookSource;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::warn;

/// Owns the workbook cache and serializes access to it.
///
/// The lock is held across a refetch, so concurrent requests that find the
/// cache stale trigger a single fetch and then read the new entry. Unknown
/// buttons are answered without the lock. `refresh` does take it: a press
/// during a refetch waits and then drops the entry that refetch stored.
pub struct InventoryService {
    source: Arc<dyn WorkbookSource>,
    sections: SectionMap,
    cache: Mutex<WorkbookCache>,
}

impl InventoryService {
    /// Creates a service with an empty cache.
    #[must_use]
    pub fn new(source: Arc<dyn WorkbookSource>, sections: SectionMap, freshness: Duration) -> Self {
        Self {
            source,
            sections,
            cache: Mutex::new(WorkbookCache::new(freshness)),
        }
    }

    /// Section mapping used for the menu.
    #[must_use]
    pub const fn sections(&self) -> &SectionMap {
        &self.sections
    }

    /// Handles a button press at the current wall-clock time.
    pub async fn handle(&self, action: &str) -> Reply {
        self.handle_at(action, Local::now()).await
    }

    /// Handles a button press as if it happened at `now`.
    pub async fn handle_at(&self, action: &str, now: DateTime<Local>) -> Reply {
        if action != REFRESH_ACTION && self.sections.sheet_for(action).is_none() {
            warn!(action, "Unknown section requested");
            return Reply::NotFound;
        }
        let mut cache = self.cache.lock().await;
        dispatch(&mut cache, self.source.as_ref(), &self.sections, action, now).await
    }

    /// Returns `true` if a workbook is cached and fresh at `now`.
    pub async fn is_fresh_at(&self, now: DateTime<Local>) -> bool {
        self.cache.lock().await.is_fresh(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::source::MockWorkbookSource;
    use crate::inventory::source::FetchError;
    use crate::inventory::workbook::{Sheet, Workbook};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Source whose fetch hangs until the test releases it
    struct GatedSource {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl WorkbookSource for GatedSource {
        async fn fetch(&self) -> Result<Workbook, FetchError> {
            self.gate.notified().await;
            Ok(Workbook::default())
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let mut source = MockWorkbookSource::new();
        source.expect_fetch().times(1).returning(|| {
            Ok(Workbook::default().with_sheet(
                "Сырьё Powerrise",
                Sheet::with_stock(&["Name"], &[("Flour", Some(1.0))]),
            ))
        });
        let service = Arc::new(InventoryService::new(
            Arc::new(source),
            SectionMap::default(),
            Duration::from_secs(1800),
        ));

        let now = Local::now();
        let (a, b) = tokio::join!(
            service.handle_at("raw_powerrise", now),
            service.handle_at("raw_powerrise", now)
        );

        assert_eq!(a, b);
        assert!(service.is_fresh_at(now).await);
    }

    #[tokio::test]
    async fn test_unknown_button_does_not_wait_for_refetch() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(InventoryService::new(
            Arc::new(GatedSource { gate: gate.clone() }),
            SectionMap::default(),
            Duration::from_secs(1800),
        ));
        let now = Local::now();

        let fetching = tokio::spawn({
            let service = service.clone();
            async move { service.handle_at("raw_powerrise", now).await }
        });
        while service.cache.try_lock().is_ok() {
            tokio::task::yield_now().await;
        }

        let reply = tokio::time::timeout(Duration::from_secs(1), service.handle_at("bogus", now))
            .await
            .expect("unknown button must not wait for the cache lock");
        assert_eq!(reply, Reply::NotFound);

        gate.notify_one();
        let fetched = fetching.await.expect("fetch task");
        assert_eq!(
            fetched,
            Reply::SheetMissing {
                sheet: "Сырьё Powerrise".to_string()
            }
        );
    }
}
