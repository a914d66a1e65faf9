//! Turns a button press into a typed reply.

use super::cache::{CachedWorkbook, WorkbookCache};
use super::sections::{SectionMap, REFRESH_ACTION};
use super::source::WorkbookSource;
use super::workbook::StockRow;
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

/// Outcome of one interaction, rendered into text by the transport layer
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Stock list of a section
    Report {
        /// Sheet display name
        sheet: String,
        /// When the workbook was fetched
        updated_at: DateTime<Local>,
        /// Non-empty data rows in sheet order
        rows: Vec<StockRow>,
    },
    /// Section exists but has no data rows
    Empty {
        /// Sheet display name
        sheet: String,
    },
    /// Button identifier has no section
    NotFound,
    /// Cache was invalidated; data comes with the next section request
    Refreshing,
    /// Loading the spreadsheet failed
    FetchFailed(String),
    /// Section is mapped but the workbook has no such sheet
    SheetMissing {
        /// Expected sheet name
        sheet: String,
    },
}

/// Handles one button press against an explicitly passed cache.
///
/// `refresh` only invalidates. Unknown identifiers touch neither the cache nor
/// the source. A section request fetches at most once, and only when the cache
/// is stale at `now`. A failed fetch leaves the previous entry in place.
pub async fn dispatch<S>(
    cache: &mut WorkbookCache,
    source: &S,
    sections: &SectionMap,
    action: &str,
    now: DateTime<Local>,
) -> Reply
where
    S: WorkbookSource + ?Sized,
{
    if action == REFRESH_ACTION {
        let dropped = cache.invalidate();
        info!(dropped, "Workbook cache invalidated");
        return Reply::Refreshing;
    }

    let Some(sheet) = sections.sheet_for(action) else {
        warn!(action, "Unknown section requested");
        return Reply::NotFound;
    };

    if let Some(cached) = cache.fresh(now) {
        debug!(sheet, "Serving section from cache");
        return section_reply(cached, sheet);
    }

    debug!(sheet, "Workbook cache is stale, fetching");
    match source.fetch().await {
        Ok(workbook) => section_reply(cache.store(workbook, now), sheet),
        Err(e) => Reply::FetchFailed(e.to_string()),
    }
}

fn section_reply(cached: &CachedWorkbook, sheet: &str) -> Reply {
    let Some(table) = cached.workbook.sheet(sheet) else {
        warn!(sheet, "Sheet is missing from the workbook");
        return Reply::SheetMissing {
            sheet: sheet.to_string(),
        };
    };

    let rows = table.stock_rows();
    if rows.is_empty() {
        Reply::Empty {
            sheet: sheet.to_string(),
        }
    } else {
        Reply::Report {
            sheet: sheet.to_string(),
            updated_at: cached.fetched_at,
            rows,
        }
    }
}
