//! Spreadsheet loading, caching and section lookup.
//!
//! Transport-agnostic: nothing here knows about Telegram.

/// Single-entry workbook cache
pub mod cache;
/// Button press handling
pub mod dispatcher;
/// Button-to-sheet mapping
pub mod sections;
/// Cache owner shared by handlers
pub mod service;
/// Spreadsheet download
pub mod source;
/// Workbook model and xlsx parsing
pub mod workbook;

pub use cache::{CachedWorkbook, WorkbookCache};
pub use dispatcher::{dispatch, Reply};
pub use sections::{Section, SectionMap, REFRESH_ACTION};
pub use service::InventoryService;
pub use source::{FetchError, WorkbookSource, YandexDiskSource};
pub use workbook::{Cell, Quantity, Sheet, StockRow, Workbook};
