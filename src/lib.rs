#![deny(missing_docs)]
//! Stock bot library.
//!
//! Telegram menu bot that shows inventory figures from a spreadsheet shared
//! on Yandex Disk.

/// Telegram handlers and views.
pub mod bot;
/// Configuration management.
pub mod config;
/// Spreadsheet loading, caching and section lookup.
pub mod inventory;
/// Telegram runtime entrypoint.
pub mod runner;
