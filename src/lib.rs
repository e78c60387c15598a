//! Sheetwatch - keep a CSV export in sync with an order spreadsheet.

pub mod config;
pub mod convert;
pub mod display;
pub mod matcher;
pub mod pipeline;
pub mod watcher;
