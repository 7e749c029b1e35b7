//! Services Layer
//!
//! Business logic shared between whatever surfaces host this crate. The
//! services return plain payload structs and structured errors; routing,
//! serialization, and status mapping belong to the caller.
//!
//! # Services
//!
//! - `RefreshService` - Batch recomputation of signal records
//! - `ReportService` - Ranked return reports and stock listings

pub mod refresh_service;
pub mod report_service;

// Re-export commonly used types and services
pub use refresh_service::{RefreshHandle, RefreshOptions, RefreshService, RefreshSummary};
pub use report_service::{
    DateRange, ReportRow, ReportService, SingleStockReport, StockInfo, StockListing,
    StockReturnSummary, StocksReport,
};
