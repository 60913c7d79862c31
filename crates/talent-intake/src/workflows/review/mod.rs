//! Admin review board: status tabs, search, optimistic status changes, and CSV export.

pub mod board;
pub mod export;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use board::{ReviewBoard, StatusCounts, StatusFilter};
pub use export::{export_file_name, write_csv, ExportError, EXPORT_HEADERS};
pub use router::{review_router, ReviewApi};
pub use service::{CsvExport, ReviewError, ReviewListing, ReviewQuery, ReviewService};
