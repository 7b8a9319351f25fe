//! Tabular data cleaning over an in-memory string table.
//!
//! A [`Table`] holds headers, rows of string cells and per-column type
//! tags. Cleaning operations come in a sequential form and a parallel form
//! driven by a bounded worker pool; a [`Plan`] strings steps together.

pub mod clean;
pub mod error;
pub mod plan;
pub mod table;
pub mod util;

pub use clean::{FilterOrder, OnCellError, ParallelOptions, Processor, WorkerPool};
pub use error::{CleanError, Result};
pub use plan::{Plan, Step};
pub use table::{ColumnType, Table};
