//! Cleaning operations over a [`Table`](crate::table::Table), in two
//! execution modes that read and write the same table shape.

mod cell;
pub mod options;
pub mod parallel;
pub mod pool;
mod sequential;

pub use options::{FilterOrder, OnCellError, ParallelOptions};
pub use parallel::Processor;
pub use pool::WorkerPool;
