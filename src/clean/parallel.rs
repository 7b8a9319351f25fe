//! Worker-pool variants of the cleaning operations.
//!
//! Three job shapes share [`WorkerPool`]: one job per row (trim), one job per
//! selected cell (column-targeted rewrites) and one verdict job per row
//! (filter). Cell jobs own the cell they rewrite, so any number of target
//! columns can run in one call without two workers touching the same value.
//! Failures follow [`ParallelOptions::on_cell_error`].

use crate::clean::cell::{self, on_failure, CellFix, Verdict};
use crate::clean::options::{FilterOrder, ParallelOptions};
use crate::clean::pool::WorkerPool;
use crate::error::{CleanError, Result};
use crate::table::{ColumnType, Table};
use crate::util::{self, DateLayout};
use std::mem;
use tracing::{debug, instrument, warn};

/// A table transformation run by the batch combinator.
pub type Processor = Box<dyn Fn(Table) -> Result<Table> + Send + Sync>;

/// One cell moved out of the grid.
struct CellJob {
    row: usize,
    col: usize,
    value: String,
}

struct CellDone {
    row: usize,
    col: usize,
    original: String,
    result: Result<String>,
}

impl Table {
    /// Row-parallel trim. Output order matches input order.
    #[instrument(level = "debug", skip_all)]
    pub fn trim_columns_parallel(&mut self, options: &ParallelOptions) -> Result<&mut Self> {
        let pool = WorkerPool::new(options, self.rows.len())?;
        let jobs: Vec<(usize, Vec<String>)> =
            mem::take(&mut self.rows).into_iter().enumerate().collect();
        let row_count = jobs.len();

        let done = pool.run(jobs, |(i, row)| {
            let trimmed: Vec<String> = row.iter().map(|c| util::trim_space(c)).collect();
            (i, trimmed)
        });

        let mut rows = vec![Vec::new(); row_count];
        for (i, row) in done {
            rows[i] = row;
        }
        self.rows = rows;
        Ok(self)
    }

    #[instrument(level = "debug", skip(self, value, options))]
    pub fn replace_nulls_parallel(
        &mut self,
        column: &str,
        value: &str,
        options: &ParallelOptions,
    ) -> Result<&mut Self> {
        self.map_cells_parallel(&[column], options, cell::replace_null(value))
    }

    #[instrument(level = "debug", skip(self, options))]
    pub fn normalize_case_parallel(
        &mut self,
        column: &str,
        to_upper: bool,
        options: &ParallelOptions,
    ) -> Result<&mut Self> {
        self.map_cells_parallel(&[column], options, cell::normalize_case(to_upper))
    }

    #[instrument(level = "debug", skip(self, replacement, options))]
    pub fn clean_with_regex_parallel(
        &mut self,
        column: &str,
        pattern: &str,
        replacement: &str,
        options: &ParallelOptions,
    ) -> Result<&mut Self> {
        self.require_column(column)?;
        let re = util::compile_regex(pattern)?;
        self.map_cells_parallel(&[column], options, cell::regex_replace(&re, replacement))
    }

    /// Cell-parallel date cleaning. With the default options an unreadable
    /// cell keeps its value and the call still succeeds; the sequential
    /// [`Table::clean_dates`] aborts instead.
    #[instrument(level = "debug", skip(self, options))]
    pub fn clean_dates_parallel(
        &mut self,
        column: &str,
        layout: &str,
        options: &ParallelOptions,
    ) -> Result<&mut Self> {
        self.require_column(column)?;
        let layout = DateLayout::parse(layout)?;
        self.map_cells_parallel(&[column], options, cell::reformat_date(column, &layout))?;
        self.column_types.insert(column.to_string(), ColumnType::Date);
        Ok(self)
    }

    /// Rewrite every cell of `columns` with `f(row index, cell)` on the pool,
    /// one job per `(row, column)`. Under `Abort` every cell is still written
    /// back before the error of the lowest failing row is returned.
    pub fn map_cells_parallel<F>(
        &mut self,
        columns: &[&str],
        options: &ParallelOptions,
        f: F,
    ) -> Result<&mut Self>
    where
        F: Fn(usize, &str) -> Result<String> + Sync,
    {
        let cols = self.resolve_columns(columns)?;
        let pool = WorkerPool::new(options, self.rows.len() * cols.len())?;

        let mut jobs = Vec::with_capacity(self.rows.len() * cols.len());
        for (row, cells) in self.rows.iter_mut().enumerate() {
            for &col in &cols {
                jobs.push(CellJob {
                    row,
                    col,
                    value: mem::take(&mut cells[col]),
                });
            }
        }

        let done = pool.run(jobs, |job| CellDone {
            row: job.row,
            col: job.col,
            result: f(job.row, &job.value),
            original: job.value,
        });

        let policy = options.on_cell_error;
        let mut skipped = 0usize;
        let mut first_error: Option<(usize, CleanError)> = None;
        for CellDone {
            row,
            col,
            original,
            result,
        } in done
        {
            let slot = &mut self.rows[row][col];
            let err = match result {
                Ok(value) => {
                    *slot = value;
                    continue;
                }
                Err(err) => err,
            };
            skipped += 1;
            match on_failure(policy, err) {
                Ok(CellFix::Keep) => *slot = original,
                // the slot was emptied when the job took the value
                Ok(CellFix::Blank) => {}
                Err(err) => {
                    *slot = original;
                    if first_error.as_ref().map_or(true, |(r, _)| row < *r) {
                        first_error = Some((row, err));
                    }
                }
            }
        }

        if let Some((_, err)) = first_error {
            return Err(err);
        }
        if skipped > 0 {
            warn!(?columns, skipped, ?policy, "cells left unconverted");
        }
        Ok(self)
    }

    /// Filter-parallel outlier removal into a new table; `self` is untouched.
    ///
    /// With [`FilterOrder::Arrival`] (the default) rows are appended in the
    /// order verdicts reach the driver, so the result is the same set of rows
    /// as [`Table::filter_outliers`] but not necessarily in the same order.
    #[instrument(level = "debug", skip(self, options))]
    pub fn filter_outliers_parallel(
        &self,
        column: &str,
        min: f64,
        max: f64,
        options: &ParallelOptions,
    ) -> Result<Table> {
        let col = self.require_column(column)?;
        let pool = WorkerPool::new(options, self.rows.len())?;
        let policy = options.on_cell_error;

        let jobs: Vec<(usize, &str)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i, row[col].as_str()))
            .collect();
        let verdicts = pool.run(jobs, |(i, value)| {
            (i, cell::outlier_verdict(i, column, value, min, max, policy))
        });

        let mut kept: Vec<(usize, bool)> = Vec::new();
        let mut first_error: Option<(usize, CleanError)> = None;
        for (i, verdict) in verdicts {
            match verdict {
                Ok(Verdict::Keep) => kept.push((i, false)),
                Ok(Verdict::KeepBlanked) => kept.push((i, true)),
                Ok(Verdict::Drop) => {}
                Err(err) => {
                    if first_error.as_ref().map_or(true, |(r, _)| i < *r) {
                        first_error = Some((i, err));
                    }
                }
            }
        }
        if let Some((_, err)) = first_error {
            return Err(err);
        }

        if options.filter_order == FilterOrder::Source {
            kept.sort_unstable_by_key(|(i, _)| *i);
        }
        let rows = kept
            .into_iter()
            .map(|(i, blank)| {
                let mut row = self.rows[i].clone();
                if blank {
                    row[col].clear();
                }
                row
            })
            .collect::<Vec<_>>();
        debug!(column, before = self.rows.len(), after = rows.len(), "outliers filtered");

        Ok(Table {
            headers: self.headers.clone(),
            rows,
            column_types: self.column_types.clone(),
        })
    }

    /// Run every processor concurrently on its own deep copy of `self`.
    ///
    /// Fails with the error of the lowest-indexed failing processor. On
    /// success only the last processor's table is returned; the outputs of
    /// the others are discarded. An empty list yields a copy of `self`.
    #[instrument(level = "debug", skip_all, fields(processors = processors.len()))]
    pub fn batch_process_parallel(
        &self,
        processors: &[Processor],
        options: &ParallelOptions,
    ) -> Result<Table> {
        Ok(self
            .batch_collect_parallel(processors, options)?
            .pop()
            .unwrap_or_else(|| self.clone()))
    }

    /// Like [`Table::batch_process_parallel`] but keeps every output, in
    /// processor order.
    #[instrument(level = "debug", skip_all, fields(processors = processors.len()))]
    pub fn batch_collect_parallel(
        &self,
        processors: &[Processor],
        options: &ParallelOptions,
    ) -> Result<Vec<Table>> {
        let pool = WorkerPool::new(options, processors.len())?;
        let jobs: Vec<(usize, &Processor)> = processors.iter().enumerate().collect();
        let mut done = pool.run(jobs, |(i, processor)| (i, processor(self.clone())));
        done.sort_unstable_by_key(|(i, _)| *i);
        done.into_iter().map(|(_, result)| result).collect()
    }
}
