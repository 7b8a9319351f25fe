use serde::{Deserialize, Deserializer, Serialize};

/// What to do when a single cell cannot be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnCellError {
    /// Fail the whole operation with the cell's error.
    Abort,
    /// Leave the cell as it was and carry on.
    #[default]
    KeepOriginal,
    /// Blank the cell to the empty-string null sentinel and carry on.
    MarkInvalid,
}

/// Order of the rows kept by a parallel filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOrder {
    /// Rows appear in the order their verdicts reach the driver.
    #[default]
    Arrival,
    /// Rows keep their input order.
    Source,
}

/// Settings for one parallel operation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelOptions {
    /// Upper bound on worker threads; the pool never exceeds the job count.
    /// A configured value of zero or less falls back to the host's CPU count.
    #[serde(deserialize_with = "worker_bound")]
    pub max_workers: usize,
    pub on_cell_error: OnCellError,
    pub filter_order: FilterOrder,
}

impl Default for ParallelOptions {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            on_cell_error: OnCellError::default(),
            filter_order: FilterOrder::default(),
        }
    }
}

impl ParallelOptions {
    /// Set the worker bound. Zero is ignored and the previous value kept.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        if max_workers > 0 {
            self.max_workers = max_workers;
        }
        self
    }

    pub fn with_on_cell_error(mut self, policy: OnCellError) -> Self {
        self.on_cell_error = policy;
        self
    }

    pub fn with_filter_order(mut self, order: FilterOrder) -> Self {
        self.filter_order = order;
        self
    }

    /// Workers for `jobs` pending jobs: `min(max_workers, jobs)`, at least one.
    pub fn workers_for(&self, jobs: usize) -> usize {
        self.max_workers.min(jobs).max(1)
    }
}

fn worker_bound<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let n = i64::deserialize(deserializer)?;
    Ok(usize::try_from(n)
        .ok()
        .filter(|&n| n > 0)
        .unwrap_or_else(num_cpus::get))
}
