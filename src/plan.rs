//! Declarative cleaning plans: an ordered list of steps plus the execution
//! mode, loadable from YAML or JSON and buildable from compact flag specs
//! such as `age:0` or `salary:1000:9000`.

use crate::clean::{OnCellError, ParallelOptions};
use crate::error::{CleanError, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{info, instrument};

/// One cleaning operation with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Trim,
    ReplaceNulls {
        column: String,
        value: String,
    },
    CleanDates {
        column: String,
        layout: String,
    },
    NormalizeCase {
        column: String,
        #[serde(default)]
        upper: bool,
    },
    CleanWithRegex {
        column: String,
        pattern: String,
        #[serde(default)]
        replacement: String,
    },
    SplitColumn {
        column: String,
        separator: String,
        new_columns: Vec<String>,
    },
    RenameColumn {
        from: String,
        to: String,
    },
    FilterOutliers {
        column: String,
        min: f64,
        max: f64,
    },
}

impl Step {
    /// Parse a compact flag spec. `flag` is the long option name without
    /// dashes: `null-replace`, `date-format`, `case`, `regex`, `split`,
    /// `outlier` or `rename`.
    pub fn parse_flag(flag: &str, spec: &str) -> Result<Self> {
        let invalid = |why: &str| CleanError::InvalidStep(format!("--{flag} {spec:?}: {why}"));
        let (column, rest) = spec
            .split_once(':')
            .filter(|(column, _)| !column.is_empty())
            .ok_or_else(|| invalid("expected column:..."))?;
        let column = column.to_string();

        match flag {
            "null-replace" => Ok(Self::ReplaceNulls {
                column,
                value: rest.to_string(),
            }),
            "date-format" => Ok(Self::CleanDates {
                column,
                layout: rest.to_string(),
            }),
            "case" => match rest.to_lowercase().as_str() {
                "upper" => Ok(Self::NormalizeCase {
                    column,
                    upper: true,
                }),
                "lower" => Ok(Self::NormalizeCase {
                    column,
                    upper: false,
                }),
                _ => Err(invalid("case must be upper or lower")),
            },
            "regex" => {
                let (pattern, replacement) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected column:pattern:replacement"))?;
                Ok(Self::CleanWithRegex {
                    column,
                    pattern: pattern.to_string(),
                    replacement: replacement.to_string(),
                })
            }
            "split" => {
                let (separator, names) = rest
                    .rsplit_once(':')
                    .ok_or_else(|| invalid("expected column:separator:name1,name2"))?;
                let new_columns: Vec<String> = names
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect();
                Ok(Self::SplitColumn {
                    column,
                    separator: separator.to_string(),
                    new_columns,
                })
            }
            "outlier" => {
                let (min, max) = rest
                    .split_once(':')
                    .ok_or_else(|| invalid("expected column:min:max"))?;
                let min = min.trim().parse::<f64>().map_err(|_| invalid("min is not a number"))?;
                let max = max.trim().parse::<f64>().map_err(|_| invalid("max is not a number"))?;
                Ok(Self::FilterOutliers { column, min, max })
            }
            "rename" => Ok(Self::RenameColumn {
                from: column,
                to: rest.to_string(),
            }),
            _ => Err(invalid("unknown flag")),
        }
    }

    /// Apply the step sequentially, with `policy` for per-cell failures.
    pub fn apply(&self, table: &mut Table, policy: OnCellError) -> Result<()> {
        match self {
            Self::Trim => {
                table.trim_columns();
            }
            Self::ReplaceNulls { column, value } => {
                table.replace_nulls(column, value)?;
            }
            Self::CleanDates { column, layout } => {
                table.clean_dates_with_policy(column, layout, policy)?;
            }
            Self::NormalizeCase { column, upper } => {
                table.normalize_case(column, *upper)?;
            }
            Self::CleanWithRegex {
                column,
                pattern,
                replacement,
            } => {
                table.clean_with_regex(column, pattern, replacement)?;
            }
            Self::SplitColumn {
                column,
                separator,
                new_columns,
            } => {
                table.split_column(column, separator, new_columns.as_slice())?;
            }
            Self::RenameColumn { from, to } => {
                table.rename_column(from, to)?;
            }
            Self::FilterOutliers { column, min, max } => {
                table.filter_outliers_with_policy(column, *min, *max, policy)?;
            }
        }
        Ok(())
    }

    /// Apply the step through the worker pool. Structural steps (split,
    /// rename) have no parallel form and run sequentially.
    pub fn apply_parallel(&self, table: &mut Table, options: &ParallelOptions) -> Result<()> {
        match self {
            Self::Trim => {
                table.trim_columns_parallel(options)?;
            }
            Self::ReplaceNulls { column, value } => {
                table.replace_nulls_parallel(column, value, options)?;
            }
            Self::CleanDates { column, layout } => {
                table.clean_dates_parallel(column, layout, options)?;
            }
            Self::NormalizeCase { column, upper } => {
                table.normalize_case_parallel(column, *upper, options)?;
            }
            Self::CleanWithRegex {
                column,
                pattern,
                replacement,
            } => {
                table.clean_with_regex_parallel(column, pattern, replacement, options)?;
            }
            Self::FilterOutliers { column, min, max } => {
                *table = table.filter_outliers_parallel(column, *min, *max, options)?;
            }
            Self::SplitColumn { .. } | Self::RenameColumn { .. } => {
                self.apply(table, options.on_cell_error)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Trim => "trim",
            Self::ReplaceNulls { .. } => "replace_nulls",
            Self::CleanDates { .. } => "clean_dates",
            Self::NormalizeCase { .. } => "normalize_case",
            Self::CleanWithRegex { .. } => "clean_with_regex",
            Self::SplitColumn { .. } => "split_column",
            Self::RenameColumn { .. } => "rename_column",
            Self::FilterOutliers { .. } => "filter_outliers",
        }
    }
}

/// Steps plus how to run them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub options: ParallelOptions,
    /// Overrides the mode's own failure policy (sequential aborts, parallel
    /// follows `options`) when set.
    #[serde(default)]
    pub on_cell_error: Option<OnCellError>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Plan {
    /// Read a plan from `.yaml`/`.yml` or `.json`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(serde_json::from_str(&text)?),
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Ok(serde_yaml::from_str(&text)?)
            }
            _ => Err(CleanError::Plan(format!(
                "unsupported plan file {}",
                path.display()
            ))),
        }
    }

    /// Run every step in order; the first failing step ends the run.
    #[instrument(level = "info", skip_all)]
    pub fn apply(&self, mut table: Table) -> Result<Table> {
        let options = match self.on_cell_error {
            Some(policy) => self.options.clone().with_on_cell_error(policy),
            None => self.options.clone(),
        };
        let policy = self.on_cell_error.unwrap_or(OnCellError::Abort);

        for step in &self.steps {
            if self.parallel {
                step.apply_parallel(&mut table, &options)?;
            } else {
                step.apply(&mut table, policy)?;
            }
            let (rows, cols) = table.shape();
            info!(step = step.name(), rows, cols, "step applied");
        }
        Ok(table)
    }
}
