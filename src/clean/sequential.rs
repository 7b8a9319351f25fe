//! Single-threaded operations. These are the baseline semantics: fail-fast,
//! with no rollback of rows rewritten before the failing one.

use crate::clean::cell::{self, on_failure, CellFix, Verdict};
use crate::clean::options::OnCellError;
use crate::error::{CleanError, Result};
use crate::table::{ColumnType, Table};
use crate::util::{self, DateLayout};
use std::mem;
use tracing::{debug, instrument, warn};

impl Table {
    /// Trim leading and trailing whitespace from every cell.
    #[instrument(level = "debug", skip(self))]
    pub fn trim_columns(&mut self) -> &mut Self {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                *cell = util::trim_space(cell);
            }
        }
        self
    }

    /// Replace every empty cell in `column` with `value`.
    #[instrument(level = "debug", skip(self, value))]
    pub fn replace_nulls(&mut self, column: &str, value: &str) -> Result<&mut Self> {
        self.map_cells(&[column], OnCellError::Abort, cell::replace_null(value))
    }

    /// Upper- or lower-case every cell in `column`.
    #[instrument(level = "debug", skip(self))]
    pub fn normalize_case(&mut self, column: &str, to_upper: bool) -> Result<&mut Self> {
        self.map_cells(&[column], OnCellError::Abort, cell::normalize_case(to_upper))
    }

    /// Replace every match of `pattern` in `column`; `$1` / `${name}` expand.
    #[instrument(level = "debug", skip(self, replacement))]
    pub fn clean_with_regex(
        &mut self,
        column: &str,
        pattern: &str,
        replacement: &str,
    ) -> Result<&mut Self> {
        self.require_column(column)?;
        let re = util::compile_regex(pattern)?;
        self.map_cells(
            &[column],
            OnCellError::Abort,
            cell::regex_replace(&re, replacement),
        )
    }

    /// Reformat every non-empty cell of `column` to `layout`, aborting on the
    /// first cell no known layout can read. Rows before it stay reformatted.
    pub fn clean_dates(&mut self, column: &str, layout: &str) -> Result<&mut Self> {
        self.clean_dates_with_policy(column, layout, OnCellError::Abort)
    }

    /// [`Table::clean_dates`] with an explicit policy for unreadable cells.
    /// The column is tagged as a date column when the call succeeds.
    #[instrument(level = "debug", skip(self))]
    pub fn clean_dates_with_policy(
        &mut self,
        column: &str,
        layout: &str,
        policy: OnCellError,
    ) -> Result<&mut Self> {
        self.require_column(column)?;
        let layout = DateLayout::parse(layout)?;
        self.map_cells(&[column], policy, cell::reformat_date(column, &layout))?;
        self.column_types.insert(column.to_string(), ColumnType::Date);
        Ok(self)
    }

    /// Split `column` on `separator` into `new_names.len()` columns placed
    /// where the original was. Missing parts are empty; extra parts are dropped.
    /// An empty separator splits into single characters.
    #[instrument(level = "debug", skip(self, new_names), fields(new = new_names.len()))]
    pub fn split_column<S: AsRef<str>>(
        &mut self,
        column: &str,
        separator: &str,
        new_names: &[S],
    ) -> Result<&mut Self> {
        let col = self.require_column(column)?;
        if new_names.is_empty() {
            return Err(CleanError::NoNewColumns);
        }
        if let Some(taken) = new_names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| self.column_index(name).is_some())
        {
            return Err(CleanError::ColumnAlreadyExists(taken.to_string()));
        }

        let width = new_names.len();
        for row in &mut self.rows {
            let parts = split_cell(&mem::take(&mut row[col]), separator, width);
            row.splice(col..=col, parts);
        }

        let names: Vec<String> = new_names.iter().map(|n| n.as_ref().to_string()).collect();
        self.headers.splice(col..=col, names.iter().cloned());
        self.column_types.remove(column);
        for name in names {
            self.column_types.insert(name, ColumnType::String);
        }
        debug!(column, width, "column split");
        Ok(self)
    }

    /// Rename a header in place, carrying its type tag along.
    #[instrument(level = "debug", skip(self))]
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<&mut Self> {
        let col = self.require_column(old)?;
        if self.column_index(new).is_some() {
            return Err(CleanError::ColumnAlreadyExists(new.to_string()));
        }
        self.headers[col] = new.to_string();
        if let Some(ty) = self.column_types.remove(old) {
            self.column_types.insert(new.to_string(), ty);
        }
        Ok(self)
    }

    /// Keep rows whose `column` is empty or within `[min, max]`. A non-numeric
    /// cell aborts the call and leaves the rows as they were.
    pub fn filter_outliers(&mut self, column: &str, min: f64, max: f64) -> Result<&mut Self> {
        self.filter_outliers_with_policy(column, min, max, OnCellError::Abort)
    }

    /// [`Table::filter_outliers`] with an explicit policy for non-numeric cells.
    #[instrument(level = "debug", skip(self))]
    pub fn filter_outliers_with_policy(
        &mut self,
        column: &str,
        min: f64,
        max: f64,
        policy: OnCellError,
    ) -> Result<&mut Self> {
        let col = self.require_column(column)?;
        let verdicts = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| cell::outlier_verdict(i, column, &row[col], min, max, policy))
            .collect::<Result<Vec<_>>>()?;

        let before = self.rows.len();
        let mut verdicts = verdicts.into_iter();
        self.rows.retain_mut(|row| match verdicts.next() {
            Some(Verdict::Keep) => true,
            Some(Verdict::KeepBlanked) => {
                row[col].clear();
                true
            }
            Some(Verdict::Drop) | None => false,
        });
        debug!(column, before, after = self.rows.len(), "outliers filtered");
        Ok(self)
    }

    /// Rewrite every cell of `columns` with `f(row index, cell)`. Failures are
    /// handled by `policy`; with `Abort` the first failure ends the call.
    pub fn map_cells<F>(
        &mut self,
        columns: &[&str],
        policy: OnCellError,
        f: F,
    ) -> Result<&mut Self>
    where
        F: Fn(usize, &str) -> Result<String>,
    {
        let cols = self.resolve_columns(columns)?;
        let mut skipped = 0usize;

        for (i, row) in self.rows.iter_mut().enumerate() {
            for &col in &cols {
                match f(i, &row[col]) {
                    Ok(value) => row[col] = value,
                    Err(err) => {
                        skipped += 1;
                        if on_failure(policy, err)? == CellFix::Blank {
                            row[col].clear();
                        }
                    }
                }
            }
        }

        if skipped > 0 {
            warn!(?columns, skipped, ?policy, "cells left unconverted");
        }
        Ok(self)
    }

    /// Resolve names to distinct positions, in first-seen order.
    pub(crate) fn resolve_columns(&self, columns: &[&str]) -> Result<Vec<usize>> {
        let mut cols = Vec::with_capacity(columns.len());
        for name in columns {
            let col = self.require_column(name)?;
            if !cols.contains(&col) {
                cols.push(col);
            }
        }
        Ok(cols)
    }
}

fn split_cell(cell: &str, separator: &str, width: usize) -> Vec<String> {
    let parts: Vec<String> = if separator.is_empty() {
        cell.chars().take(width).map(String::from).collect()
    } else {
        cell.split(separator).take(width).map(str::to_string).collect()
    };
    let missing = width - parts.len();
    parts
        .into_iter()
        .chain(std::iter::repeat(String::new()).take(missing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::{FilterOrder, ParallelOptions};
    use crate::table::tests::{strings, table};

    fn people() -> Table {
        table(
            &["Name", "Age", "Salary"],
            &[
                &["Ali", "30", "5000"],
                &["Ayse", "25", "4500"],
                &["Mehmet", "40", "15000"],
                &["Zeynep", "35", "6000"],
                &["Can", "28", "1000"],
            ],
        )
    }

    fn column(t: &Table, name: &str) -> Vec<String> {
        let col = t.column_index(name).unwrap();
        t.rows().iter().map(|r| r[col].clone()).collect()
    }

    #[test]
    fn trim_columns_strips_every_cell_and_keeps_shape() {
        let mut t = table(
            &["Name", "City"],
            &[&["  Ali ", "\tİstanbul\n"], &[" Ayşe", "Ankara  "]],
        );
        t.trim_columns();
        assert_eq!(t.shape(), (2, 2));
        assert_eq!(t.rows()[0], strings(&["Ali", "İstanbul"]));
        assert_eq!(t.rows()[1], strings(&["Ayşe", "Ankara"]));

        let once = t.clone();
        t.trim_columns();
        assert_eq!(t, once);
    }

    #[test]
    fn replace_nulls_fills_only_empty_cells() -> anyhow::Result<()> {
        let mut t = table(&["Name", "Age"], &[&["Ali", ""], &["", "25"], &["Can", " "]]);
        t.replace_nulls("Age", "0")?;
        assert_eq!(column(&t, "Age"), strings(&["0", "25", " "]));
        assert_eq!(column(&t, "Name"), strings(&["Ali", "", "Can"]));
        Ok(())
    }

    #[test]
    fn replace_nulls_on_missing_column_leaves_table_untouched() {
        let mut t = table(&["Name"], &[&[""]]);
        let before = t.clone();
        let err = t.replace_nulls("NoSuchColumn", "x").unwrap_err();
        assert!(matches!(err, CleanError::ColumnNotFound(c) if c == "NoSuchColumn"));
        assert_eq!(t, before);
    }

    #[test]
    fn normalize_case_is_unicode_aware_and_idempotent() -> anyhow::Result<()> {
        let mut t = table(&["City"], &[&["istanbul"], &["İzmir"], &["çanakkale"]]);
        t.normalize_case("City", true)?;
        assert_eq!(column(&t, "City"), strings(&["ISTANBUL", "İZMIR", "ÇANAKKALE"]));
        let once = t.clone();
        t.normalize_case("City", true)?;
        assert_eq!(t, once);

        t.normalize_case("City", false)?;
        assert_eq!(column(&t, "City"), strings(&["istanbul", "izmir", "çanakkale"]));
        Ok(())
    }

    #[test]
    fn normalize_case_lowers_dotted_capital_i_to_plain_i() -> anyhow::Result<()> {
        let mut t = table(&["City"], &[&["İzmir"], &["İstanbul"], &["Straße"]]);
        t.normalize_case("City", false)?;
        assert_eq!(column(&t, "City"), strings(&["izmir", "istanbul", "straße"]));
        t.normalize_case("City", true)?;
        assert_eq!(column(&t, "City"), strings(&["IZMIR", "ISTANBUL", "STRAßE"]));
        Ok(())
    }

    #[test]
    fn clean_with_regex_replaces_globally() -> anyhow::Result<()> {
        let mut t = table(&["Phone"], &[&["(555) 123-45-67"], &["555.987.65.43"]]);
        t.clean_with_regex("Phone", r"[^\d]", "")?;
        assert_eq!(column(&t, "Phone"), strings(&["5551234567", "5559876543"]));
        Ok(())
    }

    #[test]
    fn clean_with_regex_rejects_bad_pattern_and_missing_column() {
        let mut t = table(&["Phone"], &[&["1"]]);
        assert!(matches!(
            t.clean_with_regex("Phone", "(", ""),
            Err(CleanError::InvalidRegex(_))
        ));
        assert!(matches!(
            t.clean_with_regex("Fax", r"\d", ""),
            Err(CleanError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn split_column_pads_and_truncates() -> anyhow::Result<()> {
        let mut t = table(
            &["ID", "FullName", "Age"],
            &[
                &["1", "Mehmet Can Demir", "40"],
                &["2", "Ali Yilmaz", "30"],
                &["3", "A B C D", "20"],
            ],
        );
        t.split_column("FullName", " ", &["First", "Last", "Second"])?;
        assert_eq!(t.headers(), strings(&["ID", "First", "Last", "Second", "Age"]).as_slice());
        assert_eq!(t.rows()[0], strings(&["1", "Mehmet", "Can", "Demir", "40"]));
        assert_eq!(t.rows()[1], strings(&["2", "Ali", "Yilmaz", "", "30"]));
        assert_eq!(t.rows()[2], strings(&["3", "A", "B", "C", "20"]));
        assert_eq!(t.column_type("FullName"), None);
        assert_eq!(t.column_type("Second"), Some(ColumnType::String));
        assert!(t.rows().iter().all(|r| r.len() == t.headers().len()));
        Ok(())
    }

    #[test]
    fn split_column_validates_names() {
        let mut t = table(&["FullName", "Age"], &[&["a b", "1"]]);
        assert!(matches!(
            t.split_column::<&str>("FullName", " ", &[]),
            Err(CleanError::NoNewColumns)
        ));
        assert!(matches!(
            t.split_column("FullName", " ", &["First", "Age"]),
            Err(CleanError::ColumnAlreadyExists(c)) if c == "Age"
        ));
        assert!(matches!(
            t.split_column("Nope", " ", &["First"]),
            Err(CleanError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn split_column_with_empty_separator_splits_characters() -> anyhow::Result<()> {
        let mut t = table(&["Code"], &[&["AB"], &[""]]);
        t.split_column("Code", "", &["C1", "C2", "C3"])?;
        assert_eq!(t.rows()[0], strings(&["A", "B", ""]));
        assert_eq!(t.rows()[1], strings(&["", "", ""]));
        Ok(())
    }

    #[test]
    fn rename_column_moves_type_tag() -> anyhow::Result<()> {
        let mut t = table(&["dob", "name"], &[&["1990-01-15", "Ali"]]);
        t.clean_dates("dob", "2006-01-02")?;
        t.rename_column("dob", "BirthDate")?;
        assert_eq!(t.headers()[0], "BirthDate");
        assert_eq!(t.column_type("BirthDate"), Some(ColumnType::Date));
        assert_eq!(t.column_type("dob"), None);

        assert!(matches!(
            t.rename_column("name", "BirthDate"),
            Err(CleanError::ColumnAlreadyExists(_))
        ));
        assert!(matches!(
            t.rename_column("missing", "x"),
            Err(CleanError::ColumnNotFound(c)) if c == "missing"
        ));
        Ok(())
    }

    #[test]
    fn clean_dates_reformats_and_tags_column() -> anyhow::Result<()> {
        let mut t = table(
            &["BirthDate"],
            &[&["1990-01-15"], &["15/02/1985"], &[""], &["1975-03-10T10:00:00Z"]],
        );
        t.clean_dates("BirthDate", "2006-01-02")?;
        assert_eq!(
            column(&t, "BirthDate"),
            strings(&["1990-01-15", "1985-02-15", "", "1975-03-10"])
        );
        assert_eq!(t.column_type("BirthDate"), Some(ColumnType::Date));
        Ok(())
    }

    #[test]
    fn clean_dates_aborts_on_first_bad_row_without_rollback() {
        let mut t = table(
            &["BirthDate"],
            &[&["15/01/1990"], &["not a date"], &["20/02/1985"]],
        );
        let err = t.clean_dates("BirthDate", "2006-01-02").unwrap_err();
        match err {
            CleanError::DateParseFailure { row, column, value } => {
                assert_eq!(row, 1);
                assert_eq!(column, "BirthDate");
                assert_eq!(value, "not a date");
            }
            other => panic!("unexpected error: {other}"),
        }
        // the row before the failure was already rewritten, the one after was not
        assert_eq!(
            column(&t, "BirthDate"),
            strings(&["1990-01-15", "not a date", "20/02/1985"])
        );
        assert_eq!(t.column_type("BirthDate"), Some(ColumnType::String));
    }

    #[test]
    fn clean_dates_with_lenient_policies() -> anyhow::Result<()> {
        let rows: &[&[&str]] = &[&["15/01/1990"], &["bad"]];

        let mut keep = table(&["d"], rows);
        keep.clean_dates_with_policy("d", "2006-01-02", OnCellError::KeepOriginal)?;
        assert_eq!(column(&keep, "d"), strings(&["1990-01-15", "bad"]));

        let mut mark = table(&["d"], rows);
        mark.clean_dates_with_policy("d", "2006-01-02", OnCellError::MarkInvalid)?;
        assert_eq!(column(&mark, "d"), strings(&["1990-01-15", ""]));
        assert_eq!(mark.column_type("d"), Some(ColumnType::Date));
        Ok(())
    }

    #[test]
    fn filter_outliers_keeps_in_range_rows_in_order() -> anyhow::Result<()> {
        let mut t = people();
        t.filter_outliers("Salary", 2000.0, 10000.0)?;
        assert_eq!(t.shape(), (3, 3));
        assert_eq!(column(&t, "Name"), strings(&["Ali", "Ayse", "Zeynep"]));
        Ok(())
    }

    #[test]
    fn filter_outliers_keeps_empty_cells() -> anyhow::Result<()> {
        let mut t = table(&["v"], &[&["1"], &[""], &["100"]]);
        t.filter_outliers("v", 0.0, 10.0)?;
        assert_eq!(column(&t, "v"), strings(&["1", ""]));
        Ok(())
    }

    #[test]
    fn filter_outliers_aborts_on_text_and_keeps_rows() {
        let mut t = table(&["v"], &[&["1"], &["abc"], &["100"]]);
        let err = t.filter_outliers("v", 0.0, 10.0).unwrap_err();
        assert!(matches!(err, CleanError::NumericConversion { row: 1, .. }));
        assert_eq!(t.shape(), (3, 1));
    }

    #[test]
    fn filter_outliers_reads_padded_numbers_like_parallel_mode() -> anyhow::Result<()> {
        let mut t = table(&["Salary"], &[&[" 5000 "], &["\t15000"], &["4500\n"]]);
        let par = t.filter_outliers_parallel(
            "Salary",
            2000.0,
            10000.0,
            &ParallelOptions::default()
                .with_max_workers(2)
                .with_filter_order(FilterOrder::Source),
        )?;
        t.filter_outliers("Salary", 2000.0, 10000.0)?;
        assert_eq!(column(&t, "Salary"), strings(&[" 5000 ", "4500\n"]));
        assert_eq!(par.rows(), t.rows());
        Ok(())
    }

    #[test]
    fn filter_outliers_mark_invalid_blanks_cell() -> anyhow::Result<()> {
        let mut t = table(&["v"], &[&["1"], &["abc"], &["100"]]);
        t.filter_outliers_with_policy("v", 0.0, 10.0, OnCellError::MarkInvalid)?;
        assert_eq!(column(&t, "v"), strings(&["1", ""]));
        Ok(())
    }

    #[test]
    fn operations_chain() -> anyhow::Result<()> {
        let mut t = table(&["Name", "Age"], &[&["  ali ", ""], &[" can", "40"]]);
        t.trim_columns()
            .replace_nulls("Age", "0")?
            .normalize_case("Name", true)?;
        assert_eq!(t.rows()[0], strings(&["ALI", "0"]));
        assert_eq!(t.rows()[1], strings(&["CAN", "40"]));
        Ok(())
    }

    #[test]
    fn map_cells_touches_several_columns() -> anyhow::Result<()> {
        let mut t = table(&["a", "b", "c"], &[&["1", "2", "3"]]);
        t.map_cells(&["a", "c", "a"], OnCellError::Abort, |_, v| Ok(format!("<{v}>")))?;
        assert_eq!(t.rows()[0], strings(&["<1>", "2", "<3>"]));
        Ok(())
    }
}
