//! Per-cell transformations and the failure policy shared by both execution
//! modes. Each transform takes `(row index, cell)` and yields the new value.

use crate::clean::options::OnCellError;
use crate::error::{CleanError, Result};
use crate::util::{self, DateLayout};
use regex::Regex;

/// How a failed cell is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellFix {
    Keep,
    Blank,
}

/// Apply `policy` to a cell failure: `Abort` hands the error back.
pub(crate) fn on_failure(policy: OnCellError, err: CleanError) -> Result<CellFix> {
    match policy {
        OnCellError::Abort => Err(err),
        OnCellError::KeepOriginal => Ok(CellFix::Keep),
        OnCellError::MarkInvalid => Ok(CellFix::Blank),
    }
}

/// Outcome of the range check for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Keep,
    Drop,
    /// Kept, with the unparseable cell blanked
    KeepBlanked,
}

/// Empty cells are kept; numeric cells are kept iff `min <= v <= max`;
/// anything else goes through `policy`.
pub(crate) fn outlier_verdict(
    row: usize,
    column: &str,
    cell: &str,
    min: f64,
    max: f64,
    policy: OnCellError,
) -> Result<Verdict> {
    if cell.is_empty() {
        return Ok(Verdict::Keep);
    }
    match util::parse_float(cell) {
        Ok(v) if v >= min && v <= max => Ok(Verdict::Keep),
        Ok(_) => Ok(Verdict::Drop),
        Err(source) => {
            let err = CleanError::NumericConversion {
                row,
                column: column.to_string(),
                value: cell.to_string(),
                source,
            };
            Ok(match on_failure(policy, err)? {
                CellFix::Keep => Verdict::Keep,
                CellFix::Blank => Verdict::KeepBlanked,
            })
        }
    }
}

pub(crate) fn replace_null(value: &str) -> impl Fn(usize, &str) -> Result<String> + Sync + '_ {
    move |_, cell| {
        Ok(if cell.is_empty() {
            value.to_string()
        } else {
            cell.to_string()
        })
    }
}

pub(crate) fn normalize_case(to_upper: bool) -> impl Fn(usize, &str) -> Result<String> + Sync {
    move |_, cell| {
        Ok(if to_upper {
            util::to_upper_case(cell)
        } else {
            util::to_lower_case(cell)
        })
    }
}

pub(crate) fn regex_replace<'a>(
    re: &'a Regex,
    replacement: &'a str,
) -> impl Fn(usize, &str) -> Result<String> + Sync + 'a {
    move |_, cell| Ok(re.replace_all(cell, replacement).into_owned())
}

/// Reformat a date cell; empty cells pass through untouched.
pub(crate) fn reformat_date<'a>(
    column: &'a str,
    layout: &'a DateLayout,
) -> impl Fn(usize, &str) -> Result<String> + Sync + 'a {
    move |row, cell| {
        if cell.is_empty() {
            return Ok(String::new());
        }
        match util::parse_date(cell, layout) {
            Some(dt) => util::format_date(&dt, layout),
            None => Err(CleanError::DateParseFailure {
                row,
                column: column.to_string(),
                value: cell.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outlier_verdict_follows_policy() {
        let check = |cell, policy| outlier_verdict(0, "Salary", cell, 10.0, 20.0, policy);
        assert_eq!(check("", OnCellError::Abort).unwrap(), Verdict::Keep);
        assert_eq!(check("15", OnCellError::Abort).unwrap(), Verdict::Keep);
        assert_eq!(check("10", OnCellError::Abort).unwrap(), Verdict::Keep);
        assert_eq!(check("25", OnCellError::Abort).unwrap(), Verdict::Drop);
        assert!(matches!(
            check("n/a", OnCellError::Abort),
            Err(CleanError::NumericConversion { .. })
        ));
        assert_eq!(check("n/a", OnCellError::KeepOriginal).unwrap(), Verdict::Keep);
        assert_eq!(
            check("n/a", OnCellError::MarkInvalid).unwrap(),
            Verdict::KeepBlanked
        );
    }

    #[test]
    fn date_failures_carry_row_and_value() {
        let layout = DateLayout::parse("2006-01-02").unwrap();
        let f = reformat_date("BirthDate", &layout);
        assert_eq!(f(0, "").unwrap(), "");
        match f(7, "yesterday") {
            Err(CleanError::DateParseFailure { row, column, value }) => {
                assert_eq!((row, column.as_str(), value.as_str()), (7, "BirthDate", "yesterday"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn regex_replacement_expands_groups() {
        let re = Regex::new(r"(\d{3})(\d{4})").unwrap();
        let f = regex_replace(&re, "$1-$2");
        assert_eq!(f(0, "tel 5551234").unwrap(), "tel 555-1234");
    }
}
