use crate::error::{CleanError, Result};
use crate::util::layout;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use std::fmt::Write;

/// Layouts tried after the caller's own, in order.
#[derive(Debug, Clone, Copy)]
enum Fallback {
    Format(&'static str),
    Rfc3339,
    /// RFC 1123 / RFC 822, with named or numeric zones
    Rfc2822,
}

const FALLBACKS: &[Fallback] = &[
    Fallback::Format("%Y-%m-%d"),
    Fallback::Format("%Y/%m/%d"),
    Fallback::Format("%d-%m-%Y"),
    Fallback::Format("%d/%m/%Y"),
    Fallback::Format("%m-%d-%Y"),
    Fallback::Format("%m/%d/%Y"),
    Fallback::Format("%Y-%m-%d %H:%M:%S"),
    Fallback::Format("%Y/%m/%d %H:%M:%S"),
    Fallback::Format("%d-%m-%Y %H:%M:%S"),
    Fallback::Format("%d/%m/%Y %H:%M:%S"),
    Fallback::Format("%m-%d-%Y %H:%M:%S"),
    Fallback::Format("%m/%d/%Y %H:%M:%S"),
    Fallback::Rfc3339,
    Fallback::Rfc2822,
    // ANSI C
    Fallback::Format("%a %b %e %H:%M:%S %Y"),
    // Unix date
    Fallback::Format("%a %b %e %H:%M:%S %Z %Y"),
    // Ruby
    Fallback::Format("%a %b %d %H:%M:%S %z %Y"),
];

/// An output layout, validated and held as a strftime string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateLayout {
    source: String,
    strftime: String,
}

impl DateLayout {
    /// Accept either a strftime string (anything containing `%`) or a
    /// reference-time layout such as `2006-01-02`.
    pub fn parse(layout: &str) -> Result<Self> {
        if layout.is_empty() {
            return Err(CleanError::InvalidLayout("empty layout".into()));
        }
        let strftime = if layout::is_strftime(layout) {
            layout.to_string()
        } else {
            layout::to_strftime(layout)
        };
        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(CleanError::InvalidLayout(layout.to_string()));
        }
        Ok(Self {
            source: layout.to_string(),
            strftime,
        })
    }

    /// The layout as the caller wrote it.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn strftime(&self) -> &str {
        &self.strftime
    }
}

/// Parse `raw` with the caller's layout first, then each fallback layout.
/// The first layout that accepts the whole string wins.
pub fn parse_date(raw: &str, layout: &DateLayout) -> Option<DateTime<FixedOffset>> {
    parse_with_format(raw, layout.strftime()).or_else(|| {
        FALLBACKS.iter().find_map(|fallback| match fallback {
            Fallback::Format(fmt) => parse_with_format(raw, fmt),
            Fallback::Rfc3339 => DateTime::parse_from_rfc3339(raw).ok(),
            Fallback::Rfc2822 => DateTime::parse_from_rfc2822(raw).ok(),
        })
    })
}

/// Render `dt` with `layout`.
pub fn format_date(dt: &DateTime<FixedOffset>, layout: &DateLayout) -> Result<String> {
    let mut out = String::new();
    write!(out, "{}", dt.format(layout.strftime()))
        .map_err(|_| CleanError::InvalidLayout(layout.source().to_string()))?;
    Ok(out)
}

/// Zoned, then naive date-time (read as UTC), then bare date (midnight UTC).
fn parse_with_format(raw: &str, fmt: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
        return Some(naive.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(raw, fmt)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}
