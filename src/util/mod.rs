//! Pure scalar helpers shared by the sequential and parallel operation sets.

pub mod date_parser;
pub mod layout;

use crate::error::Result;
use regex::Regex;
use std::num::ParseFloatError;

pub use date_parser::{format_date, parse_date, DateLayout};

/// Strip leading and trailing Unicode whitespace.
pub fn trim_space(raw: &str) -> String {
    raw.trim().to_string()
}

/// Per-character upper-case mapping. Every char maps to exactly one char, so
/// `ß` stays `ß` rather than expanding to `SS`.
pub fn to_upper_case(raw: &str) -> String {
    raw.chars().map(simple_upper).collect()
}

/// Per-character lower-case mapping: `İ` becomes a plain `i` and a final `Σ`
/// becomes `σ`, independent of the surrounding text.
pub fn to_lower_case(raw: &str) -> String {
    raw.chars().map(simple_lower).collect()
}

fn simple_upper(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => iota_subscript_capital(c).unwrap_or(c),
    }
}

fn simple_lower(c: char) -> char {
    // the only multi-char lower mapping is U+0130, whose one-char form is `i`
    c.to_lowercase().next().unwrap_or(c)
}

/// Greek small letters with ypogegrammeni upper-case to the matching
/// prosgegrammeni capital.
fn iota_subscript_capital(c: char) -> Option<char> {
    let shifted = match c as u32 {
        cp @ (0x1F80..=0x1F87 | 0x1F90..=0x1F97 | 0x1FA0..=0x1FA7) => cp + 8,
        0x1FB3 => 0x1FBC,
        0x1FC3 => 0x1FCC,
        0x1FF3 => 0x1FFC,
        _ => return None,
    };
    char::from_u32(shifted)
}

/// Parse a cell as `f64`, ignoring surrounding whitespace.
pub fn parse_float(raw: &str) -> std::result::Result<f64, ParseFloatError> {
    raw.trim().parse::<f64>()
}

/// Compile `pattern`; a bad pattern becomes `CleanError::InvalidRegex`.
pub fn compile_regex(pattern: &str) -> Result<Regex> {
    Ok(Regex::new(pattern)?)
}
