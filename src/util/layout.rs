//! Translation of reference-time layouts (`2006-01-02 15:04:05`) into chrono
//! strftime strings.
//!
//! A layout spells out how the reference moment Mon Jan 2 15:04:05 MST 2006
//! would be written. Each recognised chunk maps to one strftime specifier;
//! everything else is copied through literally.

/// Longest chunks first so `2006` wins over `2` and `January` over `Jan`.
const CHUNKS: &[(&str, &str)] = &[
    ("January", "%B"),
    ("Monday", "%A"),
    ("Z07:00", "%:z"),
    ("-07:00", "%:z"),
    ("Z0700", "%z"),
    ("-0700", "%z"),
    ("2006", "%Y"),
    ("Jan", "%b"),
    ("Mon", "%a"),
    ("MST", "%Z"),
    ("002", "%j"),
    ("01", "%m"),
    ("02", "%d"),
    ("03", "%I"),
    ("04", "%M"),
    ("05", "%S"),
    ("06", "%y"),
    ("15", "%H"),
    ("_2", "%e"),
    ("PM", "%p"),
    ("pm", "%P"),
    ("1", "%-m"),
    ("2", "%-d"),
    ("3", "%-I"),
    ("4", "%-M"),
    ("5", "%-S"),
];

/// True when `layout` is already a strftime string.
pub fn is_strftime(layout: &str) -> bool {
    layout.contains('%')
}

/// Rewrite a reference-time layout as a strftime string.
pub fn to_strftime(layout: &str) -> String {
    let mut out = String::with_capacity(layout.len() * 2);
    let mut rest = layout;

    while let Some(c) = rest.chars().next() {
        if let Some((spec, len)) = fraction_at(rest) {
            out.push_str(spec);
            rest = &rest[len..];
            continue;
        }
        if let Some((chunk, spec)) = CHUNKS.iter().find(|(chunk, _)| rest.starts_with(chunk)) {
            out.push_str(spec);
            rest = &rest[chunk.len()..];
            continue;
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// `.000`, `.000000`, `.000000000` (or the `9` forms) right before a non-digit.
fn fraction_at(s: &str) -> Option<(&'static str, usize)> {
    let mut chars = s.chars();
    if !matches!(chars.next(), Some('.') | Some(',')) {
        return None;
    }
    let digit = chars.next().filter(|d| *d == '0' || *d == '9')?;
    let run = 1 + chars.by_ref().take_while(|c| *c == digit).count();
    if s[1 + run..].starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let spec = match (digit, run) {
        ('0', 3) => "%.3f",
        ('0', 6) => "%.6f",
        ('0', 9) => "%.9f",
        _ => "%.f",
    };
    Some((spec, 1 + run))
}
