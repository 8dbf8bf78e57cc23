// Utilities for quoted strings and numbers in DBC files.
//
// Comments may contain escaped quotes (\") and span several physical lines;
// numbers are written back in their shortest exact form.

// A comment record ends on the first physical line whose trimmed end is ';'.
pub(crate) fn is_terminated_record(s: &str) -> bool {
    s.trim_end().ends_with(';')
}

// Byte offsets of the first and last unescaped quotes in `s`.
pub(crate) fn outer_quotes(s: &str) -> Option<(usize, usize)> {
    let mut first: Option<usize> = None;
    let mut last: Option<usize> = None;
    let mut backslashes = 0usize;
    for (pos, ch) in s.char_indices() {
        if ch == '\\' {
            backslashes += 1;
            continue;
        }
        if ch == '"' && backslashes % 2 == 0 {
            if first.is_none() {
                first = Some(pos);
            }
            last = Some(pos);
        }
        backslashes = 0;
    }
    match (first, last) {
        (Some(a), Some(b)) if b > a => Some((a, b)),
        _ => None,
    }
}

pub(crate) fn unescape_quotes(s: &str) -> String {
    s.replace("\\\"", "\"")
}

pub(crate) fn escape_quotes(s: &str) -> String {
    s.replace('"', "\\\"")
}

// DBC identifiers: `\w+`
pub(crate) fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

// Float literal as accepted by the SG_ grammar: `[0-9.+\-eE]+`.
// Literals that overflow to infinity are rejected since they cannot be written back.
pub(crate) fn parse_dbc_f64(s: &str) -> Option<f64> {
    let s: &str = s.trim();
    if s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
    {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Shortest decimal text that parses back to exactly `value`, without exponent.
pub fn format_f64(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

/// Number of digits after the decimal point in the shortest text form of `value`.
pub fn num_decimals(value: f64) -> usize {
    let text: String = format_f64(value);
    match text.find('.') {
        Some(dot) => text.len() - dot - 1,
        None => 0,
    }
}
