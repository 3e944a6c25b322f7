//! Turn raw process text into comparable forms.

use crate::error::ParseError;

/// Collapse `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

/// Parse program output that holds one signed integer per line.
///
/// Blank and whitespace-only lines are skipped; surrounding whitespace on a
/// value line is ignored. Anything else that is not an `i64` is an error
/// carrying the 1-based line number.
pub fn tokenize_int_lines(text: &str) -> Result<Vec<i64>, ParseError> {
    let text = normalize_newlines(text);
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let l = line.trim();
        if l.is_empty() {
            continue;
        }
        let v = l.parse::<i64>().map_err(|_| ParseError {
            line_no: idx + 1,
            line: line.to_string(),
        })?;
        out.push(v);
    }
    Ok(out)
}
