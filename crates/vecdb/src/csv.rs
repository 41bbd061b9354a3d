//! CSV boundary adapter.
//!
//! Parses `[id,]f1,f2,...,f_dim[,metadata]` rows for the loader and the
//! CLI. This is a deliberately small RFC4180-ish reader: quoted fields with
//! `""` escapes, whitespace trimming, `#` comment lines, a UTF-8 BOM on the
//! first line, and an optional header row. Parse failures carry the 1-based
//! line number.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Result, VecdbError};

/// Options controlling row interpretation.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Skip the first (non-comment) row.
    pub has_header: bool,
    /// Treat the first column as an id even if it parses as a float.
    pub has_id: bool,
    /// Infer an id column when the first token does not parse as a float.
    pub infer_id: bool,
    /// Allow one trailing metadata column after the vector.
    pub allow_metadata: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            has_id: false,
            infer_id: true,
            allow_metadata: false,
        }
    }
}

/// One parsed row.
#[derive(Debug, Clone, Default)]
pub struct CsvRow {
    /// The leading id column, when present.
    pub id: Option<String>,
    /// The vector values, exactly `dim` of them when a dimension is expected.
    pub vec: Vec<f32>,
    /// The raw trailing metadata token, when present.
    pub metadata_raw: Option<String>,
}

/// Split one line into trimmed fields, honoring double quotes.
fn split_quoted(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(ch);
            }
        } else {
            match ch {
                '"' => in_quotes = true,
                ',' => parts.push(std::mem::take(&mut current)),
                _ => current.push(ch),
            }
        }
    }
    parts.push(current);

    parts.iter().map(|p| p.trim().to_string()).collect()
}

fn parse_float(s: &str) -> Option<f32> {
    let v: f32 = s.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

/// Parse a single CSV line.
///
/// With `dim_expected > 0` the vector must have exactly that many values;
/// with `allow_metadata` one extra trailing column is taken as raw metadata.
///
/// # Errors
///
/// Returns [`VecdbError::InvalidArgument`] describing the offending column
/// on malformed input.
pub fn parse_line(line: &str, dim_expected: usize, opts: &CsvOptions) -> Result<CsvRow> {
    let parts = split_quoted(line);
    let mut row = CsvRow::default();

    let mut start = 0;
    if opts.has_id {
        row.id = Some(parts[0].clone());
        start = 1;
    } else if opts.infer_id && parse_float(&parts[0]).is_none() {
        row.id = Some(parts[0].clone());
        start = 1;
    }

    if start >= parts.len() {
        return Err(VecdbError::InvalidArgument(
            "no vector values found".into(),
        ));
    }

    let remaining = parts.len() - start;
    let mut has_meta = false;
    if opts.allow_metadata && dim_expected > 0 {
        if remaining == dim_expected + 1 {
            has_meta = true;
        } else if remaining > dim_expected + 1 {
            return Err(VecdbError::InvalidArgument(
                "too many columns (metadata expects exactly one extra column)".into(),
            ));
        }
    }

    let vec_count = remaining - usize::from(has_meta);
    if dim_expected > 0 && vec_count != dim_expected {
        return Err(VecdbError::InvalidArgument(format!(
            "dimension mismatch: expected dim={dim_expected} got dim={vec_count}"
        )));
    }

    row.vec.reserve(vec_count);
    for (offset, part) in parts[start..start + vec_count].iter().enumerate() {
        let Some(v) = parse_float(part) else {
            return Err(VecdbError::InvalidArgument(format!(
                "failed to parse float at column {}: '{part}'",
                start + offset + 1
            )));
        };
        row.vec.push(v);
    }

    if has_meta {
        row.metadata_raw = Some(parts[start + vec_count].clone());
    }

    Ok(row)
}

/// Stream rows out of a CSV file.
///
/// Empty and `#`-prefixed lines are skipped, a UTF-8 BOM on the first line
/// is stripped, and the header row is skipped when the options say so. The
/// callback returns `Ok(false)` to stop early.
///
/// # Errors
///
/// Returns [`VecdbError::Io`] if the file cannot be read and
/// [`VecdbError::InvalidArgument`] (with the line number) on parse
/// failures; callback errors propagate unchanged.
pub fn for_each_row(
    path: &Path,
    dim_expected: usize,
    opts: &CsvOptions,
    mut callback: impl FnMut(CsvRow) -> Result<bool>,
) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);
    let mut header_skipped = false;

    for (line_index, line) in reader.lines().enumerate() {
        let line_no = line_index + 1;
        let line = line?;

        let mut text = line.as_str();
        if line_no == 1 {
            text = text.strip_prefix('\u{feff}').unwrap_or(text);
        }
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        if opts.has_header && !header_skipped {
            header_skipped = true;
            continue;
        }

        let row = parse_line(text, dim_expected, opts).map_err(|e| match e {
            VecdbError::InvalidArgument(msg) => {
                VecdbError::InvalidArgument(format!("csv parse error at line {line_no}: {msg}"))
            }
            other => other,
        })?;

        if !callback(row)? {
            return Ok(());
        }
    }
    Ok(())
}
