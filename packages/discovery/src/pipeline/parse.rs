//! Payload parsing: record-oriented JSON and delimited text.
//!
//! Both parsers are lenient: anything they cannot make rows from is an
//! `Err(detail)`, never a panic, and the caller moves on to the next resource.

use serde_json::Value;

use crate::types::sample::Record;

/// Where the record array was found inside a JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// The document itself is an array.
    TopLevel,
    /// Found under a wrapper key path such as `result.records`.
    Wrapped(&'static [&'static str]),
}

impl std::fmt::Display for JsonShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonShape::TopLevel => f.write_str("top-level array"),
            JsonShape::Wrapped(path) => write!(f, "array under `{}`", path.join(".")),
        }
    }
}

/// Wrapper paths tried in order after the top level.
const ACCESSOR_PATHS: &[&[&str]] = &[&["data"], &["records"], &["result"], &["result", "records"]];

/// Delimiters considered by autodetection, in tie-break order.
pub const DELIMITERS: [char; 3] = [',', ';', '\t'];

/// Cell text for a JSON value. Nested values keep their JSON form.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn to_record(value: &Value) -> Record {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), cell_text(v))).collect(),
        other => {
            let mut record = Record::new();
            record.insert("value".to_string(), cell_text(other));
            record
        }
    }
}

fn locate<'v>(document: &'v Value) -> Option<(&'v Vec<Value>, JsonShape)> {
    if let Value::Array(items) = document {
        return Some((items, JsonShape::TopLevel));
    }
    ACCESSOR_PATHS.iter().find_map(|path| {
        let mut cursor = document;
        for key in path.iter() {
            cursor = cursor.get(key)?;
        }
        cursor
            .as_array()
            .map(|items| (items, JsonShape::Wrapped(*path)))
    })
}

/// Parse up to `max_rows` records from a JSON document.
pub fn parse_json(text: &str, max_rows: usize) -> Result<(Vec<Record>, JsonShape), String> {
    let document: Value =
        serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;
    let (items, shape) =
        locate(&document).ok_or_else(|| "no record array at a known location".to_string())?;
    let rows: Vec<Record> = items.iter().take(max_rows).map(to_record).collect();
    if rows.is_empty() {
        return Err(format!("empty {}", shape));
    }
    Ok((rows, shape))
}

/// Pick the delimiter with the highest raw count in the header line.
///
/// Counting is not quote-aware: a quoted header containing commas can tip
/// the choice. Ties go to the earlier entry of [`DELIMITERS`].
pub fn detect_delimiter(header: &str) -> char {
    let mut best = DELIMITERS[0];
    let mut best_count = 0;
    for delimiter in DELIMITERS {
        let count = header.matches(delimiter).count();
        if count > best_count {
            best = delimiter;
            best_count = count;
        }
    }
    best
}

fn clean_token(token: &str) -> String {
    let token = token.trim();
    let token = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token);
    token.trim().to_string()
}

/// Column names for a header line. Empty slots get a positional name and
/// repeated names a `_2`, `_3`, ... suffix, so no column is lost in the record.
fn header_names(header: &str, delimiter: char) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (i, cell) in header.split(delimiter).enumerate() {
        let base = match clean_token(cell) {
            name if name.is_empty() => format!("column_{}", i + 1),
            name => name,
        };
        let mut name = base.clone();
        let mut n = 2;
        while names.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        names.push(name);
    }
    names
}

/// Parse delimited text: header line plus data lines.
///
/// Reads at most `max_lines` non-blank lines (header included) and returns at
/// most `max_rows` records. Each record zips header names with values; extra
/// values past the last header (or missing trailing values) are dropped.
pub fn parse_delimited(
    text: &str,
    max_lines: usize,
    max_rows: usize,
) -> Result<(Vec<Record>, char), String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .take(max_lines)
        .collect();

    if lines.len() < 2 {
        return Err(format!("{} non-blank line(s), need a header and a row", lines.len()));
    }

    let delimiter = detect_delimiter(lines[0]);
    let headers = header_names(lines[0], delimiter);

    let rows: Vec<Record> = lines[1..]
        .iter()
        .take(max_rows)
        .map(|line| {
            headers
                .iter()
                .cloned()
                .zip(line.split(delimiter).map(clean_token))
                .collect()
        })
        .collect();

    Ok((rows, delimiter))
}
