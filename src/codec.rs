//! Tagged text format for parameter and result files.
//!
//! One record per line:
//!
//! ```text
//! # slimwrap-data 1
//! yes logical T
//! n integer 500
//! mu float 1e-7
//! label string "p1"
//! rates vector float 3 2.3,1.1,1
//! m matrix integer 2 2 1,2,3,4
//! ```
//!
//! Matrices are flattened row-major. String elements are JSON-quoted so they
//! may contain spaces, commas and newlines. Blank lines and `#` comments are
//! skipped.

use std::{
    fs,
    io::Write,
    path::Path,
};

use tempfile::{Builder, TempPath};

use crate::error::{Result, Stage, WrapError};
use crate::params::{is_identifier, ParameterSet, ResultSet};
use crate::value::{Array, Kind, Matrix, Value};

pub const HEADER: &str = "# slimwrap-data 1";

/// Formats a float so that parsing it back yields the same bits.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".into()
    } else if f == f64::INFINITY {
        "INF".into()
    } else if f == f64::NEG_INFINITY {
        "-INF".into()
    } else {
        format!("{f:?}")
    }
}

fn logical(b: bool) -> &'static str {
    if b {
        "T"
    } else {
        "F"
    }
}

fn quote(s: &str) -> String {
    // Serializing a &str cannot fail.
    serde_json::to_string(s).unwrap_or_default()
}

fn join(array: &Array) -> String {
    match array {
        Array::Logical(v) => v.iter().map(|b| logical(*b)).collect::<Vec<_>>().join(","),
        Array::Integer(v) => v.iter().map(i64::to_string).collect::<Vec<_>>().join(","),
        Array::Float(v) => v.iter().map(|f| format_float(*f)).collect::<Vec<_>>().join(","),
        Array::String(v) => v.iter().map(|s| quote(s)).collect::<Vec<_>>().join(","),
    }
}

fn record(name: &str, value: &Value) -> String {
    match value {
        Value::Logical(b) => format!("{name} logical {}", logical(*b)),
        Value::Integer(i) => format!("{name} integer {i}"),
        Value::Float(f) => format!("{name} float {}", format_float(*f)),
        Value::String(s) => format!("{name} string {}", quote(s)),
        Value::Vector(a) => format!("{name} vector {} {} {}", a.kind().tag(), a.len(), join(a)),
        Value::Matrix(m) => format!(
            "{name} matrix {} {} {} {}",
            m.data().kind().tag(),
            m.nrow(),
            m.ncol(),
            join(m.data())
        ),
    }
}

/// Renders a parameter set in the tagged text format.
pub fn to_string(params: &ParameterSet) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for (name, value) in params {
        out.push_str(record(name, value).trim_end());
        out.push('\n');
    }
    out
}

/// Writes `params` to a fresh, uniquely named temp file.
///
/// The file is removed when the returned path is dropped unless it is kept
/// with [`TempPath::keep`].
pub fn encode(params: &ParameterSet, dir: Option<&Path>) -> Result<TempPath> {
    let mut builder = Builder::new();
    builder.prefix("slimwrap-params-").suffix(".txt");
    let file = match dir {
        Some(d) => builder.tempfile_in(d),
        None => builder.tempfile(),
    }
    .map_err(|e| WrapError::io(Stage::Encode, "creating parameter file", e))?;

    let text = to_string(params);
    let (mut handle, path) = file.into_parts();
    handle
        .write_all(text.as_bytes())
        .and_then(|_| handle.flush())
        .map_err(|e| WrapError::io(Stage::Encode, format!("writing {}", path.display()), e))?;
    Ok(path)
}

/// Reads and parses a result file.
pub fn decode(path: &Path) -> Result<ResultSet> {
    let text = fs::read_to_string(path)
        .map_err(|e| WrapError::io(Stage::Decode, format!("reading {}", path.display()), e))?;
    from_str(&text)
}

/// Parses the tagged text format.
pub fn from_str(text: &str) -> Result<ResultSet> {
    let mut set = ResultSet::new();
    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, value) = parse_record(line).map_err(|reason| WrapError::parse(lineno, reason))?;
        if !is_identifier(name) {
            return Err(WrapError::parse(lineno, format!("'{name}' is not a valid identifier")));
        }
        if set.contains(name) {
            return Err(WrapError::parse(lineno, format!("duplicate entry '{name}'")));
        }
        set.insert(name, value)
            .map_err(|e| WrapError::parse(lineno, e.to_string()))?;
    }
    Ok(set)
}

type Parsed<T> = std::result::Result<T, String>;

/// Splits off the next space-delimited token.
fn token<'a>(rest: &mut &'a str, what: &str) -> Parsed<&'a str> {
    let s = rest.trim_start();
    if s.is_empty() {
        return Err(format!("missing {what}"));
    }
    let (tok, tail) = s.split_once(' ').unwrap_or((s, ""));
    *rest = tail;
    Ok(tok)
}

fn count(tok: &str, what: &str) -> Parsed<usize> {
    tok.parse::<usize>()
        .map_err(|_| format!("invalid {what} '{tok}'"))
}

fn parse_record(line: &str) -> Parsed<(&str, Value)> {
    let mut rest = line;
    let name = token(&mut rest, "name")?;
    let tag = token(&mut rest, "type tag")?;
    let value = match tag {
        "vector" => {
            let kind = element_kind(token(&mut rest, "element type")?)?;
            let len = count(token(&mut rest, "length")?, "length")?;
            let data = parse_array(kind, rest.trim())?;
            if data.len() != len {
                return Err(format!(
                    "vector '{name}' declares {len} elements but has {}",
                    data.len()
                ));
            }
            Value::Vector(data)
        }
        "matrix" => {
            let kind = element_kind(token(&mut rest, "element type")?)?;
            let nrow = count(token(&mut rest, "row count")?, "row count")?;
            let ncol = count(token(&mut rest, "column count")?, "column count")?;
            let data = parse_array(kind, rest.trim())?;
            let found = data.len();
            Matrix::new(nrow, ncol, data).map(Value::Matrix).ok_or_else(|| {
                format!("matrix '{name}' declares {nrow}x{ncol} but has {found} elements")
            })?
        }
        other => {
            let kind = Kind::from_tag(other).ok_or_else(|| format!("unknown type tag '{other}'"))?;
            parse_scalar(kind, rest.trim())?
        }
    };
    Ok((name, value))
}

fn element_kind(tag: &str) -> Parsed<Kind> {
    Kind::from_tag(tag).ok_or_else(|| format!("unknown element type '{tag}'"))
}

fn parse_logical(tok: &str) -> Parsed<bool> {
    match tok {
        "T" => Ok(true),
        "F" => Ok(false),
        _ => Err(format!("invalid logical '{tok}'")),
    }
}

fn parse_integer(tok: &str) -> Parsed<i64> {
    tok.parse().map_err(|_| format!("invalid integer '{tok}'"))
}

fn parse_float(tok: &str) -> Parsed<f64> {
    match tok {
        "NAN" => Ok(f64::NAN),
        "INF" => Ok(f64::INFINITY),
        "-INF" => Ok(f64::NEG_INFINITY),
        // Rust also accepts "inf"/"nan"; only the spellings above are valid here.
        t if t.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
            Err(format!("invalid float '{tok}'"))
        }
        t => t.parse().map_err(|_| format!("invalid float '{tok}'")),
    }
}

fn parse_scalar(kind: Kind, text: &str) -> Parsed<Value> {
    if text.is_empty() {
        return Err(format!("missing {} value", kind.tag()));
    }
    Ok(match kind {
        Kind::Logical => Value::Logical(parse_logical(text)?),
        Kind::Integer => Value::Integer(parse_integer(text)?),
        Kind::Float => Value::Float(parse_float(text)?),
        Kind::String => Value::String(
            serde_json::from_str(text).map_err(|e| format!("invalid string {text}: {e}"))?,
        ),
    })
}

fn parse_array(kind: Kind, text: &str) -> Parsed<Array> {
    if kind == Kind::String {
        let items: Vec<String> = serde_json::from_str(&format!("[{text}]"))
            .map_err(|e| format!("invalid string list: {e}"))?;
        return Ok(Array::String(items));
    }
    let items: Vec<&str> = if text.is_empty() {
        Vec::new()
    } else {
        text.split(',').map(str::trim).collect()
    };
    Ok(match kind {
        Kind::Logical => Array::Logical(items.into_iter().map(parse_logical).collect::<Parsed<_>>()?),
        Kind::Integer => Array::Integer(items.into_iter().map(parse_integer).collect::<Parsed<_>>()?),
        Kind::Float => Array::Float(items.into_iter().map(parse_float).collect::<Parsed<_>>()?),
        Kind::String => unreachable!("handled above"),
    })
}
