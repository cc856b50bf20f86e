//! Renders values as Eidos definitions for SLiM's `-d` flag.

use crate::codec::format_float;
use crate::params::ParameterSet;
use crate::value::{Array, Value};

/// Dictionary holding every constant of a run, e.g. for tree-sequence metadata.
pub const PARAMS_DICTIONARY: &str = "SLIM_WRAP_PARAMS";

/// Escapes `s` for use inside a single-quoted Eidos string literal.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn float_literal(f: f64) -> String {
    if f.is_finite() {
        format!("{f:?}")
    } else {
        format_float(f)
    }
}

fn elements(array: &Array) -> (&'static str, Vec<String>) {
    match array {
        Array::Logical(v) => (
            "asLogical",
            v.iter().map(|b| if *b { "T" } else { "F" }.to_string()).collect(),
        ),
        Array::Integer(v) => ("asInteger", v.iter().map(i64::to_string).collect()),
        Array::Float(v) => ("asFloat", v.iter().map(|f| float_literal(*f)).collect()),
        Array::String(v) => ("asString", v.iter().map(|s| format!("'{}'", escape(s))).collect()),
    }
}

fn coerced(array: &Array) -> String {
    let (cast, items) = elements(array);
    format!("{cast}(c({}))", items.join(","))
}

/// The right-hand side of a definition, e.g. `asFloat(c(1.2,1.3))`.
pub fn expression(value: &Value) -> String {
    match value {
        Value::Logical(b) => coerced(&Array::Logical(vec![*b])),
        Value::Integer(i) => coerced(&Array::Integer(vec![*i])),
        Value::Float(f) => coerced(&Array::Float(vec![*f])),
        Value::String(s) => coerced(&Array::String(vec![s.clone()])),
        Value::Vector(a) => coerced(a),
        Value::Matrix(m) => format!(
            "matrix({}, nrow={}, ncol={}, byrow=T)",
            coerced(m.data()),
            m.nrow(),
            m.ncol()
        ),
    }
}

/// A full definition: `name=expression`.
pub fn define(name: &str, value: &Value) -> String {
    format!("{name}={}", expression(value))
}

/// `SLIM_WRAP_PARAMS=Dictionary('k1', <expr>, 'k2', <expr>, ...)`
pub fn dictionary(params: &ParameterSet) -> String {
    let pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("'{}', {}", escape(k), expression(v)))
        .collect();
    format!("{PARAMS_DICTIONARY}=Dictionary({})", pairs.join(", "))
}
