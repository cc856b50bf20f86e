//! Values exchanged with the simulator: scalars, vectors and row-major matrices.

use serde_json::Value as Json;

use crate::error::{Result, WrapError};

/// Element kind shared by scalars and arrays; doubles as the type tag in data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Logical,
    Integer,
    Float,
    String,
}

impl Kind {
    pub fn tag(self) -> &'static str {
        match self {
            Kind::Logical => "logical",
            Kind::Integer => "integer",
            Kind::Float => "float",
            Kind::String => "string",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "logical" => Some(Kind::Logical),
            "integer" => Some(Kind::Integer),
            "float" => Some(Kind::Float),
            "string" => Some(Kind::String),
            _ => None,
        }
    }
}

/// A homogeneous sequence of elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Logical(Vec<bool>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
    String(Vec<String>),
}

impl Array {
    pub fn kind(&self) -> Kind {
        match self {
            Array::Logical(_) => Kind::Logical,
            Array::Integer(_) => Kind::Integer,
            Array::Float(_) => Kind::Float,
            Array::String(_) => Kind::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::Logical(v) => v.len(),
            Array::Integer(v) => v.len(),
            Array::Float(v) => v.len(),
            Array::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_json_items(&self) -> Vec<Json> {
        match self {
            Array::Logical(v) => v.iter().map(|b| Json::Bool(*b)).collect(),
            Array::Integer(v) => v.iter().map(|i| Json::from(*i)).collect(),
            Array::Float(v) => v.iter().map(|f| float_to_json(*f)).collect(),
            Array::String(v) => v.iter().map(|s| Json::String(s.clone())).collect(),
        }
    }
}

/// Types that can be collected into an [`Array`].
pub trait Element: Sized {
    fn into_array(items: Vec<Self>) -> Array;
}

impl Element for bool {
    fn into_array(items: Vec<Self>) -> Array {
        Array::Logical(items)
    }
}

impl Element for i64 {
    fn into_array(items: Vec<Self>) -> Array {
        Array::Integer(items)
    }
}

impl Element for i32 {
    fn into_array(items: Vec<Self>) -> Array {
        Array::Integer(items.into_iter().map(i64::from).collect())
    }
}

impl Element for f64 {
    fn into_array(items: Vec<Self>) -> Array {
        Array::Float(items)
    }
}

impl Element for String {
    fn into_array(items: Vec<Self>) -> Array {
        Array::String(items)
    }
}

impl Element for &str {
    fn into_array(items: Vec<Self>) -> Array {
        Array::String(items.into_iter().map(str::to_string).collect())
    }
}

/// A 2D array stored row-major. `nrow * ncol == data.len()` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    nrow: usize,
    ncol: usize,
    data: Array,
}

impl Matrix {
    /// Returns `None` when the shape does not match the element count.
    pub fn new(nrow: usize, ncol: usize, data: Array) -> Option<Self> {
        (nrow.checked_mul(ncol)? == data.len()).then_some(Self { nrow, ncol, data })
    }

    /// Builds a matrix from rows; `None` if the rows are ragged.
    pub fn from_rows<T: Element>(rows: Vec<Vec<T>>) -> Option<Self> {
        let nrow = rows.len();
        let ncol = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ncol) {
            return None;
        }
        let flat: Vec<T> = rows.into_iter().flatten().collect();
        Self::new(nrow, ncol, T::into_array(flat))
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    pub fn data(&self) -> &Array {
        &self.data
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Vector(Array),
    Matrix(Matrix),
}

impl Value {
    /// Converts dynamic JSON into a value.
    ///
    /// Arrays mixing integers and floats are promoted to float; an empty array
    /// becomes an empty float vector. Any other mix of element types, `null`,
    /// objects, ragged rows and nesting beyond two levels are rejected.
    pub fn from_json(name: &str, json: &Json) -> Result<Self> {
        match json {
            Json::Bool(b) => Ok(Value::Logical(*b)),
            Json::Number(n) => number(name, n).map(|s| match s {
                Scalar::Int(i) => Value::Integer(i),
                Scalar::Float(f) => Value::Float(f),
            }),
            Json::String(s) => Ok(Value::String(s.clone())),
            Json::Array(items) if !items.is_empty() && items.iter().all(Json::is_array) => {
                let rows: Vec<&Vec<Json>> = items.iter().filter_map(Json::as_array).collect();
                let ncol = rows[0].len();
                if rows.iter().any(|r| r.len() != ncol) {
                    return Err(WrapError::serialization(name, "matrix rows have different lengths"));
                }
                let flat: Vec<Json> = rows.iter().flat_map(|r| r.iter().cloned()).collect();
                let data = classify(name, &flat)?;
                Matrix::new(rows.len(), ncol, data)
                    .map(Value::Matrix)
                    .ok_or_else(|| WrapError::serialization(name, "matrix shape overflow"))
            }
            Json::Array(items) => classify(name, items).map(Value::Vector),
            Json::Null => Err(WrapError::serialization(name, "null is not supported")),
            Json::Object(_) => Err(WrapError::serialization(name, "objects are not supported")),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Value::Logical(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Float(f) => float_to_json(*f),
            Value::String(s) => Json::String(s.clone()),
            Value::Vector(a) => Json::Array(a.to_json_items()),
            Value::Matrix(m) => {
                let items = m.data.to_json_items();
                if m.ncol == 0 {
                    return Json::Array(vec![Json::Array(Vec::new()); m.nrow]);
                }
                Json::Array(
                    items
                        .chunks(m.ncol)
                        .map(|row| Json::Array(row.to_vec()))
                        .collect(),
                )
            }
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Logical(_) => Kind::Logical,
            Value::Integer(_) => Kind::Integer,
            Value::Float(_) => Kind::Float,
            Value::String(_) => Kind::String,
            Value::Vector(a) => a.kind(),
            Value::Matrix(m) => m.data.kind(),
        }
    }
}

enum Scalar {
    Int(i64),
    Float(f64),
}

fn number(name: &str, n: &serde_json::Number) -> Result<Scalar> {
    if let Some(i) = n.as_i64() {
        Ok(Scalar::Int(i))
    } else if n.is_u64() {
        Err(WrapError::serialization(name, format!("integer {n} does not fit in 64 bits")))
    } else {
        n.as_f64()
            .map(Scalar::Float)
            .ok_or_else(|| WrapError::serialization(name, format!("unsupported number {n}")))
    }
}

fn classify(name: &str, items: &[Json]) -> Result<Array> {
    if items.is_empty() {
        return Ok(Array::Float(Vec::new()));
    }
    if items.iter().any(Json::is_array) {
        return Err(WrapError::serialization(name, "arrays with more than 2 dimensions are not supported"));
    }
    if let Some(bools) = items.iter().map(Json::as_bool).collect::<Option<Vec<_>>>() {
        return Ok(Array::Logical(bools));
    }
    if let Some(strings) = items
        .iter()
        .map(|j| j.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    {
        return Ok(Array::String(strings));
    }
    if items.iter().all(Json::is_number) {
        let scalars = items
            .iter()
            .filter_map(|j| match j {
                Json::Number(n) => Some(number(name, n)),
                _ => None,
            })
            .collect::<Result<Vec<_>>>()?;
        if scalars.iter().all(|s| matches!(s, Scalar::Int(_))) {
            return Ok(Array::Integer(
                scalars
                    .into_iter()
                    .filter_map(|s| match s {
                        Scalar::Int(i) => Some(i),
                        Scalar::Float(_) => None,
                    })
                    .collect(),
            ));
        }
        return Ok(Array::Float(
            scalars
                .into_iter()
                .map(|s| match s {
                    Scalar::Int(i) => i as f64,
                    Scalar::Float(f) => f,
                })
                .collect(),
        ));
    }
    Err(WrapError::serialization(
        name,
        "array elements must all be logical, all numeric or all strings",
    ))
}

fn float_to_json(f: f64) -> Json {
    serde_json::Number::from_f64(f)
        .map(Json::Number)
        .unwrap_or_else(|| Json::String(crate::codec::format_float(f)))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Logical(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Element> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Vector(T::into_array(v))
    }
}

impl From<Matrix> for Value {
    fn from(m: Matrix) -> Self {
        Value::Matrix(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matrix_shape_must_match() {
        assert!(Matrix::new(2, 2, Array::Integer(vec![1, 2, 3])).is_none());
        assert!(Matrix::from_rows(vec![vec![1, 2], vec![3]]).is_none());
        let m = Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!((m.nrow(), m.ncol()), (2, 2));
        assert_eq!(m.data(), &Array::Integer(vec![1, 2, 3, 4]));
    }

    #[test]
    fn json_scalars() {
        assert_eq!(Value::from_json("a", &json!(true)).unwrap(), Value::Logical(true));
        assert_eq!(Value::from_json("a", &json!(2)).unwrap(), Value::Integer(2));
        assert_eq!(Value::from_json("a", &json!(2.0)).unwrap(), Value::Float(2.0));
        assert_eq!(Value::from_json("a", &json!("x")).unwrap(), Value::from("x"));
        assert!(Value::from_json("a", &json!(null)).is_err());
        assert!(Value::from_json("a", &json!({"k": 1})).is_err());
        assert!(Value::from_json("a", &json!(u64::MAX)).is_err());
    }

    #[test]
    fn mixed_numbers_promote_to_float() {
        let v = Value::from_json("a", &json!([1, 2.5, 3])).unwrap();
        assert_eq!(v, Value::Vector(Array::Float(vec![1.0, 2.5, 3.0])));

        let m = Value::from_json("m", &json!([[1, 2], [3, 4.5]])).unwrap();
        assert_eq!(m.kind(), Kind::Float);
    }

    #[test]
    fn incompatible_mixes_are_rejected() {
        let err = Value::from_json("a", &json!([1, true])).unwrap_err();
        assert!(matches!(err, WrapError::Serialization { ref name, .. } if name == "a"));
        assert!(Value::from_json("a", &json!(["x", 1])).is_err());
        assert!(Value::from_json("a", &json!([[1], 2])).is_err());
        assert!(Value::from_json("a", &json!([[[1]]])).is_err());
        assert!(Value::from_json("a", &json!([[1, 2], [3]])).is_err());
    }

    #[test]
    fn empty_array_is_empty_float_vector() {
        let v = Value::from_json("a", &json!([])).unwrap();
        assert_eq!(v, Value::Vector(Array::Float(vec![])));
    }

    #[test]
    fn matrix_json_is_row_major() {
        let m = Value::from(Matrix::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap());
        assert_eq!(m.to_json(), json!([[1, 2], [3, 4]]));
        assert_eq!(Value::from_json("m", &m.to_json()).unwrap(), m);
    }

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(Value::Float(f64::INFINITY).to_json(), json!("INF"));
    }
}
