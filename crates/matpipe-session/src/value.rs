use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Variables keyed by name, as moved in and out of the engine workspace.
pub type Workspace = BTreeMap<String, Value>;

/// A value held by an engine variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Character data.
    Text(String),
    /// A plain number, collapsed from a zero-dimensional array.
    Scalar(f64),
    /// A numeric n-dimensional array.
    Array(Array),
}

/// Dense numeric array with an explicit shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Array {
    /// Build an array; `None` if `data` does not fill `shape` exactly.
    pub fn from_shape(shape: Vec<usize>, data: Vec<f64>) -> Option<Self> {
        if shape.iter().product::<usize>() != data.len() {
            return None;
        }
        Some(Self { shape, data })
    }

    /// One-dimensional array.
    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Zero-dimensional array holding one element.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::Array(Array::vector(value))
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

/// Post-process a decoded value.
///
/// Text passes through. Arrays lose trailing singleton dimensions one at a
/// time, so `(n, 1)` becomes `(n)` and `(1)` becomes `()`. With
/// `extract_scalars`, a zero-dimensional array becomes [`Value::Scalar`].
pub fn normalize(value: Value, extract_scalars: bool) -> Value {
    match value {
        Value::Array(mut array) => {
            while array.shape.last() == Some(&1) {
                array.shape.pop();
            }
            if extract_scalars && array.shape.is_empty() && array.data.len() == 1 {
                Value::Scalar(array.data[0])
            } else {
                Value::Array(array)
            }
        }
        other => other,
    }
}
