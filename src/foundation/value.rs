use std::collections::BTreeMap;

use ndarray::Array4;

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::{ImageBatch, Latent};

/// Payload carried on a node socket.
///
/// The host wires sockets dynamically, so node entry points receive and return these
/// values and convert to concrete types at the boundary.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Strings(Vec<String>),
    Image(ImageBatch),
    /// Raw `0..=255` pixels, as produced by some loaders.
    ImageU8(Array4<u8>),
    ImageList(Vec<ImageBatch>),
    Latent(Latent),
    /// Model/clip bundle passed between loader nodes; `None` entries are unset slots.
    Context(BTreeMap<String, Option<Value>>),
    Json(serde_json::Value),
    /// Host-side list wrapping (list-input nodes receive every socket as a list).
    List(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Bool(_) => "BOOLEAN",
            Value::String(_) => "STRING",
            Value::Strings(_) => "STRING[]",
            Value::Image(_) | Value::ImageU8(_) => "IMAGE",
            Value::ImageList(_) => "IMAGE[]",
            Value::Latent(_) => "LATENT",
            Value::Context(_) => "CONTEXT",
            Value::Json(_) => "JSON",
            Value::List(_) => "LIST",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Unwrap host list wrapping of a scalar widget value.
    pub fn unwrap_single(&self) -> &Value {
        match self {
            Value::List(items) if items.len() == 1 => items[0].unwrap_single(),
            other => other,
        }
    }

    pub fn as_int(&self) -> NodeResult<i64> {
        match self.unwrap_single() {
            Value::Int(v) => Ok(*v),
            Value::Float(v) if v.fract() == 0.0 => Ok(*v as i64),
            other => Err(type_mismatch("INT", other)),
        }
    }

    pub fn as_float(&self) -> NodeResult<f64> {
        match self.unwrap_single() {
            Value::Float(v) => Ok(*v),
            Value::Int(v) => Ok(*v as f64),
            other => Err(type_mismatch("FLOAT", other)),
        }
    }

    pub fn as_bool(&self) -> NodeResult<bool> {
        match self.unwrap_single() {
            Value::Bool(v) => Ok(*v),
            other => Err(type_mismatch("BOOLEAN", other)),
        }
    }

    pub fn as_str(&self) -> NodeResult<&str> {
        match self.unwrap_single() {
            Value::String(v) => Ok(v.as_str()),
            other => Err(type_mismatch("STRING", other)),
        }
    }

    /// Coerce to a 4-D float image batch.
    ///
    /// `u8` tensors are normalized to `0..=1`; lists yield their first element.
    pub fn to_image(&self) -> NodeResult<ImageBatch> {
        match self {
            Value::Image(img) => Ok(img.clone()),
            Value::ImageU8(raw) => ImageBatch::from_u8(raw),
            Value::ImageList(list) => list
                .first()
                .cloned()
                .ok_or_else(|| NodeError::validation("empty image list")),
            Value::List(items) => items
                .first()
                .ok_or_else(|| NodeError::validation("empty image list"))?
                .to_image(),
            other => Err(type_mismatch("IMAGE", other)),
        }
    }

    /// Coerce to a list of image batches, one entry per list element.
    pub fn to_image_list(&self) -> NodeResult<Vec<ImageBatch>> {
        match self {
            Value::ImageList(list) => Ok(list.clone()),
            Value::List(items) => items.iter().map(Value::to_image).collect(),
            Value::Image(_) | Value::ImageU8(_) => Ok(vec![self.to_image()?]),
            other => Err(type_mismatch("IMAGE[]", other)),
        }
    }
}

impl From<ImageBatch> for Value {
    fn from(img: ImageBatch) -> Self {
        Value::Image(img)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

fn type_mismatch(expected: &str, got: &Value) -> NodeError {
    NodeError::validation(format!("expected {expected}, got {}", got.type_name()))
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/value.rs"]
mod tests;
