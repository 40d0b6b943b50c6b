use std::collections::BTreeMap;

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::ImageBatch;
use crate::foundation::value::Value;

/// Widget or socket type of a declared input.
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    Int {
        default: i64,
        min: i64,
        max: i64,
    },
    Float {
        default: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    Bool {
        default: bool,
    },
    String {
        default: String,
        multiline: bool,
    },
    /// Dropdown; the first option is the default.
    Combo {
        options: Vec<String>,
    },
    Image,
    /// Wildcard socket accepting any value.
    Any,
    /// Value injected by the host (node id, workflow info), never shown as a widget.
    Hidden,
}

impl InputKind {
    fn default_value(&self) -> Value {
        match self {
            InputKind::Int { default, .. } => Value::Int(*default),
            InputKind::Float { default, .. } => Value::Float(*default),
            InputKind::Bool { default } => Value::Bool(*default),
            InputKind::String { default, .. } => Value::String(default.clone()),
            InputKind::Combo { options } => options
                .first()
                .map(|o| Value::String(o.clone()))
                .unwrap_or_default(),
            InputKind::Image | InputKind::Any | InputKind::Hidden => Value::None,
        }
    }

    fn type_tag(&self) -> &'static str {
        match self {
            InputKind::Int { .. } => "INT",
            InputKind::Float { .. } => "FLOAT",
            InputKind::Bool { .. } => "BOOLEAN",
            InputKind::String { .. } => "STRING",
            InputKind::Combo { .. } => "COMBO",
            InputKind::Image => "IMAGE",
            InputKind::Any => "*",
            InputKind::Hidden => "HIDDEN",
        }
    }
}

/// One declared input: a label and its kind.
#[derive(Clone, Debug, PartialEq)]
pub struct InputDecl {
    pub label: &'static str,
    pub kind: InputKind,
    pub tooltip: Option<&'static str>,
}

impl InputDecl {
    pub fn new(label: &'static str, kind: InputKind) -> Self {
        Self {
            label,
            kind,
            tooltip: None,
        }
    }

    pub fn int(label: &'static str, default: i64, min: i64, max: i64) -> Self {
        Self::new(label, InputKind::Int { default, min, max })
    }

    pub fn float(label: &'static str, default: f64, min: f64, max: f64, step: f64) -> Self {
        Self::new(
            label,
            InputKind::Float {
                default,
                min,
                max,
                step,
            },
        )
    }

    pub fn bool(label: &'static str, default: bool) -> Self {
        Self::new(label, InputKind::Bool { default })
    }

    pub fn string(label: &'static str, default: impl Into<String>, multiline: bool) -> Self {
        Self::new(
            label,
            InputKind::String {
                default: default.into(),
                multiline,
            },
        )
    }

    pub fn combo<S: AsRef<str>>(label: &'static str, options: &[S]) -> Self {
        Self::new(
            label,
            InputKind::Combo {
                options: options.iter().map(|o| o.as_ref().to_string()).collect(),
            },
        )
    }

    pub fn image(label: &'static str) -> Self {
        Self::new(label, InputKind::Image)
    }

    pub fn any(label: &'static str) -> Self {
        Self::new(label, InputKind::Any)
    }

    pub fn hidden(label: &'static str) -> Self {
        Self::new(label, InputKind::Hidden)
    }

    pub fn tooltip(mut self, tooltip: &'static str) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    /// Check a supplied value against the declared kind and normalize list wrapping.
    fn check(&self, value: &Value) -> NodeResult<Value> {
        let label = self.label;
        match &self.kind {
            InputKind::Int { min, max, .. } => {
                let v = value.as_int()?;
                if v < *min || v > *max {
                    return Err(NodeError::validation(format!(
                        "'{label}' = {v} is outside {min}..={max}"
                    )));
                }
                Ok(Value::Int(v))
            }
            InputKind::Float { min, max, .. } => {
                let v = value.as_float()?;
                if !v.is_finite() || v < *min || v > *max {
                    return Err(NodeError::validation(format!(
                        "'{label}' = {v} is outside {min}..={max}"
                    )));
                }
                Ok(Value::Float(v))
            }
            InputKind::Bool { .. } => Ok(Value::Bool(value.as_bool()?)),
            InputKind::String { .. } => Ok(Value::String(value.as_str()?.to_string())),
            InputKind::Combo { options } => {
                let v = value.as_str()?;
                if !options.iter().any(|o| o == v) {
                    return Err(NodeError::validation(format!(
                        "'{label}' has no option '{v}'"
                    )));
                }
                Ok(Value::String(v.to_string()))
            }
            InputKind::Image | InputKind::Any | InputKind::Hidden => Ok(value.clone()),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        let mut opts = serde_json::Map::new();
        match &self.kind {
            InputKind::Int { default, min, max } => {
                opts.insert("default".into(), (*default).into());
                opts.insert("min".into(), (*min).into());
                opts.insert("max".into(), (*max).into());
            }
            InputKind::Float {
                default,
                min,
                max,
                step,
            } => {
                opts.insert("default".into(), (*default).into());
                opts.insert("min".into(), (*min).into());
                opts.insert("max".into(), (*max).into());
                opts.insert("step".into(), (*step).into());
            }
            InputKind::Bool { default } => {
                opts.insert("default".into(), (*default).into());
            }
            InputKind::String { default, multiline } => {
                opts.insert("default".into(), default.clone().into());
                opts.insert("multiline".into(), (*multiline).into());
            }
            InputKind::Combo { options } => {
                return serde_json::json!([options]);
            }
            InputKind::Image | InputKind::Any | InputKind::Hidden => {}
        }
        if let Some(tooltip) = self.tooltip {
            opts.insert("tooltip".into(), tooltip.into());
        }
        if opts.is_empty() {
            serde_json::json!([self.kind.type_tag()])
        } else {
            serde_json::json!([self.kind.type_tag(), opts])
        }
    }
}

/// Declared output socket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputDecl {
    pub name: &'static str,
    pub kind: &'static str,
    pub is_list: bool,
}

impl OutputDecl {
    pub const fn new(name: &'static str, kind: &'static str) -> Self {
        Self {
            name,
            kind,
            is_list: false,
        }
    }

    pub const fn list(name: &'static str, kind: &'static str) -> Self {
        Self {
            name,
            kind,
            is_list: true,
        }
    }
}

/// Input contract of a node: required, optional and hidden declarations in positional order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeSchema {
    pub required: Vec<InputDecl>,
    pub optional: Vec<InputDecl>,
    pub hidden: Vec<InputDecl>,
}

impl NodeSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, decl: InputDecl) -> Self {
        self.required.push(decl);
        self
    }

    pub fn optional(mut self, decl: InputDecl) -> Self {
        self.optional.push(decl);
        self
    }

    pub fn hidden(mut self, decl: InputDecl) -> Self {
        self.hidden.push(decl);
        self
    }

    /// Match call arguments against the declarations.
    ///
    /// Each label is looked up by keyword first, then by position among the required and
    /// optional inputs. Missing optional inputs take their widget default.
    pub fn resolve(&self, args: &Args) -> NodeResult<Resolved> {
        let mut values = BTreeMap::new();

        for (pos, decl) in self.required.iter().enumerate() {
            let Some(raw) = args.lookup(decl.label, Some(pos)) else {
                return Err(NodeError::validation(format!(
                    "Missing required argument: {}",
                    decl.label
                )));
            };
            values.insert(decl.label.to_string(), decl.check(raw)?);
        }

        let offset = self.required.len();
        for (i, decl) in self.optional.iter().enumerate() {
            let value = match args.lookup(decl.label, Some(offset + i)) {
                Some(raw) if !raw.is_none() => decl.check(raw)?,
                _ => decl.kind.default_value(),
            };
            values.insert(decl.label.to_string(), value);
        }

        for decl in &self.hidden {
            let value = args.lookup(decl.label, None).cloned().unwrap_or_default();
            values.insert(decl.label.to_string(), value);
        }

        Ok(Resolved { values })
    }

    /// Host-facing description of the inputs, keyed by section.
    pub fn to_json(&self) -> serde_json::Value {
        fn section(decls: &[InputDecl]) -> serde_json::Value {
            decls
                .iter()
                .map(|d| (d.label.to_string(), d.to_json()))
                .collect::<serde_json::Map<_, _>>()
                .into()
        }

        let mut out = serde_json::Map::new();
        out.insert("required".into(), section(&self.required));
        if !self.optional.is_empty() {
            out.insert("optional".into(), section(&self.optional));
        }
        if !self.hidden.is_empty() {
            out.insert("hidden".into(), section(&self.hidden));
        }
        out.into()
    }
}

/// Call arguments as the host passes them: positional values and keyword values.
#[derive(Clone, Debug, Default)]
pub struct Args {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword argument.
    pub fn with(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(label.into(), value.into());
        self
    }

    /// Append a positional argument.
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    fn lookup(&self, label: &str, pos: Option<usize>) -> Option<&Value> {
        if let Some(v) = self.keyword.get(label) {
            return Some(v);
        }
        pos.and_then(|p| self.positional.get(p))
    }
}

/// Inputs after schema resolution; every declared label is present.
#[derive(Clone, Debug, Default)]
pub struct Resolved {
    values: BTreeMap<String, Value>,
}

impl Resolved {
    /// Raw value for `label`, `None` when unset.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.values.get(label).filter(|v| !v.is_none())
    }

    fn require(&self, label: &str) -> NodeResult<&Value> {
        self.get(label)
            .ok_or_else(|| NodeError::validation(format!("Missing required argument: {label}")))
    }

    pub fn int(&self, label: &str) -> NodeResult<i64> {
        self.require(label)?.as_int()
    }

    pub fn float(&self, label: &str) -> NodeResult<f64> {
        self.require(label)?.as_float()
    }

    pub fn bool(&self, label: &str) -> NodeResult<bool> {
        self.require(label)?.as_bool()
    }

    pub fn string(&self, label: &str) -> NodeResult<String> {
        Ok(self.require(label)?.as_str()?.to_string())
    }

    pub fn image(&self, label: &str) -> NodeResult<ImageBatch> {
        self.require(label)?.to_image()
    }

    pub fn optional_image(&self, label: &str) -> NodeResult<Option<ImageBatch>> {
        self.get(label).map(Value::to_image).transpose()
    }
}

/// Result of a node invocation: output values in declaration order plus an optional UI
/// payload for output nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeOutput {
    pub values: Vec<Value>,
    pub ui: Option<serde_json::Value>,
}

impl NodeOutput {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, ui: None }
    }

    pub fn with_ui(mut self, ui: serde_json::Value) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/schema.rs"]
mod tests;
