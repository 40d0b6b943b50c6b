use crate::foundation::error::NodeResult;
use crate::foundation::value::Value;
use crate::host::context::HostContext;
use crate::host::node::Node;
use crate::host::schema::{InputDecl, NodeOutput, NodeSchema, OutputDecl, Resolved};

fn looks_like_context(value: &Value) -> bool {
    matches!(value, Value::Context(map) if map.contains_key("model") && map.contains_key("clip"))
}

/// `None`, or a model/clip context whose slots are all unset.
pub fn is_effectively_none(value: &Value) -> bool {
    match value {
        Value::None => true,
        Value::Context(map) if looks_like_context(value) => {
            map.values().all(|slot| slot.as_ref().is_none_or(Value::is_none))
        }
        _ => false,
    }
}

/// First candidate that carries data, else [`Value::None`].
pub fn first_not_empty<'a>(candidates: impl IntoIterator<Item = &'a Value>) -> Value {
    candidates
        .into_iter()
        .find(|v| !is_effectively_none(v))
        .cloned()
        .unwrap_or_default()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FirstNotEmpty;

const OUTPUTS: [OutputDecl; 1] = [OutputDecl::new("value", "*")];

impl Node for FirstNotEmpty {
    fn class_name(&self) -> &'static str {
        "OCS_FirstNotEmpty"
    }

    fn display_name(&self) -> &'static str {
        "First Not Empty"
    }

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
            .optional(InputDecl::any("first"))
            .optional(InputDecl::any("second"))
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &OUTPUTS
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        let none = Value::None;
        let first = inputs.get("first").unwrap_or(&none);
        let second = inputs.get("second").unwrap_or(&none);
        Ok(NodeOutput::new(vec![first_not_empty([first, second])]))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/first_not_empty.rs"]
mod tests;
