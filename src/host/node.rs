use crate::foundation::error::NodeResult;
use crate::host::context::HostContext;
use crate::host::schema::{Args, NodeOutput, NodeSchema, OutputDecl, Resolved};

/// Menu category every node in this collection registers under.
pub const CATEGORY: &str = "OCS Nodes";

/// Plugin contract: a declared input schema, declared outputs, and one entry point.
pub trait Node: Send + Sync {
    /// Stable identifier used in saved workflows.
    fn class_name(&self) -> &'static str;

    /// Human-facing title.
    fn display_name(&self) -> &'static str;

    fn category(&self) -> &'static str {
        CATEGORY
    }

    fn description(&self) -> Option<&'static str> {
        None
    }

    fn schema(&self) -> NodeSchema;

    fn outputs(&self) -> &'static [OutputDecl];

    /// Output nodes are evaluated for their side effects even when nothing consumes them.
    fn is_output_node(&self) -> bool {
        false
    }

    /// When set the host passes every input as a list (whole batches of list items).
    fn input_is_list(&self) -> bool {
        false
    }

    /// Run on inputs already matched against [`Node::schema`].
    fn execute(&self, inputs: &Resolved, ctx: &HostContext) -> NodeResult<NodeOutput>;

    /// Resolve `args` against the schema, then execute.
    fn invoke(&self, args: &Args, ctx: &HostContext) -> NodeResult<NodeOutput> {
        let inputs = self.schema().resolve(args)?;
        tracing::debug!(node = self.class_name(), "invoke");
        self.execute(&inputs, ctx)
    }
}
