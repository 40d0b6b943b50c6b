use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::ImageBatch;
use crate::foundation::value::Value;
use crate::host::context::HostContext;
use crate::host::node::Node;
use crate::host::schema::{InputDecl, NodeOutput, NodeSchema, OutputDecl, Resolved};

/// Survivors of [`filter_images`] and the indices that were dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterOutcome {
    pub kept: Vec<ImageBatch>,
    pub removed: Vec<usize>,
}

impl FilterOutcome {
    /// Removed indices as the host displays them, e.g. `"0, 3"`.
    pub fn removed_indices(&self) -> String {
        self.removed
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Drop images whose width is `<= width_min` or height is `<= height_min`.
///
/// A minimum of 0 disables that dimension. If nothing survives and a fallback is given, the
/// fallback becomes the only output.
pub fn filter_images(
    images: &[ImageBatch],
    width_min: u32,
    height_min: u32,
    fallback: Option<ImageBatch>,
) -> FilterOutcome {
    let too_small = |extent: usize, min: u32| min > 0 && extent <= min as usize;

    let mut kept = Vec::with_capacity(images.len());
    let mut removed = Vec::new();
    for (idx, img) in images.iter().enumerate() {
        if too_small(img.width(), width_min) || too_small(img.height(), height_min) {
            removed.push(idx);
        } else {
            kept.push(img.clone());
        }
    }

    if kept.is_empty()
        && let Some(fb) = fallback
    {
        kept.push(fb);
    }

    FilterOutcome { kept, removed }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageListFilter;

const OUTPUTS: [OutputDecl; 2] = [
    OutputDecl::list("images", "IMAGE"),
    OutputDecl::new("removed_indices", "STRING"),
];

fn min_arg(inputs: &Resolved, label: &str) -> NodeResult<u32> {
    u32::try_from(inputs.int(label)?)
        .map_err(|_| NodeError::validation(format!("'{label}' must fit in u32")))
}

impl Node for ImageListFilter {
    fn class_name(&self) -> &'static str {
        "OCS_ImageListFilter"
    }

    fn display_name(&self) -> &'static str {
        "Image List Filter"
    }

    fn description(&self) -> Option<&'static str> {
        Some(
            "Removes images at or below a minimum width/height (0 means no limit). \
             Outputs the fallback image when every image is removed.",
        )
    }

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
            .required(InputDecl::image("images"))
            .required(InputDecl::int("width_min", 0, 0, i64::from(u32::MAX)))
            .required(InputDecl::int("height_min", 0, 0, i64::from(u32::MAX)))
            .optional(InputDecl::image("fallback_image"))
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &OUTPUTS
    }

    fn input_is_list(&self) -> bool {
        true
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        let images = match inputs.get("images") {
            Some(v) => v.to_image_list()?,
            None => Vec::new(),
        };
        let width_min = min_arg(inputs, "width_min")?;
        let height_min = min_arg(inputs, "height_min")?;
        let fallback = inputs.optional_image("fallback_image")?;

        let outcome = filter_images(&images, width_min, height_min, fallback);
        tracing::debug!(
            kept = outcome.kept.len(),
            removed = outcome.removed.len(),
            "image list filter"
        );
        let removed = outcome.removed_indices();
        Ok(NodeOutput::new(vec![
            Value::ImageList(outcome.kept),
            Value::String(removed),
        ]))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/image_list_filter.rs"]
mod tests;
