use ndarray::{Array4, ArrayView4, Axis};

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::ImageBatch;
use crate::foundation::value::Value;
use crate::host::context::HostContext;
use crate::host::node::Node;
use crate::host::schema::{InputDecl, NodeOutput, NodeSchema, OutputDecl, Resolved};

pub const GRID_SIDE: usize = 4;

/// Socket labels in row-major order: `image_r1c1` .. `image_r4c4`.
pub const TILE_LABELS: [&str; GRID_SIDE * GRID_SIDE] = [
    "image_r1c1",
    "image_r1c2",
    "image_r1c3",
    "image_r1c4",
    "image_r2c1",
    "image_r2c2",
    "image_r2c3",
    "image_r2c4",
    "image_r3c1",
    "image_r3c2",
    "image_r3c3",
    "image_r3c4",
    "image_r4c1",
    "image_r4c2",
    "image_r4c3",
    "image_r4c4",
];

/// Tile 16 images row-major into a 4x4 grid.
///
/// Each row joins its tiles along width, then rows stack along height. Tiles in a row must
/// share height; rows must end up equally wide. Batch and channel counts must all agree.
pub fn compose_grid(tiles: &[ImageBatch]) -> NodeResult<ImageBatch> {
    if tiles.len() != GRID_SIDE * GRID_SIDE {
        return Err(NodeError::validation(format!(
            "grid needs {} tiles, got {}",
            GRID_SIDE * GRID_SIDE,
            tiles.len()
        )));
    }

    let mut rows: Vec<Array4<f32>> = Vec::with_capacity(GRID_SIDE);
    for (r, row) in tiles.chunks_exact(GRID_SIDE).enumerate() {
        let views: Vec<ArrayView4<'_, f32>> = row.iter().map(|t| t.data().view()).collect();
        let joined = ndarray::concatenate(Axis(2), &views)
            .map_err(|e| NodeError::shape(format!("grid row {}: {e}", r + 1)))?;
        rows.push(joined);
    }

    let views: Vec<ArrayView4<'_, f32>> = rows.iter().map(|r| r.view()).collect();
    let grid = ndarray::concatenate(Axis(1), &views)
        .map_err(|e| NodeError::shape(format!("grid rows: {e}")))?;
    ImageBatch::new(grid)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageGrid4x4;

const OUTPUTS: [OutputDecl; 1] = [OutputDecl::new("IMAGE", "IMAGE")];

impl Node for ImageGrid4x4 {
    fn class_name(&self) -> &'static str {
        "OCS_ImageGrid4x4"
    }

    fn display_name(&self) -> &'static str {
        "Image Grid 4x4"
    }

    fn description(&self) -> Option<&'static str> {
        Some("Concatenates the 16 input images into a 4x4 grid.")
    }

    fn schema(&self) -> NodeSchema {
        TILE_LABELS
            .into_iter()
            .fold(NodeSchema::new(), |s, label| s.required(InputDecl::image(label)))
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &OUTPUTS
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        let tiles = TILE_LABELS
            .iter()
            .map(|label| inputs.image(label))
            .collect::<NodeResult<Vec<_>>>()?;
        let grid = compose_grid(&tiles)?;
        Ok(NodeOutput::new(vec![Value::Image(grid)]))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/image_grid.rs"]
mod tests;
