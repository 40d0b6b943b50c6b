//! Dimension preset nodes: map a named preset to width/height and emit an empty latent.

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::Latent;
use crate::foundation::value::Value;
use crate::host::context::HostContext;
use crate::host::node::Node;
use crate::host::schema::{InputDecl, NodeOutput, NodeSchema, OutputDecl, Resolved};

pub const CUSTOM: &str = "custom";

pub const CUSTOM_MIN: i64 = 64;
pub const CUSTOM_MAX: i64 = 8192;
pub const BATCH_MIN: i64 = 1;
pub const BATCH_MAX: i64 = 64;

/// One row of a preset dropdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresetRow {
    /// Use the custom width/height widgets.
    Custom,
    /// Group heading; selecting it behaves like [`PresetRow::Custom`] where custom is allowed.
    Separator(&'static str),
    Size {
        label: &'static str,
        width: u32,
        height: u32,
    },
}

impl PresetRow {
    pub fn label(&self) -> &'static str {
        match *self {
            PresetRow::Custom => CUSTOM,
            PresetRow::Separator(label) => label,
            PresetRow::Size { label, .. } => label,
        }
    }
}

const fn size(label: &'static str, width: u32, height: u32) -> PresetRow {
    PresetRow::Size {
        label,
        width,
        height,
    }
}

/// A preset dropdown and whether it offers custom dimensions.
#[derive(Clone, Copy, Debug)]
pub struct PresetTable {
    pub rows: &'static [PresetRow],
    pub allows_custom: bool,
}

pub const CLOUD_IMAGE_PRESETS: PresetTable = PresetTable {
    rows: &[
        PresetRow::Separator("------ OpenAI GPT-image-1 ------"),
        size("1536x1024 (3:2 | 1.6MP)", 1536, 1024),
        size("1024x1536 (2:3 | 1.6MP)", 1024, 1536),
        size("1024x1024 (1:1 | 1MP)", 1024, 1024),
    ],
    allows_custom: false,
};

pub const LOCAL_IMAGE_PRESETS: PresetTable = PresetTable {
    rows: &[
        PresetRow::Custom,
        PresetRow::Separator("--------- FLUX.1, SD 3.5 ---------"),
        size("1152x1728 (2:3 | 2MP)", 1152, 1728),
        size("1216x1664 (3:4 | 2MP)", 1216, 1664),
        size("1728x1152 (3:2 | 2MP)", 1728, 1152),
        size("1664x1216 (4:3 | 2MP)", 1664, 1216),
        size("1920x1088 (16:9 | 2MP)", 1920, 1088),
        size("2176x960 (21:9 | 2MP)", 2176, 960),
        size("1408x1408 (1:1 | 2MP)", 1408, 1408),
        PresetRow::Separator("----- FLUX.1, SD 3.5, SDXL -----"),
        size("896x1152 (3:4 | 1MP)", 896, 1152),
        size("832x1216 (5:8 | 1MP)", 832, 1216),
        size("1152x896 (4:3 | 1MP)", 1152, 896),
        size("1216x832 (3:2 | 1MP)", 1216, 832),
        size("1344x768 (16:9 | 1MP)", 1344, 768),
        size("1536x640 (21:9 | 1MP)", 1536, 640),
        size("1024x1024 (1:1 | 1MP)", 1024, 1024),
        PresetRow::Separator("------------- SD 1.5 ---------------"),
        size("512x768 (2:3 | 0.4MP)", 512, 768),
        size("512x682 (3:4 | 0.3MP)", 512, 682),
        size("768x512 (3:2 | 0.4MP)", 768, 512),
        size("682x512 (4:3 | 0.3MP)", 682, 512),
        size("910x512 (16:9 | 0.5MP)", 910, 512),
        size("952x512 (1.85:1 | 0.5MP)", 952, 512),
        size("512x512 (1:1 | 0.3MP)", 512, 512),
    ],
    allows_custom: true,
};

pub const LOCAL_VIDEO_PRESETS: PresetTable = PresetTable {
    rows: &[
        PresetRow::Custom,
        size("1360x768 [CogVideoX 1.5]", 1360, 768),
        size("1280x720 [WanVideo 2.1, Hunyuan Video]", 1280, 720),
        size("960x544 [Hunyuan Video]", 960, 544),
        size("854x480 [WanVideo 2.1]", 854, 480),
        size("720x480 [CogVideoX 1.5]", 720, 480),
    ],
    allows_custom: true,
};

impl PresetTable {
    pub fn labels(&self) -> Vec<&'static str> {
        self.rows.iter().map(PresetRow::label).collect()
    }

    pub fn find(&self, label: &str) -> Option<&PresetRow> {
        self.rows.iter().find(|row| row.label() == label)
    }

    /// Dimensions of a sized preset, `None` for custom/separator/unknown labels.
    pub fn dimensions(&self, label: &str) -> Option<(u32, u32)> {
        match self.find(label)? {
            PresetRow::Size { width, height, .. } => Some((*width, *height)),
            _ => None,
        }
    }
}

/// Everything a size node emits.
#[derive(Clone, Debug, PartialEq)]
pub struct SizeSelection {
    /// Bare `WIDTHxHEIGHT` string for wiring into combo inputs downstream.
    pub aspect_ratio: String,
    pub width: u32,
    pub height: u32,
    pub latent: Latent,
    pub batch_size: u32,
}

/// Resolve `preset` in `table`.
///
/// A sized preset overrides `custom`; its aspect string is the label's first token. Custom and
/// separator rows use `custom` and report `WxH`. Tables without custom support reject anything
/// that is not a sized preset.
pub fn configure_sizes(
    table: &PresetTable,
    preset: &str,
    custom: Option<(u32, u32)>,
    batch_size: u32,
) -> NodeResult<SizeSelection> {
    if batch_size == 0 {
        return Err(NodeError::validation("batch size must be at least 1"));
    }

    let (width, height, aspect_ratio) = match table.dimensions(preset) {
        Some((w, h)) => {
            let aspect = if table.allows_custom {
                preset.split(' ').next().unwrap_or(preset).to_string()
            } else {
                format!("{w}x{h}")
            };
            (w, h, aspect)
        }
        None if table.allows_custom => {
            let (w, h) = custom.ok_or_else(|| {
                NodeError::validation(format!("preset '{preset}' needs custom dimensions"))
            })?;
            (w, h, format!("{w}x{h}"))
        }
        None => {
            return Err(NodeError::validation(format!(
                "'{preset}' is not a selectable size preset"
            )));
        }
    };

    Ok(SizeSelection {
        aspect_ratio,
        width,
        height,
        latent: Latent::zeros(batch_size, width, height),
        batch_size,
    })
}

fn preset_schema(table: &PresetTable) -> NodeSchema {
    let mut schema = NodeSchema::new().required(InputDecl::combo("Aspect Ratio", &table.labels()));
    if table.allows_custom {
        schema = schema
            .required(InputDecl::int("Custom Width", CUSTOM_MIN, CUSTOM_MIN, CUSTOM_MAX))
            .required(InputDecl::int("Custom Height", CUSTOM_MIN, CUSTOM_MIN, CUSTOM_MAX));
    }
    schema.required(InputDecl::int("Batch Size", 1, BATCH_MIN, BATCH_MAX))
}

fn execute_preset(table: &PresetTable, inputs: &Resolved) -> NodeResult<NodeOutput> {
    let preset = inputs.string("Aspect Ratio")?;
    let custom = if table.allows_custom {
        Some((
            inputs.int("Custom Width")? as u32,
            inputs.int("Custom Height")? as u32,
        ))
    } else {
        None
    };
    let batch = inputs.int("Batch Size")? as u32;

    let sel = configure_sizes(table, &preset, custom, batch)?;
    tracing::debug!(
        preset = %preset,
        width = sel.width,
        height = sel.height,
        batch = sel.batch_size,
        "size preset"
    );
    Ok(NodeOutput::new(vec![
        Value::String(sel.aspect_ratio),
        Value::Int(i64::from(sel.width)),
        Value::Int(i64::from(sel.height)),
        Value::Latent(sel.latent),
        Value::Int(i64::from(sel.batch_size)),
    ]))
}

const IMAGE_OUTPUTS: [OutputDecl; 5] = [
    OutputDecl::new("aspect_ratio", "*"),
    OutputDecl::new("image_width", "INT"),
    OutputDecl::new("image_height", "INT"),
    OutputDecl::new("image_latent", "LATENT"),
    OutputDecl::new("batch_size", "INT"),
];

const VIDEO_OUTPUTS: [OutputDecl; 5] = [
    OutputDecl::new("aspect_ratio", "*"),
    OutputDecl::new("video_width", "INT"),
    OutputDecl::new("video_height", "INT"),
    OutputDecl::new("video_latent", "LATENT"),
    OutputDecl::new("batch_size", "INT"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct CloudImageSize;

impl Node for CloudImageSize {
    fn class_name(&self) -> &'static str {
        "OCS_CloudImageSize"
    }

    fn display_name(&self) -> &'static str {
        "Image Size (Cloud Models)"
    }

    fn schema(&self) -> NodeSchema {
        preset_schema(&CLOUD_IMAGE_PRESETS)
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &IMAGE_OUTPUTS
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        execute_preset(&CLOUD_IMAGE_PRESETS, inputs)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalImageSize;

impl Node for LocalImageSize {
    fn class_name(&self) -> &'static str {
        "OCS_LocalImageSize"
    }

    fn display_name(&self) -> &'static str {
        "Image Size (Local Models)"
    }

    fn schema(&self) -> NodeSchema {
        preset_schema(&LOCAL_IMAGE_PRESETS)
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &IMAGE_OUTPUTS
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        execute_preset(&LOCAL_IMAGE_PRESETS, inputs)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalVideoSize;

impl Node for LocalVideoSize {
    fn class_name(&self) -> &'static str {
        "OCS_LocalVideoSize"
    }

    fn display_name(&self) -> &'static str {
        "Video Size (Local Models)"
    }

    fn schema(&self) -> NodeSchema {
        preset_schema(&LOCAL_VIDEO_PRESETS)
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &VIDEO_OUTPUTS
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        execute_preset(&LOCAL_VIDEO_PRESETS, inputs)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/size_presets.rs"]
mod tests;
