//! `ocs_nodes` is a collection of small, stateless helper nodes for node-graph image and video
//! generation hosts.
//!
//! Every node declares an input schema and its outputs, and exposes one entry point through the
//! [`Node`] trait. The typed functions behind each node are public too, so they can be driven
//! without a host.
//!
//! # Nodes
//!
//! - **Size presets**: [`configure_sizes`] maps a named preset to dimensions and a zeroed latent.
//! - **Image grid**: [`compose_grid`] tiles 16 images into a 4x4 grid.
//! - **Image list filter**: [`filter_images`] drops images at or below a minimum size.
//! - **First not empty**: [`first_not_empty`] picks the first value carrying data.
//! - **Watermarker** (v1 and v2): [`apply_watermark`] overlays a scaled watermark bottom-right.
//! - **Image saver**: [`save_images`] writes templated files with workflow and EXIF metadata.
//! - **Model downloader**: [`download`] streams a URL to disk with progress events.
//!
//! Images travel as [`ImageBatch`] tensors (`[batch, height, width, channels]`, `f32` in
//! `0.0..=1.0`); sockets carry dynamically typed [`Value`]s.
#![forbid(unsafe_code)]

pub mod foundation;
pub mod host;
pub mod imaging;
pub mod nodes;

pub use foundation::error::{NodeError, NodeResult};
pub use foundation::tensor::{ImageBatch, Latent};
pub use foundation::value::Value;
pub use host::config::HostConfig;
pub use host::context::HostContext;
pub use host::node::{CATEGORY, Node};
pub use host::progress::{
    LogProgress, NullProgress, ProgressEvent, ProgressSink, RecordingProgress,
};
pub use host::schema::{Args, InputDecl, InputKind, NodeOutput, NodeSchema, OutputDecl, Resolved};
pub use nodes::first_not_empty::first_not_empty;
pub use nodes::image_grid::compose_grid;
pub use nodes::image_list_filter::{FilterOutcome, filter_images};
pub use nodes::image_saver::{SaveOptions, SavedImage, save_images};
pub use nodes::model_downloader::{DownloadRequest, download};
pub use nodes::registry::{all_nodes, class_mappings, display_name_mappings};
pub use nodes::size_presets::{SizeSelection, configure_sizes};
pub use nodes::watermark::{WatermarkMode, apply_watermark};
