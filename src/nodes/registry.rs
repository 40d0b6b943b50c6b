use std::collections::BTreeMap;

use crate::host::node::Node;
use crate::nodes::first_not_empty::FirstNotEmpty;
use crate::nodes::image_grid::ImageGrid4x4;
use crate::nodes::image_list_filter::ImageListFilter;
use crate::nodes::image_saver::ImageSaver;
use crate::nodes::model_downloader::ModelDownloader;
use crate::nodes::size_presets::{CloudImageSize, LocalImageSize, LocalVideoSize};
use crate::nodes::watermark::{Watermarker, WatermarkerV2};

/// Every node in the collection, in menu order.
pub fn all_nodes() -> Vec<Box<dyn Node>> {
    vec![
        Box::new(CloudImageSize),
        Box::new(LocalImageSize),
        Box::new(LocalVideoSize),
        Box::new(ImageGrid4x4),
        Box::new(ImageListFilter),
        Box::new(FirstNotEmpty),
        Box::new(ImageSaver),
        Box::new(Watermarker),
        Box::new(WatermarkerV2),
        Box::new(ModelDownloader),
    ]
}

/// Class name → node, as the host registers them.
pub fn class_mappings() -> BTreeMap<&'static str, Box<dyn Node>> {
    all_nodes()
        .into_iter()
        .map(|node| (node.class_name(), node))
        .collect()
}

/// Class name → human-facing title.
pub fn display_name_mappings() -> BTreeMap<&'static str, &'static str> {
    all_nodes()
        .iter()
        .map(|node| (node.class_name(), node.display_name()))
        .collect()
}

/// Look up a node by class name.
pub fn find(class_name: &str) -> Option<Box<dyn Node>> {
    all_nodes()
        .into_iter()
        .find(|node| node.class_name() == class_name)
}

/// Host-facing description of one node: schema, outputs and flags.
pub fn describe(node: &dyn Node) -> serde_json::Value {
    let outputs: Vec<&str> = node.outputs().iter().map(|o| o.kind).collect();
    let names: Vec<&str> = node.outputs().iter().map(|o| o.name).collect();
    let is_list: Vec<bool> = node.outputs().iter().map(|o| o.is_list).collect();
    serde_json::json!({
        "name": node.class_name(),
        "display_name": node.display_name(),
        "category": node.category(),
        "description": node.description().unwrap_or(""),
        "input": node.schema().to_json(),
        "output": outputs,
        "output_name": names,
        "output_is_list": is_list,
        "output_node": node.is_output_node(),
        "input_is_list": node.input_is_list(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/registry.rs"]
mod tests;
