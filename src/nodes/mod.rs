pub mod first_not_empty;
pub mod image_grid;
pub mod image_list_filter;
pub mod image_saver;
pub mod model_downloader;
pub mod registry;
pub mod size_presets;
pub mod watermark;
