//! Save a batch of images under a templated path, embedding workflow and EXIF metadata.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::{DateTime, TimeZone};
use image::DynamicImage;

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::ImageBatch;
use crate::foundation::value::Value;
use crate::host::context::HostContext;
use crate::host::node::Node;
use crate::host::schema::{InputDecl, NodeOutput, NodeSchema, OutputDecl, Resolved};
use crate::imaging::convert::to_dynamic_image;
use crate::imaging::metadata::{
    ExifFields, PngMetadata, encode_jpeg, encode_png, encode_webp,
};
use crate::imaging::template::{TokenMap, strftime};

pub const DEFAULT_FILENAME: &str = "%seed_%date_%time_final_OCS";
pub const DEFAULT_PATH: &str = "%date/";
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_TIME_FORMAT: &str = "%H%M%S";
pub const IMAGE_FORMATS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Encoder behind an `image_format` choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveFormat {
    Png,
    Jpeg,
    WebP,
}

impl SaveFormat {
    pub fn parse(name: &str) -> NodeResult<Self> {
        match name {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::WebP),
            other => Err(NodeError::validation(format!(
                "unsupported image format '{other}'"
            ))),
        }
    }
}

/// Widget values of one save call.
#[derive(Clone, Debug, PartialEq)]
pub struct SaveOptions {
    pub filename: String,
    pub path: String,
    pub seed: i64,
    /// Extension as chosen by the user (`jpg` and `jpeg` stay distinct).
    pub image_format: String,
    pub lossless_webp: bool,
    pub quality: u8,
    pub date_format: String,
    pub time_format: String,
    pub user_comment: String,
    pub embed_workflow: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
            path: DEFAULT_PATH.to_string(),
            seed: 0,
            image_format: "png".to_string(),
            lossless_webp: true,
            quality: 100,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            user_comment: String::new(),
            embed_workflow: true,
        }
    }
}

/// One file written by [`save_images`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedImage {
    pub filename: String,
    /// Rendered `path` template, relative to the output folder.
    pub subfolder: String,
    pub path: PathBuf,
}

impl SavedImage {
    fn ui_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "filename": self.filename,
            "subfolder": self.subfolder,
            "type": "output",
        })
    }
}

/// Next free counter for `dir`: one past the largest number any entry name starts with.
///
/// A missing or unreadable folder counts as empty.
pub fn counter_base(dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 1;
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let end = name
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(name.len());
            name[..end].parse::<u64>().ok()
        })
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

/// Encode with every requested piece of metadata.
pub fn encode_with_metadata(
    img: &DynamicImage,
    format: SaveFormat,
    opts: &SaveOptions,
    workflow: Option<&str>,
) -> NodeResult<Vec<u8>> {
    let comment = (!opts.user_comment.is_empty()).then(|| opts.user_comment.clone());
    match format {
        SaveFormat::Png => {
            let exif = ExifFields {
                make: None,
                user_comment: comment,
            }
            .to_tiff()?;
            let text: Vec<(&str, &str)> = workflow.map(|w| ("workflow", w)).into_iter().collect();
            encode_png(
                img,
                PngMetadata {
                    text: &text,
                    exif: exif.as_deref(),
                },
            )
        }
        SaveFormat::Jpeg => {
            let exif = ExifFields {
                make: None,
                user_comment: comment,
            }
            .to_tiff()?;
            encode_jpeg(img, opts.quality, exif.as_deref())
        }
        SaveFormat::WebP => {
            let exif = ExifFields {
                make: workflow.map(|w| format!("workflow:{w}")),
                user_comment: comment,
            }
            .to_tiff()?;
            encode_webp(img, exif.as_deref())
        }
    }
}

fn encode_plain(img: &DynamicImage, format: SaveFormat, quality: u8) -> NodeResult<Vec<u8>> {
    match format {
        SaveFormat::Png => encode_png(img, PngMetadata::default()),
        SaveFormat::Jpeg => encode_jpeg(img, quality, None),
        SaveFormat::WebP => encode_webp(img, None),
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> NodeResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create folder '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))?;
    Ok(())
}

/// Save every image of `images` under `output_dir`.
///
/// Tokens `%date`, `%time`, `%seed`, `%image_format` and `%counter` are substituted into
/// `opts.path` and `opts.filename`; a malformed date or time pattern is used verbatim.
/// Metadata that fails to encode is dropped with a warning, and an image that fails to encode
/// or write is skipped. Returns the files actually written.
pub fn save_images<Tz>(
    images: &ImageBatch,
    opts: &SaveOptions,
    output_dir: &Path,
    workflow: Option<&serde_json::Value>,
    now: &DateTime<Tz>,
) -> NodeResult<Vec<SavedImage>>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let format = SaveFormat::parse(&opts.image_format)?;
    if format == SaveFormat::WebP && !opts.lossless_webp {
        tracing::info!("lossy WebP is not available, writing lossless");
    }

    let workflow_json = match workflow {
        Some(w) if opts.embed_workflow => Some(
            serde_json::to_string(w)
                .map_err(|e| NodeError::encode(format!("workflow json: {e}")))?,
        ),
        _ => None,
    };

    let mut tokens = TokenMap::new();
    tokens
        .set("%date", strftime(now, &opts.date_format))
        .set("%time", strftime(now, &opts.time_format))
        .set("%seed", opts.seed)
        .set("%image_format", &opts.image_format);

    let base = counter_base(output_dir);
    let mut saved = Vec::with_capacity(images.batch());

    for idx in 0..images.batch() {
        tokens.set("%counter", format!("{:05}", base + idx as u64));
        let subfolder = tokens.render(&opts.path);
        let stem = tokens.render(&opts.filename);
        let path = output_dir
            .join(&subfolder)
            .join(format!("{stem}.{}", opts.image_format));

        let img = to_dynamic_image(images.image(idx)?)?;
        let bytes = match encode_with_metadata(&img, format, opts, workflow_json.as_deref()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "metadata dropped");
                match encode_plain(&img, format, opts.quality) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        tracing::error!(error = %err, path = %path.display(), "image not saved");
                        continue;
                    }
                }
            }
        };

        if let Err(err) = write_file(&path, &bytes) {
            tracing::error!(error = %err, path = %path.display(), "image not saved");
            continue;
        }
        tracing::info!(path = %path.display(), "saved");

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        saved.push(SavedImage {
            filename,
            subfolder,
            path,
        });
    }

    Ok(saved)
}

fn single_or_list(mut items: Vec<String>) -> Value {
    if items.len() == 1 {
        Value::String(items.remove(0))
    } else {
        Value::Strings(items)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageSaver;

const OUTPUTS: [OutputDecl; 2] = [
    OutputDecl::new("FILENAME", "STRING"),
    OutputDecl::new("FILE_PATH", "STRING"),
];

impl ImageSaver {
    fn options(inputs: &Resolved) -> NodeResult<SaveOptions> {
        let quality = u8::try_from(inputs.int("jpg_webp_quality")?)
            .map_err(|_| NodeError::validation("'jpg_webp_quality' must be within 1..=100"))?;
        Ok(SaveOptions {
            filename: inputs.string("filename")?,
            path: inputs.string("path")?,
            seed: inputs.int("seed")?,
            image_format: inputs.string("image_format")?,
            lossless_webp: inputs.bool("lossless_webp")?,
            quality,
            date_format: inputs.string("date_format")?,
            time_format: inputs.string("time_format")?,
            user_comment: inputs.string("EXIF_UserComment")?,
            embed_workflow: inputs.bool("embed_workflow")?,
        })
    }
}

impl Node for ImageSaver {
    fn class_name(&self) -> &'static str {
        "OCS_ImageSaver"
    }

    fn display_name(&self) -> &'static str {
        "Image Saver"
    }

    fn schema(&self) -> NodeSchema {
        NodeSchema::new()
            .required(InputDecl::image("images"))
            .optional(InputDecl::string("filename", DEFAULT_FILENAME, false))
            .optional(InputDecl::string("path", DEFAULT_PATH, false))
            .optional(InputDecl::int("seed", 0, 0, i64::MAX))
            .optional(InputDecl::combo("image_format", &IMAGE_FORMATS))
            .optional(InputDecl::bool("lossless_webp", true))
            .optional(InputDecl::int("jpg_webp_quality", 100, 1, 100))
            .optional(InputDecl::string("date_format", DEFAULT_DATE_FORMAT, false))
            .optional(InputDecl::string("time_format", DEFAULT_TIME_FORMAT, false))
            .optional(InputDecl::string("EXIF_UserComment", "", true))
            .optional(InputDecl::bool("embed_workflow", true).tooltip(
                "Embeds the complete workflow data into the image metadata. \
                 Only works with PNG and WebP formats.",
            ))
            .hidden(InputDecl::hidden("extra_pnginfo"))
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &OUTPUTS
    }

    fn is_output_node(&self) -> bool {
        true
    }

    fn execute(&self, inputs: &Resolved, ctx: &HostContext) -> NodeResult<NodeOutput> {
        let images = inputs.image("images")?;
        let opts = Self::options(inputs)?;
        let workflow = match inputs.get("extra_pnginfo") {
            Some(Value::Json(info)) => info.get("workflow"),
            _ => None,
        };

        let saved = save_images(
            &images,
            &opts,
            &ctx.config().output_dir,
            workflow,
            &chrono::Local::now(),
        )?;

        let ui: Vec<serde_json::Value> = saved.iter().map(SavedImage::ui_entry).collect();
        let (names, paths): (Vec<String>, Vec<String>) = saved
            .into_iter()
            .map(|s| (s.filename, s.path.display().to_string()))
            .unzip();

        Ok(
            NodeOutput::new(vec![single_or_list(names), single_or_list(paths)])
                .with_ui(serde_json::json!({ "images": ui })),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/image_saver.rs"]
mod tests;
