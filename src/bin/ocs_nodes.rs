use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use ocs_nodes::imaging::convert::{load_image_file, save_image_file};
use ocs_nodes::nodes::image_grid::{GRID_SIDE, ImageGrid4x4, TILE_LABELS};
use ocs_nodes::nodes::image_saver::ImageSaver;
use ocs_nodes::nodes::model_downloader::ModelDownloader;
use ocs_nodes::nodes::registry::{all_nodes, describe};
use ocs_nodes::nodes::size_presets::{CloudImageSize, LocalImageSize, LocalVideoSize};
use ocs_nodes::nodes::watermark::{Watermarker, WatermarkerV2};
use ocs_nodes::{Args, HostConfig, HostContext, Node, NodeOutput, Value};

#[derive(Parser, Debug)]
#[command(name = "ocs-nodes", version)]
struct Cli {
    /// Host config JSON (output_dir, models_dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every node.
    List(ListArgs),
    /// Resolve a size preset.
    Size(SizeArgs),
    /// Tile 16 images into a 4x4 grid.
    Grid(GridArgs),
    /// Overlay a watermark onto an image.
    Watermark(WatermarkArgs),
    /// Save images under the configured output folder.
    Save(SaveArgs),
    /// Download a model file.
    Download(DownloadArgs),
}

#[derive(Parser, Debug)]
struct ListArgs {
    /// Print the full host-facing description as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SizeTable {
    Cloud,
    LocalImage,
    LocalVideo,
}

#[derive(Parser, Debug)]
struct SizeArgs {
    /// Preset table.
    #[arg(long, value_enum, default_value_t = SizeTable::LocalImage)]
    table: SizeTable,

    /// Preset label, e.g. "1024x1024 (1:1 | 1MP)" or "custom".
    #[arg(long)]
    preset: String,

    /// Custom width (local tables only).
    #[arg(long, default_value_t = 64)]
    width: i64,

    /// Custom height (local tables only).
    #[arg(long, default_value_t = 64)]
    height: i64,

    #[arg(long, default_value_t = 1)]
    batch: i64,
}

#[derive(Parser, Debug)]
struct GridArgs {
    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// 16 tile images in row-major order.
    #[arg(num_args = GRID_SIDE * GRID_SIDE, required = true)]
    tiles: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct WatermarkArgs {
    /// Source image.
    #[arg(long)]
    source: PathBuf,

    /// Watermark image (alpha respected).
    #[arg(long)]
    mark: PathBuf,

    /// Output image path.
    #[arg(long)]
    out: PathBuf,

    /// Watermark box as a percentage of the source size.
    #[arg(long, default_value_t = 20.0)]
    scale: f64,

    /// Distance from the bottom-right corner in pixels.
    #[arg(long, default_value_t = 25)]
    padding: i64,

    /// Use the premultiplied-alpha compositor.
    #[arg(long)]
    v2: bool,
}

#[derive(Parser, Debug)]
struct SaveArgs {
    /// Images to save.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    #[arg(long)]
    filename: Option<String>,

    /// Subfolder template under the output folder.
    #[arg(long)]
    path: Option<String>,

    #[arg(long, default_value_t = 0)]
    seed: i64,

    /// png, jpg, jpeg or webp.
    #[arg(long, default_value = "png")]
    format: String,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = 100)]
    quality: i64,

    /// EXIF user comment.
    #[arg(long, default_value = "")]
    comment: String,

    /// Workflow JSON file to embed.
    #[arg(long)]
    workflow: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct DownloadArgs {
    #[arg(long)]
    url: String,

    #[arg(long)]
    filename: String,

    /// Target folder; defaults to the configured models folder.
    #[arg(long, default_value = "")]
    folder: String,

    /// Bearer token, or `$NAME` to read it from the environment.
    #[arg(long, default_value = "")]
    token: String,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = HostConfig::load(cli.config.as_deref())?;
    let ctx = HostContext::new(config);
    match cli.cmd {
        Command::List(args) => cmd_list(args),
        Command::Size(args) => cmd_size(args, &ctx),
        Command::Grid(args) => cmd_grid(args, &ctx),
        Command::Watermark(args) => cmd_watermark(args, &ctx),
        Command::Save(args) => cmd_save(args, &ctx),
        Command::Download(args) => cmd_download(args, &ctx),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn output_image(out: &NodeOutput, index: usize, path: &Path) -> anyhow::Result<()> {
    let batch = out
        .get(index)
        .context("node returned no image")?
        .to_image()?;
    save_image_file(&batch, 0, path)?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn print_strings(value: Option<&Value>) {
    match value {
        Some(Value::String(s)) => println!("{s}"),
        Some(Value::Strings(list)) => list.iter().for_each(|s| println!("{s}")),
        _ => {}
    }
}

fn cmd_list(args: ListArgs) -> anyhow::Result<()> {
    for node in all_nodes() {
        if args.json {
            println!("{}", describe(node.as_ref()));
        } else {
            println!("{:<22} {}", node.class_name(), node.display_name());
        }
    }
    Ok(())
}

fn cmd_size(args: SizeArgs, ctx: &HostContext) -> anyhow::Result<()> {
    let mut call = Args::new()
        .with("Aspect Ratio", args.preset)
        .with("Batch Size", args.batch);
    let node: &dyn Node = match args.table {
        SizeTable::Cloud => &CloudImageSize,
        SizeTable::LocalImage => &LocalImageSize,
        SizeTable::LocalVideo => &LocalVideoSize,
    };
    if !matches!(args.table, SizeTable::Cloud) {
        call = call
            .with("Custom Width", args.width)
            .with("Custom Height", args.height);
    }

    let out = node.invoke(&call, ctx)?;
    let latent_shape = match out.get(3) {
        Some(Value::Latent(latent)) => latent.shape().to_vec(),
        _ => Vec::new(),
    };
    let report = serde_json::json!({
        "aspect_ratio": out.get(0).and_then(|v| v.as_str().ok()),
        "width": out.get(1).and_then(|v| v.as_int().ok()),
        "height": out.get(2).and_then(|v| v.as_int().ok()),
        "latent_shape": latent_shape,
        "batch_size": out.get(4).and_then(|v| v.as_int().ok()),
    });
    println!("{report}");
    Ok(())
}

fn cmd_grid(args: GridArgs, ctx: &HostContext) -> anyhow::Result<()> {
    let mut call = Args::new();
    for (label, path) in TILE_LABELS.into_iter().zip(&args.tiles) {
        call = call.with(label, load_image_file(path)?);
    }
    let out = ImageGrid4x4.invoke(&call, ctx)?;
    output_image(&out, 0, &args.out)
}

fn cmd_watermark(args: WatermarkArgs, ctx: &HostContext) -> anyhow::Result<()> {
    let call = Args::new()
        .with("source_image", load_image_file(&args.source)?)
        .with("watermark", load_image_file(&args.mark)?)
        .with("scale_percent", args.scale)
        .with("padding", args.padding);
    let out = if args.v2 {
        WatermarkerV2.invoke(&call, ctx)?
    } else {
        Watermarker.invoke(&call, ctx)?
    };
    output_image(&out, 0, &args.out)
}

fn cmd_save(args: SaveArgs, ctx: &HostContext) -> anyhow::Result<()> {
    let workflow = match &args.workflow {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read workflow '{}'", path.display()))?;
            let json: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parse workflow '{}'", path.display()))?;
            Some(serde_json::json!({ "workflow": json }))
        }
        None => None,
    };

    for image in &args.images {
        let mut call = Args::new()
            .with("images", load_image_file(image)?)
            .with("seed", args.seed)
            .with("image_format", args.format.as_str())
            .with("jpg_webp_quality", args.quality)
            .with("EXIF_UserComment", args.comment.as_str());
        if let Some(filename) = &args.filename {
            call = call.with("filename", filename.as_str());
        }
        if let Some(path) = &args.path {
            call = call.with("path", path.as_str());
        }
        if let Some(info) = &workflow {
            call = call.with("extra_pnginfo", Value::Json(info.clone()));
        }
        let out = ImageSaver.invoke(&call, ctx)?;
        print_strings(out.get(1));
    }
    Ok(())
}

fn cmd_download(args: DownloadArgs, ctx: &HostContext) -> anyhow::Result<()> {
    let call = Args::new()
        .with("url", args.url)
        .with("folder", args.folder)
        .with("filename", args.filename)
        .with("token", args.token);
    let out = ModelDownloader.invoke(&call, ctx)?;
    match out.get(0) {
        Some(Value::String(path)) if !path.is_empty() => {
            println!("{path}");
            Ok(())
        }
        _ => anyhow::bail!("download failed"),
    }
}
