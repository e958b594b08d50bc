//! pixkit command-line tool
//!
//! Resize, convert or replace the background of a single image, and manage the
//! offline asset cache.

use super::config::CliConfigBuilder;
use crate::{
    cache::AssetCache,
    config::{OutputFormat, ToolConfig},
    convert::{self, ConvertRequest, CONVERTED_PREFIX},
    resize::{self, Dimension, ResizeRequest, RESIZED_PREFIX},
    segmentation::{FileMaskProducer, SegmentationService},
    services::{
        ImageIOService, ProcessingStage, ProgressReporter, ProgressUpdate, TracingProgressReporter,
    },
    session::{EditorSession, SegmentationOutcome},
    surface::{EncodedImage, BACKGROUND_REMOVED_PREFIX},
    tracing_config::{init_cli_tracing, spans},
    types::{CompositeTimings, RgbColor},
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Instrument;

/// Local image utility: resize, convert and background replacement
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "pixkit")]
pub struct Cli {
    /// Enable verbose logging (-v: DEBUG for pixkit, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file; command-line options override it
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rescale an image and save it as JPEG
    Resize {
        input: PathBuf,

        /// Target width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Target height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Do not derive the missing dimension from the aspect ratio
        #[arg(long)]
        free_aspect: bool,

        /// JPEG quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-encode an image in another format
    Convert {
        input: PathBuf,

        #[arg(short, long, value_enum)]
        format: CliOutputFormat,

        /// Quality for lossy formats (1-100)
        #[arg(short, long)]
        quality: Option<u8>,

        /// Fill color behind transparent pixels for JPEG (#rrggbb)
        #[arg(long)]
        background_color: Option<String>,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the background using a precomputed segmentation mask
    Remove {
        input: PathBuf,

        /// Grayscale or alpha mask image from an external segmenter
        #[arg(long)]
        mask: PathBuf,

        /// transparent, #rrggbb, color:#rrggbb or blur:<px>
        #[arg(short, long)]
        background: Option<String>,

        /// Readiness wait budget for the segmentation capability
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the offline asset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Copy the precached assets from a directory into the cache
    Install { asset_dir: PathBuf },
    /// Remove every cache version except the current one
    Activate,
    /// List cache versions
    List,
    /// Print the cache directory
    Dir,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum CliOutputFormat {
    Jpeg,
    Png,
    Webp,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(format: CliOutputFormat) -> Self {
        match format {
            CliOutputFormat::Jpeg => OutputFormat::Jpeg,
            CliOutputFormat::Png => OutputFormat::Png,
            CliOutputFormat::Webp => OutputFormat::WebP,
        }
    }
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli)?;

    match &cli.command {
        Command::Resize {
            input,
            width,
            height,
            free_aspect,
            output,
            ..
        } => {
            run_resize(&config, input, *width, *height, !free_aspect, output.as_deref())
                .instrument(spans::command("resize", input))
                .await
        },
        Command::Convert {
            input,
            format,
            background_color,
            output,
            ..
        } => {
            run_convert(
                &config,
                input,
                (*format).into(),
                background_color.as_deref(),
                output.as_deref(),
            )
            .instrument(spans::command("convert", input))
            .await
        },
        Command::Remove {
            input,
            mask,
            output,
            ..
        } => {
            run_remove(&config, input, mask, output.as_deref(), cli.verbose > 0)
                .instrument(spans::command("remove", input))
                .await
        },
        Command::Cache { action } => run_cache(action),
    }
}

async fn run_resize(
    config: &ToolConfig,
    input: &Path,
    width: Option<u32>,
    height: Option<u32>,
    keep_aspect: bool,
    output: Option<&Path>,
) -> Result<()> {
    let source = ImageIOService::load_image(input)
        .await
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let (width, height) = match (width, height, keep_aspect) {
        (Some(w), None, true) => {
            let (w, h) = resize::linked_dimensions(source.dimensions(), Dimension::Width, w);
            (Some(w), Some(h))
        },
        (None, Some(h), true) => {
            let (w, h) = resize::linked_dimensions(source.dimensions(), Dimension::Height, h);
            (Some(w), Some(h))
        },
        other => (other.0, other.1),
    };

    let request = ResizeRequest::new(width, height, config.jpeg_quality);
    let (target_width, target_height) = request.target_dimensions(source.dimensions());
    info!(
        "Resizing {}x{} to {}x{} (estimated {})",
        source.width(),
        source.height(),
        target_width,
        target_height,
        resize::format_file_size(resize::estimate_file_size(
            target_width,
            target_height,
            config.jpeg_quality
        ))
    );

    let encoded = resize::export_resized(&source, &request).context("Resize failed")?;
    write_output(&encoded, RESIZED_PREFIX, output).await
}

async fn run_convert(
    config: &ToolConfig,
    input: &Path,
    format: OutputFormat,
    background_color: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let source = ImageIOService::load_image(input)
        .await
        .with_context(|| format!("Failed to load {}", input.display()))?;

    let mut request = ConvertRequest::from_config(format, config);
    if let Some(hex) = background_color {
        request = request.with_background_color(
            RgbColor::from_hex(hex).with_context(|| format!("Invalid color '{}'", hex))?,
        );
    }

    let encoded = convert::convert(&source, &request).context("Conversion failed")?;
    info!(
        "Converted to {} ({})",
        format,
        resize::format_file_size(encoded.size() as u64)
    );
    write_output(&encoded, CONVERTED_PREFIX, output).await
}

async fn run_remove(
    config: &ToolConfig,
    input: &Path,
    mask: &Path,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let mime_type = ImageIOService::mime_type_for_path(input).unwrap_or("application/octet-stream");

    let spinner = create_spinner(verbose);
    let mut session =
        EditorSession::new(config).with_progress_reporter(progress_reporter(config, &spinner, verbose));
    session
        .load_image(&bytes, mime_type)
        .with_context(|| format!("Cannot use {}", input.display()))?;

    let mut service = SegmentationService::from_config(Box::new(FileMaskProducer::new(mask)), config);
    let dimensions = session
        .source()
        .map(|source| source.dimensions())
        .unwrap_or_default();

    let removal_span = spans::removal(service.producer_name(), dimensions);
    let outcome = session
        .remove_background(&mut service)
        .instrument(removal_span)
        .await;
    spinner.finish_and_clear();

    match outcome.context("Background removal failed")? {
        SegmentationOutcome::Applied => {},
        SegmentationOutcome::Discarded => anyhow::bail!("Segmentation result was superseded"),
    }

    for warning in session.take_warnings() {
        warn!("{}", warning.message);
    }

    let encoded = session.export_png().context("Export failed")?;
    write_output(&encoded, BACKGROUND_REMOVED_PREFIX, output).await
}

fn run_cache(action: &CacheAction) -> Result<()> {
    let cache = AssetCache::new().context("Failed to open asset cache")?;

    match action {
        CacheAction::Install { asset_dir } => {
            let count = cache
                .install(asset_dir)
                .with_context(|| format!("Failed to install assets from {}", asset_dir.display()))?;
            println!("Cached {} assets in {}", count, cache.cache_dir().display());
        },
        CacheAction::Activate => {
            let purged = cache.activate().context("Failed to activate cache")?;
            if purged.is_empty() {
                println!("No stale caches");
            }
            for name in purged {
                println!("Removed {}", name);
            }
        },
        CacheAction::List => {
            for name in cache.list_caches().context("Failed to list caches")? {
                let marker = if name == cache.name() { "*" } else { " " };
                println!("{} {}", marker, name);
            }
        },
        CacheAction::Dir => println!("{}", cache.cache_dir().display()),
    }
    Ok(())
}

/// Resolve the output path: explicit file, directory, or the download name in the cwd
fn output_path(encoded: &EncodedImage, prefix: &str, output: Option<&Path>) -> PathBuf {
    let file_name = encoded.file_name(prefix);
    match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(file_name),
    }
}

async fn write_output(encoded: &EncodedImage, prefix: &str, output: Option<&Path>) -> Result<()> {
    let path = output_path(encoded, prefix, output);
    ImageIOService::save_bytes(&encoded.bytes, &path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

/// Verbose runs log progress through tracing instead of drawing a spinner
fn progress_reporter(
    config: &ToolConfig,
    spinner: &ProgressBar,
    verbose: bool,
) -> Box<dyn ProgressReporter> {
    if verbose {
        Box::new(TracingProgressReporter::new(config.debug))
    } else {
        Box::new(SpinnerReporter::new(spinner.clone()))
    }
}

fn create_spinner(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Shows session progress on an indicatif spinner
struct SpinnerReporter {
    spinner: ProgressBar,
}

impl SpinnerReporter {
    fn new(spinner: ProgressBar) -> Self {
        Self { spinner }
    }
}

impl ProgressReporter for SpinnerReporter {
    fn report_progress(&self, update: ProgressUpdate) {
        self.spinner
            .set_message(format!("[{}%] {}", update.progress, update.description));
    }

    fn report_completion(&self, timings: CompositeTimings) {
        self.spinner
            .set_message(format!("Done in {}ms", timings.total_ms));
    }

    fn report_error(&self, stage: ProcessingStage, error: &str) {
        self.spinner
            .println(format!("{} failed: {}", stage.description(), error));
    }
}
