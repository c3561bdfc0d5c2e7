//! Batch command - process every page of a scanned catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use garimpo_core::catalog::PageCatalog;
use garimpo_core::models::config::GarimpoConfig;
use garimpo_core::pipeline::{NoopCropper, PageInput, PagePipeline, ProductCropper, TracingReporter};

use crate::crop::ImageCropper;

use super::process::{infer_page, load_components, load_tokens};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Token files or glob pattern (e.g. "ocr/tokens_page_*.json")
    #[arg(required = true)]
    input: String,

    /// Output directory for page catalogs
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Directory with page masks, matched to pages by number
    #[arg(long)]
    mask_dir: Option<PathBuf>,

    /// Directory with component box files, matched to pages by number
    #[arg(long)]
    components_dir: Option<PathBuf>,

    /// Directory with original page images, enables product crops
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Stop at the first failed page instead of skipping it
    #[arg(long)]
    fail_fast: bool,
}

/// Result of processing a single page.
struct PageResult {
    path: PathBuf,
    page: u32,
    products: Option<usize>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    // Load configuration
    let config = if let Some(path) = config_path {
        GarimpoConfig::from_file(Path::new(path))?
    } else {
        GarimpoConfig::default()
    };

    // Expand glob pattern
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} pages to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")
            .unwrap()
            .progress_chars("=>-"),
    );

    let pipeline = PagePipeline::new(config);
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let page_start = Instant::now();
        let page = infer_page(&path);

        let result = process_page(&pipeline, &path, page, &args);
        let processing_time_ms = page_start.elapsed().as_millis() as u64;

        match result {
            Ok(products) => {
                results.push(PageResult {
                    path: path.clone(),
                    page,
                    products: Some(products),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.fail_fast {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                // An empty catalog keeps the page visible to the merge
                // step.
                let placeholder = PageCatalog {
                    page,
                    products: Vec::new(),
                };
                if let Err(save_err) = placeholder.save(&args.output_dir) {
                    warn!("page {}: could not write empty catalog: {}", page, save_err);
                }
                results.push(PageResult {
                    path: path.clone(),
                    page,
                    products: None,
                    error: Some(error_msg),
                    processing_time_ms,
                });
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let successful: Vec<_> = results.iter().filter(|r| r.products.is_some()).collect();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let total_products: usize = successful.iter().filter_map(|r| r.products).sum();

    println!();
    println!(
        "{} Processed {} pages in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} pages ok ({} products), {} failed",
        style(successful.len()).green(),
        total_products,
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed pages:").red());
        for result in &failed {
            println!(
                "  - {} (page {}): {}",
                result.path.display(),
                result.page,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_page(
    pipeline: &PagePipeline,
    path: &Path,
    page: u32,
    args: &BatchArgs,
) -> anyhow::Result<usize> {
    let tokens = load_tokens(path)?;

    let mask = match args
        .mask_dir
        .as_deref()
        .and_then(|dir| find_page_asset(dir, page, &["png", "bmp", "tiff", "tif"]))
    {
        Some(mask_path) => {
            debug!("page {}: mask {}", page, mask_path.display());
            Some(image::open(&mask_path)?.to_luma8())
        }
        None => None,
    };

    let components = match args
        .components_dir
        .as_deref()
        .and_then(|dir| find_page_asset(dir, page, &["json"]))
    {
        Some(comp_path) => load_components(&comp_path)?,
        None => Vec::new(),
    };

    let page_image = match args
        .images_dir
        .as_deref()
        .and_then(|dir| find_page_asset(dir, page, &["jpg", "jpeg", "png"]))
    {
        Some(image_path) => Some(image::open(&image_path)?),
        None => None,
    };

    let (width, height) = match (&mask, &page_image) {
        (Some(mask), _) => mask.dimensions(),
        (None, Some(img)) => (img.width(), img.height()),
        (None, None) => {
            let w = tokens.iter().map(|t| t.bbox.x2()).max().unwrap_or(0);
            let h = tokens.iter().map(|t| t.bbox.y2()).max().unwrap_or(0);
            if w <= 0 || h <= 0 {
                anyhow::bail!("page {page}: cannot determine page size");
            }
            (w as u32, h as u32)
        }
    };

    let cropper: Box<dyn ProductCropper> = match page_image {
        Some(img) => {
            let crops_dir = args.output_dir.join("crops");
            fs::create_dir_all(&crops_dir)?;
            Box::new(ImageCropper::new(img, crops_dir))
        }
        None => Box::new(NoopCropper),
    };

    let input = PageInput {
        page,
        width,
        height,
        mask,
        components,
        tokens,
    };

    let catalog = pipeline.process_page(&input, &TracingReporter, cropper.as_ref())?;
    let count = catalog.products.len();
    catalog.save(&args.output_dir)?;

    Ok(count)
}

/// Find the file in `dir` whose name digits resolve to `page`.
fn find_page_asset(dir: &Path, page: u32, extensions: &[&str]) -> Option<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| extensions.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    entries.sort();
    entries.into_iter().find(|p| infer_page(p) == page)
}
