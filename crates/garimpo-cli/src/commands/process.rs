//! Process command - recover products from a single page of OCR tokens.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use garimpo_core::catalog::PageCatalog;
use garimpo_core::layout::{parse_tokens, Rect, Token};
use garimpo_core::models::config::GarimpoConfig;
use garimpo_core::pipeline::{NoopCropper, PageInput, PagePipeline, ProductCropper, TracingReporter};

use crate::crop::ImageCropper;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Page token file (JSON array of OCR tokens)
    #[arg(required = true)]
    input: PathBuf,

    /// Page number (default: digits in the file name, else 1)
    #[arg(short, long)]
    page: Option<u32>,

    /// Binary foreground mask image for block segmentation
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Connected-component boxes (JSON array of {x,y,w,h})
    #[arg(long)]
    components: Option<PathBuf>,

    /// Original page image, enables product crops
    #[arg(long)]
    image: Option<PathBuf>,

    /// Directory for crop images (default: <output-dir>/crops)
    #[arg(long)]
    crops_dir: Option<PathBuf>,

    /// Output directory for the page catalog (default: stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format when printing to stdout
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Page width in pixels, when neither mask nor image is given
    #[arg(long)]
    width: Option<u32>,

    /// Page height in pixels, when neither mask nor image is given
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    // Load configuration
    let config = if let Some(path) = config_path {
        GarimpoConfig::from_file(Path::new(path))?
    } else {
        GarimpoConfig::default()
    };

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let page = args.page.unwrap_or_else(|| infer_page(&args.input));
    info!("Processing page {} from {}", page, args.input.display());

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    pb.set_message("Loading tokens...");
    pb.set_position(10);
    let tokens = load_tokens(&args.input)?;
    debug!("{} tokens loaded", tokens.len());

    pb.set_message("Loading page assets...");
    pb.set_position(30);
    let mask = match &args.mask {
        Some(path) => Some(image::open(path)?.to_luma8()),
        None => None,
    };
    let components = match &args.components {
        Some(path) => load_components(path)?,
        None => Vec::new(),
    };

    let (width, height) = page_dimensions(&args, mask.as_ref(), &tokens)?;

    let page_image = match &args.image {
        Some(path) => Some(image::open(path)?),
        None => None,
    };

    pb.set_message("Recovering products...");
    pb.set_position(60);

    let input = PageInput {
        page,
        width,
        height,
        mask,
        components,
        tokens,
    };

    let cropper: Box<dyn ProductCropper> = match page_image {
        Some(img) => {
            let crops_dir = args.crops_dir.clone().unwrap_or_else(|| {
                args.output_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("crops")
            });
            fs::create_dir_all(&crops_dir)?;
            Box::new(ImageCropper::new(img, crops_dir))
        }
        None => Box::new(NoopCropper),
    };

    let pipeline = PagePipeline::new(config);
    let catalog = pipeline.process_page(&input, &TracingReporter, cropper.as_ref())?;

    pb.finish_with_message("Done");

    if let Some(output_dir) = &args.output_dir {
        fs::create_dir_all(output_dir)?;
        let path = catalog.save(output_dir)?;
        println!(
            "{} {} products written to {}",
            style("✓").green(),
            catalog.products.len(),
            path.display()
        );
    } else {
        println!("{}", format_catalog(&catalog, args.format)?);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Pull a page number out of the file name digits ("tokens_page_07.json" -> 7).
pub fn infer_page(path: &Path) -> u32 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.chars().filter(char::is_ascii_digit).collect::<String>())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(1)
}

pub fn load_tokens(path: &Path) -> anyhow::Result<Vec<Token>> {
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    if !value.is_array() {
        anyhow::bail!("{} is not a JSON array of tokens", path.display());
    }
    Ok(parse_tokens(&value))
}

pub fn load_components(path: &Path) -> anyhow::Result<Vec<Rect>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn page_dimensions(
    args: &ProcessArgs,
    mask: Option<&image::GrayImage>,
    tokens: &[Token],
) -> anyhow::Result<(u32, u32)> {
    if let (Some(w), Some(h)) = (args.width, args.height) {
        return Ok((w, h));
    }
    if let Some(mask) = mask {
        return Ok(mask.dimensions());
    }
    // No declared size: fall back to the token extent.
    let w = tokens.iter().map(|t| t.bbox.x2()).max().unwrap_or(0);
    let h = tokens.iter().map(|t| t.bbox.y2()).max().unwrap_or(0);
    if w <= 0 || h <= 0 {
        anyhow::bail!("Cannot determine page size; pass --width and --height");
    }
    Ok((w as u32, h as u32))
}

pub fn format_catalog(catalog: &PageCatalog, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(catalog)?),
        OutputFormat::Csv => format_csv(catalog),
        OutputFormat::Text => Ok(format_text(catalog)),
    }
}

fn format_csv(catalog: &PageCatalog) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["codigo", "titulo", "preco", "imagem", "page", "fonte"])?;
    for product in &catalog.products {
        wtr.write_record([
            product.codigo.as_str(),
            product.titulo.as_str(),
            product.preco.as_str(),
            product.imagem.as_deref().unwrap_or(""),
            &product.page.to_string(),
            &product.fonte,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(catalog: &PageCatalog) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "Page {}: {} products\n\n",
        catalog.page,
        catalog.products.len()
    ));

    for product in &catalog.products {
        let codigo = if product.codigo.is_empty() {
            "------"
        } else {
            product.codigo.as_str()
        };
        let preco = if product.preco.is_empty() {
            "sem preço"
        } else {
            product.preco.as_str()
        };
        output.push_str(&format!("  {}  {}  {}\n", codigo, preco, product.titulo));
    }

    output
}
