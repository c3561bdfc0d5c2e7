//! Merge command - combine page catalogs into one output.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use glob::glob;
use tracing::debug;

use garimpo_core::catalog::{merge_catalogs, save_merged, PageCatalog};
use garimpo_core::models::product::ProductRecord;

/// Arguments for the merge command.
#[derive(Args)]
pub struct MergeArgs {
    /// Page catalog files or glob pattern
    #[arg(default_value = "output/products_page_*.json")]
    input: String,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Also write the merged records as CSV
    #[arg(long)]
    csv: bool,
}

pub async fn run(args: MergeArgs) -> anyhow::Result<()> {
    let mut files: Vec<PathBuf> = glob(&args.input)?.filter_map(|r| r.ok()).collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No page catalogs found for pattern: {}", args.input);
    }

    let mut catalogs = Vec::with_capacity(files.len());
    for path in &files {
        debug!("loading {}", path.display());
        catalogs.push(PageCatalog::load(path)?);
    }

    let (records, summary) = merge_catalogs(&catalogs);

    fs::create_dir_all(&args.output_dir)?;
    let (merged_path, summary_path) = save_merged(&args.output_dir, &records, &summary)?;

    if args.csv {
        let csv_path = args.output_dir.join("merged_output.csv");
        fs::write(&csv_path, records_csv(&records)?)?;
        println!("{} CSV written to {}", style("✓").green(), csv_path.display());
    }

    println!(
        "{} Merged {} pages ({} products) into {}",
        style("✓").green(),
        summary.pages.len(),
        summary.total,
        merged_path.display()
    );
    println!("   Summary: {}", summary_path.display());

    Ok(())
}

fn records_csv(records: &[ProductRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["codigo", "titulo", "preco", "imagem", "page", "fonte"])?;
    for record in records {
        wtr.write_record([
            record.codigo.as_str(),
            record.titulo.as_str(),
            record.preco.as_str(),
            record.imagem.as_deref().unwrap_or(""),
            &record.page.to_string(),
            &record.fonte,
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
