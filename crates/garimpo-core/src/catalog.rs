//! Page catalogs, dedup and multi-page merging.
//!
//! Each processed page yields a `PageCatalog` artifact; a merge pass
//! later concatenates them into one output. Dedup is strictly per page:
//! the same code on two different pages is two listings, not a
//! duplicate.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assemble::merge_preferring_price;
use crate::error::{PersistError, Result};
use crate::models::product::{ProductCandidate, ProductRecord};

/// Remove same-code duplicates within one page.
///
/// The first candidate with a given code wins unless a later one has a
/// price the first lacks; codeless candidates pass through untouched.
pub fn dedup_page(candidates: Vec<ProductCandidate>) -> Vec<ProductCandidate> {
    let mut result: Vec<ProductCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if candidate.code.is_none() {
            result.push(candidate);
            continue;
        }
        match result
            .iter_mut()
            .find(|c| c.code.is_some() && c.code == candidate.code)
        {
            Some(existing) => merge_preferring_price(existing, candidate),
            None => result.push(candidate),
        }
    }

    result
}

/// All products recovered from one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCatalog {
    pub page: u32,
    pub products: Vec<ProductRecord>,
}

impl PageCatalog {
    /// Artifact file name for a page, zero-padded to keep listings sorted.
    pub fn file_name(page: u32) -> String {
        format!("products_page_{page:02}.json")
    }

    /// Write the catalog under `dir` and return the written path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(Self::file_name(self.page));
        write_json(&path, self)?;
        info!("page {}: wrote {} products", self.page, self.products.len());
        Ok(path)
    }

    /// Load a previously written page catalog.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            crate::error::GarimpoError::Config(format!("{}: {e}", path.display()))
        })
    }
}

/// Per-page counts recorded alongside the merged output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub page: u32,
    pub products: usize,
}

/// Merge statistics artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSummary {
    pub pages: Vec<PageSummary>,
    pub total: usize,
    pub generated_at: String,
}

/// Concatenate page catalogs into one record list plus its summary.
///
/// Records are ordered by `(page, codigo)`; codeless records carry an
/// empty code, so they come first within their page. No dedup happens
/// across pages.
pub fn merge_catalogs(catalogs: &[PageCatalog]) -> (Vec<ProductRecord>, MergeSummary) {
    let mut records: Vec<ProductRecord> = Vec::new();
    let mut pages: Vec<PageSummary> = Vec::new();

    let mut sorted: Vec<&PageCatalog> = catalogs.iter().collect();
    sorted.sort_by_key(|c| c.page);

    for catalog in sorted {
        pages.push(PageSummary {
            page: catalog.page,
            products: catalog.products.len(),
        });
        records.extend(catalog.products.iter().cloned());
    }

    records.sort_by(|a, b| (a.page, &a.codigo).cmp(&(b.page, &b.codigo)));

    let summary = MergeSummary {
        pages,
        total: records.len(),
        generated_at: Utc::now().to_rfc3339(),
    };

    (records, summary)
}

/// File name of the merged product list.
pub const MERGED_FILE: &str = "merged_output.json";

/// File name of the merge statistics.
pub const SUMMARY_FILE: &str = "merge_summary.json";

/// Write the merged output and its summary under `dir`.
pub fn save_merged(
    dir: &Path,
    records: &[ProductRecord],
    summary: &MergeSummary,
) -> Result<(PathBuf, PathBuf)> {
    let merged_path = dir.join(MERGED_FILE);
    let summary_path = dir.join(SUMMARY_FILE);
    write_json(&merged_path, records)?;
    write_json(&summary_path, summary)?;
    Ok((merged_path, summary_path))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| {
        crate::error::GarimpoError::Config(format!("serializing {}: {e}", path.display()))
    })?;
    std::fs::write(path, content).map_err(|source| PersistError::Write {
        path: path.display().to_string(),
        source,
    })?;
    Ok(())
}
