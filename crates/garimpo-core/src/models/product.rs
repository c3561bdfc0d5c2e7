//! Product record structures.

use serde::{Deserialize, Serialize};

use crate::layout::Rect;

/// Which assembly strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    /// Windowed around a code anchor on raw tokens.
    AnchorWindow,
    /// Extracted from a segmented line block.
    Block,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::AnchorWindow => "anchor-window",
            SourceTag::Block => "block",
        }
    }
}

/// An assembled product before dedup and crop resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCandidate {
    /// Normalized product code, when one was found.
    pub code: Option<String>,

    /// Title-cased product name, when one was recoverable.
    pub title: Option<String>,

    /// Canonical price text (`R$ 1.234,56`).
    pub price_text: Option<String>,

    /// Price as a decimal value, for policy decisions and sorting.
    pub price_value: Option<rust_decimal::Decimal>,

    /// 1-based page number.
    pub page: u32,

    /// Column index, when the candidate came from block assembly.
    pub column_index: Option<usize>,

    /// Line block id, when the candidate came from block assembly.
    pub block_id: Option<usize>,

    /// Region covering the product's tokens, crop margin included.
    pub bbox: Rect,

    /// Which strategy assembled this candidate.
    pub source: SourceTag,
}

impl ProductCandidate {
    /// At least one of the three fields was recovered.
    pub fn has_any_field(&self) -> bool {
        self.code.is_some() || self.title.is_some() || self.price_text.is_some()
    }

    /// Convert into the output record, attaching the crop path if one
    /// was produced. Unrecovered fields become empty strings.
    pub fn into_record(self, imagem: Option<String>) -> ProductRecord {
        ProductRecord {
            codigo: self.code.unwrap_or_default(),
            titulo: self.title.unwrap_or_default(),
            preco: self.price_text.unwrap_or_default(),
            imagem,
            page: self.page,
            fonte: self.source.as_str().to_string(),
        }
    }
}

/// Final output record. Field names follow the catalog vocabulary the
/// downstream consumers expect, so they stay in Portuguese; `codigo`,
/// `titulo` and `preco` are always strings, empty when the field was
/// not recovered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub codigo: String,
    pub titulo: String,
    pub preco: String,
    pub imagem: Option<String>,
    pub page: u32,
    pub fonte: String,
}
