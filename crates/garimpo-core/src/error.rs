//! Error types for the garimpo-core library.

use thiserror::Error;

/// Main error type for the garimpo library.
#[derive(Error, Debug)]
pub enum GarimpoError {
    /// Layout reconstruction error.
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Output persistence error.
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to column/line layout reconstruction.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Page mask dimensions do not match the declared page size.
    #[error("mask is {mask_w}x{mask_h} but page is {page_w}x{page_h}")]
    MaskDimensionMismatch {
        mask_w: u32,
        mask_h: u32,
        page_w: u32,
        page_h: u32,
    },

    /// A page was declared with zero width or height.
    #[error("page {page} has empty dimensions")]
    EmptyPage { page: u32 },
}

/// Errors related to product field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The token list could not be parsed at all.
    #[error("token list is not a JSON array")]
    InvalidTokenList,

    /// Failed to parse a value.
    #[error("failed to parse {field}: {value}")]
    Parse { field: String, value: String },
}

/// Errors related to writing page/catalog artifacts.
#[derive(Error, Debug)]
pub enum PersistError {
    /// Failed to write an output file. Fatal for the page, not the batch.
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for the garimpo library.
pub type Result<T> = std::result::Result<T, GarimpoError>;
