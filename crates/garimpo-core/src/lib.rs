//! # garimpo-core
//!
//! Recovers structured product records from OCR output of scanned
//! retail catalogs. A page arrives as loose tokens (plus, optionally, a
//! binary mask and connected-component boxes); the pipeline rebuilds
//! the page's column/block structure or windows around code anchors,
//! extracts `codigo` / `titulo` / `preco` per product, dedups within
//! the page and merges pages into one output.
//!
//! ## Example
//!
//! ```no_run
//! use garimpo_core::models::config::GarimpoConfig;
//! use garimpo_core::pipeline::{NoopCropper, PageInput, PagePipeline, TracingReporter};
//!
//! let pipeline = PagePipeline::new(GarimpoConfig::default());
//! let input = PageInput {
//!     page: 1,
//!     width: 1200,
//!     height: 1600,
//!     mask: None,
//!     components: Vec::new(),
//!     tokens: Vec::new(),
//! };
//! let catalog = pipeline.process_page(&input, &TracingReporter, &NoopCropper)?;
//! println!("{} products", catalog.products.len());
//! # Ok::<(), garimpo_core::GarimpoError>(())
//! ```

pub mod assemble;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod layout;
pub mod models;
pub mod pipeline;

pub use catalog::{dedup_page, merge_catalogs, MergeSummary, PageCatalog};
pub use error::{ExtractionError, GarimpoError, LayoutError, PersistError, Result};
pub use extract::{FieldExtractor, PriceMatch};
pub use layout::{parse_tokens, Rect, Token};
pub use models::config::GarimpoConfig;
pub use models::product::{ProductCandidate, ProductRecord};
pub use pipeline::{PageInput, PagePipeline, PipelineReporter, ProductCropper};
