//! Data models for configuration and assembled products.

pub mod config;
pub mod product;

pub use config::{
    AssemblyStrategy, CropConfig, ExtractionConfig, FieldPolicy, GarimpoConfig, LayoutConfig,
    PricePolicy, WindowConfig,
};
pub use product::{ProductCandidate, ProductRecord, SourceTag};
