//! Configuration structures for the catalog recovery pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the garimpo pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GarimpoConfig {
    /// Column/line layout reconstruction.
    pub layout: LayoutConfig,

    /// Anchor window geometry.
    pub window: WindowConfig,

    /// Field extraction.
    pub extraction: ExtractionConfig,

    /// Product crop regions.
    pub crop: CropConfig,
}

/// Layout reconstruction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum plausible column width in pixels; drives the column count estimate.
    pub min_col_width: u32,

    /// Maximum number of columns per page.
    pub max_cols: usize,

    /// Minimum height for a projection run to become a line block.
    pub min_line_height: u32,

    /// Minimum block area (column width * run height) in px².
    pub min_block_area: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_col_width: 250,
            max_cols: 5,
            min_line_height: 20,
            min_block_area: 100,
        }
    }
}

/// Window geometry around a code anchor, in page pixels at the OCR's
/// working resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window extension to the left of the anchor.
    pub dx_left: i32,

    /// Window extension to the right of the anchor.
    pub dx_right: i32,

    /// Window extension above the anchor (title usually sits here).
    pub dy_top: i32,

    /// Window extension below the anchor (price lines).
    pub dy_down: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            dx_left: 220,
            dx_right: 320,
            dy_top: 120,
            dy_down: 220,
        }
    }
}

/// Which code pattern family the extractor recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldPolicy {
    /// High-precision anchors only: two letters + 3-6 digits (e.g. CT2092).
    Strict,
    /// Broad family: 1-4 letters, optional separator, 2-6 digits, optional
    /// suffix (e.g. AB-5560, CT3021-P, PRO-200/5, ABC.120).
    Tolerant,
}

/// How to resolve multiple price matches in one text span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricePolicy {
    /// First match in reading order.
    FirstMatch,
    /// Largest value (prefers a final price over a crossed-out original).
    MaxValue,
}

/// Which assembly strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssemblyStrategy {
    /// Blocks when a mask and component boxes are available, anchor
    /// windows otherwise.
    Auto,
    /// Always segment into blocks (requires a page mask).
    Blocks,
    /// Always window around code anchors on raw tokens.
    AnchorWindow,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Code pattern family.
    pub policy: FieldPolicy,

    /// Price ambiguity resolution. `None` keeps the per-strategy default:
    /// first-match for anchor windows, max-value for blocks.
    pub price_policy: Option<PricePolicy>,

    /// Keep code suffixes like `-P` or `/5` instead of stripping them.
    pub keep_code_suffix: bool,

    /// Apply the OCR digit-confusable substitution before price matching.
    pub fix_confusables: bool,

    /// Minimum OCR confidence for a token to participate.
    pub min_confidence: i32,

    /// Minimum token text length.
    pub min_token_len: usize,

    /// Maximum ratio of symbol characters before a token counts as noise.
    pub max_symbol_ratio: f32,

    /// Assembly strategy selection.
    pub strategy: AssemblyStrategy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            policy: FieldPolicy::Tolerant,
            price_policy: None,
            keep_code_suffix: false,
            fix_confusables: true,
            min_confidence: 45,
            min_token_len: 2,
            max_symbol_ratio: 0.6,
            strategy: AssemblyStrategy::Auto,
        }
    }
}

/// Crop region configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Margin in pixels added around the union of neighbor boxes.
    pub margin: i32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self { margin: 18 }
    }
}

impl GarimpoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrip() {
        let config = GarimpoConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: GarimpoConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.layout.min_col_width, 250);
        assert_eq!(back.window.dx_right, 320);
        assert_eq!(back.extraction.min_confidence, 45);
        assert_eq!(back.crop.margin, 18);
    }

    #[test]
    fn test_partial_config() {
        let config: GarimpoConfig =
            serde_json::from_str(r#"{"extraction": {"policy": "strict"}}"#).unwrap();
        assert_eq!(config.extraction.policy, FieldPolicy::Strict);
        assert_eq!(config.layout.max_cols, 5);
    }
}
