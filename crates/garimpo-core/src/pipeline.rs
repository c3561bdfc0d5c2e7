//! Page processing pipeline.
//!
//! Ties the stages together: token filtering, layout reconstruction,
//! product assembly, per-page dedup and crop resolution. Collaborators
//! that touch the outside world (crop files, progress reporting) sit
//! behind traits so the pipeline itself stays testable.

use image::GrayImage;
use tracing::{debug, info};

use crate::assemble::{AnchorAssembler, BlockAssembler};
use crate::catalog::{dedup_page, PageCatalog};
use crate::error::{GarimpoError, LayoutError, Result};
use crate::layout::{assign_tokens, ColumnClusterer, LineBlock, LineSegmenter, Rect, Token};
use crate::models::config::{AssemblyStrategy, GarimpoConfig};

/// Everything known about one page before processing.
pub struct PageInput {
    /// 1-based page number.
    pub page: u32,

    /// Page width in pixels at the OCR's working resolution.
    pub width: u32,

    /// Page height in pixels.
    pub height: u32,

    /// Binary foreground mask, when the preprocessing produced one.
    pub mask: Option<GrayImage>,

    /// Connected-component boxes, when available.
    pub components: Vec<Rect>,

    /// OCR tokens.
    pub tokens: Vec<Token>,
}

/// Receives progress events as a page moves through the stages.
pub trait PipelineReporter {
    /// A stage finished; `detail` is human-readable.
    fn record_event(&self, page: u32, stage: &str, detail: &str);

    /// Persist an intermediate artifact for later inspection. The
    /// default discards it.
    fn write_checkpoint(
        &self,
        _page: u32,
        _stage: &str,
        _payload: &serde_json::Value,
    ) -> Result<()> {
        Ok(())
    }
}

/// Reporter that discards everything.
pub struct NoopReporter;

impl PipelineReporter for NoopReporter {
    fn record_event(&self, _page: u32, _stage: &str, _detail: &str) {}
}

/// Reporter that forwards events to the tracing subscriber.
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn record_event(&self, page: u32, stage: &str, detail: &str) {
        info!("page {page} [{stage}] {detail}");
    }
}

/// Produces crop images for assembled products.
pub trait ProductCropper {
    /// Crop the product region; returns the stored path, or `None` when
    /// cropping is disabled or impossible for this product.
    fn crop(&self, page: u32, code: Option<&str>, region: &Rect) -> Result<Option<String>>;
}

/// Cropper that never produces an image.
pub struct NoopCropper;

impl ProductCropper for NoopCropper {
    fn crop(&self, _page: u32, _code: Option<&str>, _region: &Rect) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Runs the full per-page pipeline.
pub struct PagePipeline {
    config: GarimpoConfig,
}

impl PagePipeline {
    pub fn new(config: GarimpoConfig) -> Self {
        Self { config }
    }

    /// Process one page into its catalog.
    pub fn process_page(
        &self,
        input: &PageInput,
        reporter: &dyn PipelineReporter,
        cropper: &dyn ProductCropper,
    ) -> Result<PageCatalog> {
        self.validate(input)?;

        let tokens = self.filter_tokens(&input.tokens);
        reporter.record_event(
            input.page,
            "tokens",
            &format!("{} of {} kept", tokens.len(), input.tokens.len()),
        );

        let strategy = self.resolve_strategy(input)?;
        let candidates = match strategy {
            AssemblyStrategy::Blocks => self.assemble_blocks(input, &tokens)?,
            AssemblyStrategy::AnchorWindow => AnchorAssembler::new(&self.config).assemble(
                &tokens,
                input.page,
                input.width,
                input.height,
            ),
            // resolve_strategy never returns Auto.
            AssemblyStrategy::Auto => unreachable!(),
        };
        reporter.record_event(
            input.page,
            "assemble",
            &format!("{} candidates", candidates.len()),
        );

        let deduped = dedup_page(candidates);
        let payload = serde_json::to_value(&deduped)
            .map_err(|e| GarimpoError::Config(format!("serializing checkpoint: {e}")))?;
        reporter.write_checkpoint(input.page, "candidates", &payload)?;

        let mut products = Vec::with_capacity(deduped.len());
        for candidate in deduped {
            let imagem = cropper.crop(input.page, candidate.code.as_deref(), &candidate.bbox)?;
            products.push(candidate.into_record(imagem));
        }
        products.sort_by(|a, b| (&a.codigo, &a.titulo).cmp(&(&b.codigo, &b.titulo)));

        reporter.record_event(input.page, "catalog", &format!("{} products", products.len()));

        Ok(PageCatalog {
            page: input.page,
            products,
        })
    }

    fn validate(&self, input: &PageInput) -> Result<()> {
        if input.width == 0 || input.height == 0 {
            return Err(LayoutError::EmptyPage { page: input.page }.into());
        }
        if let Some(mask) = &input.mask {
            let (mask_w, mask_h) = mask.dimensions();
            if mask_w != input.width || mask_h != input.height {
                return Err(LayoutError::MaskDimensionMismatch {
                    mask_w,
                    mask_h,
                    page_w: input.width,
                    page_h: input.height,
                }
                .into());
            }
        }
        Ok(())
    }

    fn resolve_strategy(&self, input: &PageInput) -> Result<AssemblyStrategy> {
        match self.config.extraction.strategy {
            AssemblyStrategy::Auto => {
                if input.mask.is_some() && !input.components.is_empty() {
                    Ok(AssemblyStrategy::Blocks)
                } else {
                    Ok(AssemblyStrategy::AnchorWindow)
                }
            }
            AssemblyStrategy::Blocks => {
                if input.mask.is_none() {
                    return Err(GarimpoError::Config(
                        "block assembly requires a page mask".to_string(),
                    ));
                }
                Ok(AssemblyStrategy::Blocks)
            }
            AssemblyStrategy::AnchorWindow => Ok(AssemblyStrategy::AnchorWindow),
        }
    }

    fn assemble_blocks(
        &self,
        input: &PageInput,
        tokens: &[Token],
    ) -> Result<Vec<crate::models::product::ProductCandidate>> {
        // resolve_strategy guarantees the mask is present.
        let mask = input
            .mask
            .as_ref()
            .ok_or_else(|| GarimpoError::Config("block assembly requires a page mask".into()))?;

        let columns = ColumnClusterer::new(&self.config.layout).cluster(&input.components, input.width);
        let segmenter = LineSegmenter::new(&self.config.layout);

        let mut blocks: Vec<LineBlock> = Vec::new();
        for column in &columns {
            for bbox in segmenter.segment(mask, column.x_range.0, column.x_range.1) {
                blocks.push(LineBlock {
                    id: blocks.len(),
                    column_index: column.index,
                    bbox,
                });
            }
        }
        debug!(
            "page {}: {} columns, {} line blocks",
            input.page,
            columns.len(),
            blocks.len()
        );

        let groups = assign_tokens(tokens, &blocks);
        Ok(BlockAssembler::new(&self.config).assemble(
            &groups,
            input.page,
            input.width,
            input.height,
        ))
    }

    fn filter_tokens(&self, tokens: &[Token]) -> Vec<Token> {
        let ex = &self.config.extraction;
        tokens
            .iter()
            .filter(|t| t.confidence >= ex.min_confidence)
            .filter(|t| !is_noise(&t.text, ex.min_token_len, ex.max_symbol_ratio))
            .cloned()
            .collect()
    }
}

/// Token noise test: too short, or mostly symbols.
///
/// Characters common in prices and codes (`/-,.$R` and space) do not
/// count as symbols, so "R$" survives while "|_~" does not.
pub fn is_noise(text: &str, min_len: usize, max_symbol_ratio: f32) -> bool {
    let trimmed = text.trim();
    let total = trimmed.chars().count();
    if total < min_len {
        return true;
    }

    let symbols = trimmed
        .chars()
        .filter(|c| !c.is_alphanumeric() && !"/-,.$R ".contains(*c))
        .count();

    symbols as f32 / total as f32 > max_symbol_ratio
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use pretty_assertions::assert_eq;

    fn token(text: &str, x: i32, y: i32, conf: i32) -> Token {
        Token::new(text, Rect::new(x, y, 80, 22), conf)
    }

    #[test]
    fn test_noise_filter() {
        assert!(is_noise("x", 2, 0.6));
        assert!(is_noise("|||~", 2, 0.6));
        assert!(!is_noise("R$", 2, 0.6));
        assert!(!is_noise("CT2092", 2, 0.6));
        assert!(!is_noise("4,70", 2, 0.6));
    }

    #[test]
    fn test_empty_page_rejected() {
        let pipeline = PagePipeline::new(GarimpoConfig::default());
        let input = PageInput {
            page: 1,
            width: 0,
            height: 800,
            mask: None,
            components: Vec::new(),
            tokens: Vec::new(),
        };
        let err = pipeline
            .process_page(&input, &NoopReporter, &NoopCropper)
            .unwrap_err();
        assert!(matches!(
            err,
            GarimpoError::Layout(LayoutError::EmptyPage { page: 1 })
        ));
    }

    #[test]
    fn test_mask_dimension_mismatch_rejected() {
        let pipeline = PagePipeline::new(GarimpoConfig::default());
        let input = PageInput {
            page: 1,
            width: 1200,
            height: 1600,
            mask: Some(GrayImage::new(600, 800)),
            components: Vec::new(),
            tokens: Vec::new(),
        };
        let err = pipeline
            .process_page(&input, &NoopReporter, &NoopCropper)
            .unwrap_err();
        assert!(matches!(
            err,
            GarimpoError::Layout(LayoutError::MaskDimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_anchor_path_without_mask() {
        let pipeline = PagePipeline::new(GarimpoConfig::default());
        let input = PageInput {
            page: 1,
            width: 1200,
            height: 1600,
            mask: None,
            components: Vec::new(),
            tokens: vec![
                token("BORRIFADOR", 300, 100, 90),
                token("CT2092", 300, 140, 90),
                token("R$ 4,70", 300, 180, 90),
                // Below the confidence floor, must not join the window.
                token("RUIDO", 310, 210, 10),
            ],
        };

        let catalog = pipeline
            .process_page(&input, &NoopReporter, &NoopCropper)
            .unwrap();
        assert_eq!(catalog.products.len(), 1);
        assert_eq!(catalog.products[0].codigo, "CT2092");
        assert_eq!(catalog.products[0].preco, "R$ 4,70");
        assert_eq!(catalog.products[0].titulo, "Borrifador");
        assert_eq!(catalog.products[0].fonte, "anchor-window");
    }

    #[test]
    fn test_blocks_path_with_mask() {
        let width = 600u32;
        let height = 400u32;
        let mut mask = GrayImage::new(width, height);
        // One text band at rows 100..160.
        for y in 100..160 {
            for x in 50..550 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let pipeline = PagePipeline::new(GarimpoConfig::default());
        let input = PageInput {
            page: 2,
            width,
            height,
            mask: Some(mask),
            components: vec![Rect::new(50, 100, 500, 60)],
            tokens: vec![
                token("CANECA", 60, 110, 90),
                token("CT1000", 160, 110, 90),
                token("R$ 12,90", 260, 110, 90),
            ],
        };

        let catalog = pipeline
            .process_page(&input, &NoopReporter, &NoopCropper)
            .unwrap();
        assert_eq!(catalog.products.len(), 1);
        assert_eq!(catalog.products[0].codigo, "CT1000");
        assert_eq!(catalog.products[0].preco, "R$ 12,90");
        assert_eq!(catalog.products[0].fonte, "block");
    }

    #[test]
    fn test_forced_blocks_without_mask_errors() {
        let mut config = GarimpoConfig::default();
        config.extraction.strategy = AssemblyStrategy::Blocks;
        let pipeline = PagePipeline::new(config);
        let input = PageInput {
            page: 1,
            width: 1200,
            height: 1600,
            mask: None,
            components: Vec::new(),
            tokens: Vec::new(),
        };
        assert!(pipeline
            .process_page(&input, &NoopReporter, &NoopCropper)
            .is_err());
    }
}
