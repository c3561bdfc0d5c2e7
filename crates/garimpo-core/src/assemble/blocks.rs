//! Block-based product assembly.
//!
//! Runs when the page has a binary mask: each segmented line block is
//! treated as one product region and its tokens are read as a single
//! text span. Promotional pages often print a crossed-out original
//! price next to the real one, so price ambiguity defaults to the
//! largest value.

use tracing::debug;

use crate::extract::FieldExtractor;
use crate::layout::BlockTokens;
use crate::models::config::{GarimpoConfig, PricePolicy};
use crate::models::product::{ProductCandidate, SourceTag};

/// Assembles one product candidate per populated line block.
pub struct BlockAssembler {
    crop_margin: i32,
    extractor: FieldExtractor,
}

impl BlockAssembler {
    pub fn new(config: &GarimpoConfig) -> Self {
        Self {
            crop_margin: config.crop.margin,
            extractor: FieldExtractor::from_config(&config.extraction, PricePolicy::MaxValue),
        }
    }

    pub fn assemble(
        &self,
        groups: &[BlockTokens],
        page: u32,
        page_width: u32,
        page_height: u32,
    ) -> Vec<ProductCandidate> {
        let mut candidates = Vec::new();

        for group in groups {
            let mut tokens: Vec<_> = group.tokens.iter().collect();
            tokens.sort_by_key(|t| (t.bbox.y, t.bbox.x));

            let text = tokens
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            let code = self.extractor.extract_code(&text);
            let price = self.extractor.extract_price(&text);
            let title = self
                .extractor
                .derive_title(&text, code.as_ref(), price.as_ref());

            if code.is_none() && title.is_none() && price.is_none() {
                continue;
            }

            candidates.push(ProductCandidate {
                code: code.map(|c| c.normalized),
                title,
                price_text: price.as_ref().map(|p| p.normalized.clone()),
                price_value: price.map(|p| p.value),
                page,
                column_index: Some(group.block.column_index),
                block_id: Some(group.block.id),
                bbox: group
                    .block
                    .bbox
                    .expand_clamped(self.crop_margin, page_width, page_height),
                source: SourceTag::Block,
            });
        }

        debug!(
            "page {}: {} candidates from {} blocks",
            page,
            candidates.len(),
            groups.len()
        );

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{LineBlock, Rect, Token};
    use pretty_assertions::assert_eq;

    fn group(id: usize, column_index: usize, bbox: Rect, tokens: Vec<Token>) -> BlockTokens {
        BlockTokens {
            block: LineBlock {
                id,
                column_index,
                bbox,
            },
            tokens,
        }
    }

    fn token(text: &str, x: i32, y: i32) -> Token {
        Token::new(text, Rect::new(x, y, 80, 22), 90)
    }

    #[test]
    fn test_block_candidate_fields() {
        let groups = vec![group(
            0,
            1,
            Rect::new(400, 100, 300, 90),
            vec![
                token("CANECA", 410, 105),
                token("CT1000", 410, 135),
                token("R$ 12,90", 410, 165),
            ],
        )];

        let candidates = BlockAssembler::new(&GarimpoConfig::default())
            .assemble(&groups, 2, 1200, 1600);
        assert_eq!(candidates.len(), 1);

        let c = &candidates[0];
        assert_eq!(c.code.as_deref(), Some("CT1000"));
        assert_eq!(c.title.as_deref(), Some("Caneca"));
        assert_eq!(c.price_text.as_deref(), Some("R$ 12,90"));
        assert_eq!(c.column_index, Some(1));
        assert_eq!(c.block_id, Some(0));
        assert_eq!(c.source, SourceTag::Block);
        // Block bbox grown by the crop margin.
        assert_eq!(c.bbox, Rect::from_corners(382, 82, 718, 208));
    }

    #[test]
    fn test_max_price_wins_in_blocks() {
        // Crossed-out original next to the promotional price.
        let groups = vec![group(
            0,
            0,
            Rect::new(100, 100, 300, 60),
            vec![token("CT2000", 110, 105), token("R$ 9,90 R$ 4,70", 110, 135)],
        )];

        let candidates = BlockAssembler::new(&GarimpoConfig::default())
            .assemble(&groups, 1, 1200, 1600);
        assert_eq!(candidates[0].price_text.as_deref(), Some("R$ 9,90"));
    }

    #[test]
    fn test_codeless_block_with_price_kept() {
        let groups = vec![group(
            0,
            0,
            Rect::new(100, 100, 320, 60),
            vec![
                token("Produto sem código", 110, 105),
                token("R$ 9,99", 110, 135),
            ],
        )];

        let candidates = BlockAssembler::new(&GarimpoConfig::default())
            .assemble(&groups, 1, 1200, 1600);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].code, None);
        assert_eq!(candidates[0].title.as_deref(), Some("Produto Sem Código"));
        assert_eq!(candidates[0].price_text.as_deref(), Some("R$ 9,99"));
    }

    #[test]
    fn test_fieldless_block_skipped() {
        let groups = vec![group(
            0,
            0,
            Rect::new(100, 100, 300, 60),
            vec![token("--", 110, 105)],
        )];

        let candidates = BlockAssembler::new(&GarimpoConfig::default())
            .assemble(&groups, 1, 1200, 1600);
        assert!(candidates.is_empty());
    }
}
