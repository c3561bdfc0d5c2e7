//! Anchor-window product assembly.
//!
//! Works on raw tokens with no page mask: every token matching the code
//! pattern becomes an anchor, a fixed window is drawn around it, and the
//! tokens whose top-left corner falls inside the window form the
//! product's text. Geometry is tuned for the OCR's working resolution.

use tracing::debug;

use crate::extract::FieldExtractor;
use crate::layout::{Rect, Token};
use crate::models::config::{GarimpoConfig, PricePolicy, WindowConfig};
use crate::models::product::{ProductCandidate, SourceTag};

/// Maximum tokens pulled in by the title fallback.
const TITLE_FALLBACK_TOKENS: usize = 3;

/// Assembles products by windowing around code anchors.
pub struct AnchorAssembler {
    window: WindowConfig,
    crop_margin: i32,
    extractor: FieldExtractor,
}

impl AnchorAssembler {
    pub fn new(config: &GarimpoConfig) -> Self {
        Self {
            window: config.window.clone(),
            crop_margin: config.crop.margin,
            // Anchor windows read top-down, so the first price below the
            // code is the one on the tag.
            extractor: FieldExtractor::from_config(&config.extraction, PricePolicy::FirstMatch),
        }
    }

    /// Assemble candidates from the page's tokens.
    pub fn assemble(
        &self,
        tokens: &[Token],
        page: u32,
        page_width: u32,
        page_height: u32,
    ) -> Vec<ProductCandidate> {
        let mut anchors: Vec<&Token> = tokens
            .iter()
            .filter(|t| self.extractor.is_code_anchor(&t.text))
            .collect();
        anchors.sort_by_key(|t| (t.bbox.y, t.bbox.x));

        debug!("page {}: {} code anchors", page, anchors.len());

        let mut candidates: Vec<ProductCandidate> = Vec::new();
        for anchor in anchors {
            let Some(candidate) =
                self.assemble_one(anchor, tokens, page, page_width, page_height)
            else {
                continue;
            };

            // The same product often carries its code twice (tag and
            // caption); fold duplicates as they appear, keeping price.
            match candidates
                .iter_mut()
                .find(|c| c.code.is_some() && c.code == candidate.code)
            {
                Some(existing) => merge_preferring_price(existing, candidate),
                None => candidates.push(candidate),
            }
        }

        candidates
    }

    fn assemble_one(
        &self,
        anchor: &Token,
        tokens: &[Token],
        page: u32,
        page_width: u32,
        page_height: u32,
    ) -> Option<ProductCandidate> {
        let window = self.window_around(&anchor.bbox);

        let mut neighbors: Vec<&Token> = tokens
            .iter()
            .filter(|t| window.contains_point(t.bbox.x as f32, t.bbox.y as f32))
            .collect();
        if neighbors.is_empty() {
            return None;
        }
        neighbors.sort_by_key(|t| (t.bbox.y, t.bbox.x));

        let mut window_text = String::new();
        let mut anchor_span = (0usize, 0usize);
        for t in &neighbors {
            if !window_text.is_empty() {
                window_text.push(' ');
            }
            let start = window_text.len();
            window_text.push_str(&t.text);
            if std::ptr::eq(*t, anchor) {
                anchor_span = (start, window_text.len());
            }
        }

        // Dense layouts can pull a neighboring anchor's code into the
        // window; the code printed on this anchor identifies the product.
        let codes = self.extractor.extract_codes(&window_text);
        let code = codes
            .iter()
            .find(|c| c.span.0 < anchor_span.1 && c.span.1 > anchor_span.0)
            .or_else(|| codes.first())
            .cloned();
        let price = self.extractor.extract_price(&window_text);
        let title = self
            .extractor
            .derive_title(&window_text, code.as_ref(), price.as_ref())
            .or_else(|| self.title_fallback(anchor, &neighbors));

        if code.is_none() && title.is_none() && price.is_none() {
            return None;
        }

        let bbox = neighbors
            .iter()
            .fold(anchor.bbox, |acc, t| acc.union(&t.bbox))
            .expand_clamped(self.crop_margin, page_width, page_height);

        Some(ProductCandidate {
            code: code.map(|c| c.normalized),
            title,
            price_text: price.as_ref().map(|p| p.normalized.clone()),
            price_value: price.map(|p| p.value),
            page,
            column_index: None,
            block_id: None,
            bbox,
            source: SourceTag::AnchorWindow,
        })
    }

    fn window_around(&self, anchor: &Rect) -> Rect {
        Rect::from_corners(
            anchor.x - self.window.dx_left,
            anchor.y - self.window.dy_top,
            anchor.x2() + self.window.dx_right,
            anchor.y2() + self.window.dy_down,
        )
    }

    /// When the window text yields no title, retry with just the lines
    /// above the anchor (the product name usually sits there), nearest
    /// line first.
    fn title_fallback(&self, anchor: &Token, neighbors: &[&Token]) -> Option<String> {
        let mut above: Vec<&&Token> = neighbors
            .iter()
            .filter(|t| t.bbox.y < anchor.bbox.y)
            .collect();
        above.sort_by_key(|t| (-t.bbox.y, t.bbox.x));
        above.truncate(TITLE_FALLBACK_TOKENS);

        if above.is_empty() {
            return None;
        }

        let text = above
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let code = self.extractor.extract_code(&text);
        let price = self.extractor.extract_price(&text);
        self.extractor.derive_title(&text, code.as_ref(), price.as_ref())
    }
}

/// Fold `incoming` into `existing`, preferring whichever side has a
/// price and filling the gaps from the other.
pub(crate) fn merge_preferring_price(existing: &mut ProductCandidate, incoming: ProductCandidate) {
    let bbox = existing.bbox.union(&incoming.bbox);

    if existing.price_text.is_none() && incoming.price_text.is_some() {
        let fallback_title = existing.title.take();
        *existing = incoming;
        if existing.title.is_none() {
            existing.title = fallback_title;
        }
    } else {
        if existing.title.is_none() {
            existing.title = incoming.title;
        }
        if existing.price_text.is_none() {
            existing.price_text = incoming.price_text;
            existing.price_value = incoming.price_value;
        }
    }

    existing.bbox = bbox;
}
