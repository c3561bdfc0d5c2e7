//! Geometric primitives and document structure recovery.
//!
//! Rebuilds columns and line blocks from connected-component boxes, then
//! attaches OCR tokens to blocks by point containment.

mod assign;
mod columns;
mod lines;

pub use assign::{assign_tokens, BlockTokens};
pub use columns::ColumnClusterer;
pub use lines::LineSegmenter;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// An axis-aligned rectangle in page pixels, `(x, y)` top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Build from corner coordinates `(x1, y1, x2, y2)`.
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x: x1,
            y: y1,
            w: x2 - x1,
            h: y2 - y1,
        }
    }

    pub fn x2(&self) -> i32 {
        self.x + self.w
    }

    pub fn y2(&self) -> i32 {
        self.y + self.h
    }

    /// Center point of the rectangle.
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }

    /// Check if a point lies inside (edges inclusive).
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        px >= self.x as f32 && px <= self.x2() as f32 && py >= self.y as f32 && py <= self.y2() as f32
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.x2().max(other.x2());
        let y2 = self.y2().max(other.y2());
        Rect::from_corners(x1, y1, x2, y2)
    }

    /// Expand by `margin` on each side, clamped to `[0, width) x [0, height)`.
    pub fn expand_clamped(&self, margin: i32, width: u32, height: u32) -> Rect {
        let x1 = (self.x - margin).max(0);
        let y1 = (self.y - margin).max(0);
        let x2 = (self.x2() + margin).min(width as i32);
        let y2 = (self.y2() + margin).min(height as i32);
        Rect::from_corners(x1, y1, x2, y2)
    }
}

/// An OCR token: recognized text plus its bounding box and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Recognized text content.
    pub text: String,

    /// Bounding box in page pixels.
    pub bbox: Rect,

    /// OCR confidence (0-100).
    #[serde(default)]
    pub confidence: i32,
}

impl Token {
    pub fn new(text: impl Into<String>, bbox: Rect, confidence: i32) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }

    /// Center point of the token's box.
    pub fn center(&self) -> (f32, f32) {
        self.bbox.center()
    }
}

/// A vertical column of the page, derived per page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Contiguous index, 0 = leftmost.
    pub index: usize,

    /// Inclusive x-range `(x1, x2)`.
    pub x_range: (i32, i32),
}

/// A segmented text line/paragraph region inside a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineBlock {
    /// Unique id within a page.
    pub id: usize,

    /// Index of the column this block belongs to.
    pub column_index: usize,

    /// Block bounding box.
    pub bbox: Rect,
}

/// Parse a tolerant token list from JSON.
///
/// Accepts two bbox conventions seen in OCR dumps: object keys
/// `x/y/w/h` alongside the text, or a `bbox` 4-array interpreted as
/// `[x1, y1, x2, y2]`. Tokens with missing or malformed geometry are
/// dropped with a warning; the rest of the page still processes.
pub fn parse_tokens(value: &serde_json::Value) -> Vec<Token> {
    let Some(items) = value.as_array() else {
        warn!("token payload is not a JSON array");
        return Vec::new();
    };

    let mut tokens = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for item in items {
        match parse_one_token(item) {
            Some(token) => tokens.push(token),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("dropped {} tokens with malformed geometry", dropped);
    }

    tokens
}

fn parse_one_token(item: &serde_json::Value) -> Option<Token> {
    let obj = item.as_object()?;
    let text = obj.get("text")?.as_str()?.to_string();

    let confidence = obj
        .get("conf")
        .or_else(|| obj.get("confidence"))
        .and_then(as_i32)
        .unwrap_or(0);

    // x/y/w/h keys take precedence, then a 4-array of corners.
    let bbox = if let (Some(x), Some(y), Some(w), Some(h)) = (
        obj.get("x").and_then(as_i32),
        obj.get("y").and_then(as_i32),
        obj.get("w").and_then(as_i32),
        obj.get("h").and_then(as_i32),
    ) {
        Rect::new(x, y, w, h)
    } else {
        let arr = obj
            .get("bbox")
            .or_else(|| obj.get("box"))
            .or_else(|| obj.get("rect"))?
            .as_array()?;
        if arr.len() != 4 {
            return None;
        }
        let x1 = as_i32(&arr[0])?;
        let y1 = as_i32(&arr[1])?;
        let x2 = as_i32(&arr[2])?;
        let y2 = as_i32(&arr[3])?;
        if x2 < x1 || y2 < y1 {
            return None;
        }
        Rect::from_corners(x1, y1, x2, y2)
    };

    Some(Token::new(text, bbox, confidence))
}

fn as_i32(value: &serde_json::Value) -> Option<i32> {
    if let Some(i) = value.as_i64() {
        return i32::try_from(i).ok();
    }
    // Some OCR dumps emit conf as a float or numeric string.
    if let Some(f) = value.as_f64() {
        return Some(f as i32);
    }
    value.as_str().and_then(|s| s.trim().parse::<f64>().ok().map(|f| f as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rect_union_and_expand() {
        let a = Rect::new(10, 10, 20, 20);
        let b = Rect::new(40, 5, 10, 10);
        let u = a.union(&b);
        assert_eq!(u, Rect::from_corners(10, 5, 50, 30));

        let e = u.expand_clamped(18, 60, 40);
        assert_eq!(e, Rect::from_corners(0, 0, 60, 40));
    }

    #[test]
    fn test_parse_tokens_xywh() {
        let value = json!([
            {"text": "CT2092", "x": 100, "y": 200, "w": 80, "h": 20, "conf": 91},
            {"text": "R$ 4,70", "x": 100, "y": 230, "w": 70, "h": 18, "conf": "88.0"},
        ]);
        let tokens = parse_tokens(&value);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].bbox, Rect::new(100, 200, 80, 20));
        assert_eq!(tokens[1].confidence, 88);
    }

    #[test]
    fn test_parse_tokens_corner_array() {
        let value = json!([
            {"text": "Borrifador", "bbox": [10, 20, 110, 45], "confidence": 80},
        ]);
        let tokens = parse_tokens(&value);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].bbox, Rect::new(10, 20, 100, 25));
    }

    #[test]
    fn test_parse_tokens_drops_malformed() {
        let value = json!([
            {"text": "ok", "x": 1, "y": 2, "w": 3, "h": 4},
            {"text": "bad arity", "bbox": [1, 2, 3]},
            {"text": "non-numeric", "bbox": ["a", "b", "c", "d"]},
            {"text": "no geometry"},
        ]);
        let tokens = parse_tokens(&value);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "ok");
    }
}
