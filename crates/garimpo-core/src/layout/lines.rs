//! Line segmentation by horizontal pixel projection.
//!
//! Sums foreground pixels per row inside a column's x-slice and turns
//! maximal runs of active rows into line blocks. Cheap and robust to
//! noisy binarization; the height/area filters reject isolated specks.

use image::GrayImage;

use super::Rect;
use crate::models::config::LayoutConfig;

/// Segments a column of a binary page mask into line blocks.
pub struct LineSegmenter {
    min_line_height: u32,
    min_area: u32,
}

impl LineSegmenter {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            min_line_height: config.min_line_height,
            min_area: config.min_block_area,
        }
    }

    /// Segment the rows of `mask` restricted to `[col_x1, col_x2]`.
    ///
    /// `mask` is a binary image with foreground > 0. Returns block
    /// boxes in top-to-bottom order. A run still open at the bottom
    /// edge is closed and evaluated like any other.
    pub fn segment(&self, mask: &GrayImage, col_x1: i32, col_x2: i32) -> Vec<Rect> {
        let (w, h) = mask.dimensions();
        if w == 0 || h == 0 {
            return Vec::new();
        }

        let x1 = col_x1.clamp(0, w as i32 - 1) as u32;
        let x2 = col_x2.clamp(0, w as i32 - 1) as u32;
        if x2 <= x1 {
            return Vec::new();
        }

        let col_width = x2 - x1 + 1;
        let mut blocks = Vec::new();
        let mut run_start: Option<u32> = None;

        for y in 0..h {
            let active = (x1..=x2).any(|x| mask.get_pixel(x, y)[0] > 0);
            match (active, run_start) {
                (true, None) => run_start = Some(y),
                (false, Some(start)) => {
                    self.push_block(&mut blocks, x1, x2, col_width, start, y - 1);
                    run_start = None;
                }
                _ => {}
            }
        }

        if let Some(start) = run_start {
            self.push_block(&mut blocks, x1, x2, col_width, start, h - 1);
        }

        blocks
    }

    fn push_block(&self, blocks: &mut Vec<Rect>, x1: u32, x2: u32, col_width: u32, y1: u32, y2: u32) {
        let height = y2 - y1 + 1;
        if height < self.min_line_height {
            return;
        }
        if col_width * height < self.min_area {
            return;
        }
        blocks.push(Rect::from_corners(x1 as i32, y1 as i32, x2 as i32, y2 as i32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with_bands(w: u32, h: u32, bands: &[(u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(w, h);
        for &(y1, y2) in bands {
            for y in y1..=y2 {
                for x in 10..w - 10 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        mask
    }

    fn segmenter() -> LineSegmenter {
        LineSegmenter::new(&LayoutConfig::default())
    }

    #[test]
    fn test_two_bands_two_blocks() {
        let mask = mask_with_bands(400, 300, &[(20, 60), (120, 170)]);
        let blocks = segmenter().segment(&mask, 0, 399);

        assert_eq!(blocks.len(), 2);
        assert_eq!((blocks[0].y, blocks[0].y2()), (20, 60));
        assert_eq!((blocks[1].y, blocks[1].y2()), (120, 170));
        assert_eq!(blocks[0].x, 0);
        assert_eq!(blocks[0].x2(), 399);
    }

    #[test]
    fn test_short_run_rejected() {
        // 10px tall band is below min_line_height (20).
        let mask = mask_with_bands(400, 300, &[(50, 59)]);
        let blocks = segmenter().segment(&mask, 0, 399);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_min_area_rejected() {
        // Narrow 2px column: 2 * 25 = 50 < 100 min area.
        let mask = mask_with_bands(400, 300, &[(50, 74)]);
        let blocks = segmenter().segment(&mask, 11, 12);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_run_reaching_bottom_edge_is_closed() {
        let mask = mask_with_bands(400, 300, &[(250, 299)]);
        let blocks = segmenter().segment(&mask, 0, 399);
        assert_eq!(blocks.len(), 1);
        assert_eq!((blocks[0].y, blocks[0].y2()), (250, 299));
    }

    #[test]
    fn test_blocks_never_shorter_than_minimum() {
        let mask = mask_with_bands(400, 600, &[(0, 5), (30, 80), (100, 112), (200, 260)]);
        let blocks = segmenter().segment(&mask, 0, 399);
        for b in &blocks {
            assert!(b.h + 1 >= 20, "block height {} below minimum", b.h + 1);
        }
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_inverted_column_range_empty() {
        let mask = mask_with_bands(400, 300, &[(20, 60)]);
        assert!(segmenter().segment(&mask, 200, 100).is_empty());
    }
}
