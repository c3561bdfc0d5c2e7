//! Column clustering from connected-component boxes.
//!
//! Groups component x-centers into left-to-right columns with a
//! deterministic 1-D k-means: evenly spaced initial centers, fixed
//! iteration cap, empty clusters keep their previous center. No
//! randomness, so identical input always yields identical columns.

use tracing::debug;

use super::{Column, Rect};
use crate::models::config::LayoutConfig;

const KMEANS_MAX_ITER: usize = 50;

/// Clusters component boxes into page columns.
pub struct ColumnClusterer {
    min_col_width: u32,
    max_cols: usize,
}

impl ColumnClusterer {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            min_col_width: config.min_col_width.max(1),
            max_cols: config.max_cols.max(1),
        }
    }

    /// Estimate a reasonable column count from the page width.
    fn estimate_column_count(&self, page_width: u32) -> usize {
        let estimated = (page_width as f64 / self.min_col_width as f64).round() as usize;
        estimated.clamp(1, self.max_cols)
    }

    /// Cluster component boxes into columns, left to right.
    ///
    /// Returns at least one column; with no input boxes the single
    /// column spans the full page width.
    pub fn cluster(&self, boxes: &[Rect], page_width: u32) -> Vec<Column> {
        let full_width = Column {
            index: 0,
            x_range: (0, page_width as i32 - 1),
        };

        if boxes.is_empty() || page_width == 0 {
            return vec![full_width];
        }

        let centers_x: Vec<f64> = boxes
            .iter()
            .map(|b| b.x as f64 + b.w as f64 / 2.0)
            .collect();

        let k = self.estimate_column_count(page_width);
        let (centers, labels) = kmeans_1d(&centers_x, k);
        if centers.is_empty() {
            return vec![full_width];
        }

        debug!("clustered {} boxes into {} column centers", boxes.len(), centers.len());

        let margin = (page_width as i32 / 100).max(5);
        let max_x = page_width as i32 - 1;

        let mut columns = Vec::with_capacity(centers.len());
        for ci in 0..centers.len() {
            let mut x1 = i32::MAX;
            let mut x2 = i32::MIN;
            for (b, &label) in boxes.iter().zip(labels.iter()) {
                if label != ci {
                    continue;
                }
                x1 = x1.min(b.x);
                x2 = x2.max(b.x2());
            }
            if x1 > x2 {
                continue;
            }
            columns.push(Column {
                index: ci,
                x_range: ((x1 - margin).max(0), (x2 + margin).min(max_x)),
            });
        }

        // Left-to-right order with contiguous indices; overlapping ranges
        // (wide boxes or the margin can cross cluster boundaries) are
        // pushed apart so the intervals stay disjoint.
        columns.sort_by_key(|c| c.x_range.0);
        let mut prev_end = -1i32;
        for (idx, col) in columns.iter_mut().enumerate() {
            col.index = idx;
            if col.x_range.0 <= prev_end {
                col.x_range.0 = (prev_end + 1).min(max_x);
            }
            if col.x_range.1 < col.x_range.0 {
                col.x_range.1 = col.x_range.0;
            }
            prev_end = col.x_range.1;
        }

        columns
    }
}

/// Deterministic 1-D k-means.
///
/// If there are at most `k` distinct values each becomes its own
/// cluster. Otherwise centers start evenly spaced over `[min, max]` and
/// iterate assign/recompute until no center moves or the cap is hit.
fn kmeans_1d(points: &[f64], k: usize) -> (Vec<f64>, Vec<usize>) {
    if points.is_empty() || k == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut unique: Vec<f64> = points.to_vec();
    unique.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    unique.dedup();

    if unique.len() <= k {
        let labels = points
            .iter()
            .map(|p| unique.iter().position(|u| u == p).unwrap_or(0))
            .collect();
        return (unique, labels);
    }

    let p_min = unique[0];
    let p_max = unique[unique.len() - 1];

    // Evenly spaced initial centers over [min, max].
    let step = (p_max - p_min) / (k - 1) as f64;
    let mut centers: Vec<f64> = (0..k).map(|i| p_min + step * i as f64).collect();
    let mut labels = vec![0usize; points.len()];

    for _ in 0..KMEANS_MAX_ITER {
        for (i, p) in points.iter().enumerate() {
            let mut best = 0usize;
            let mut best_dist = f64::INFINITY;
            for (ci, c) in centers.iter().enumerate() {
                let dist = (p - c).abs();
                if dist < best_dist {
                    best_dist = dist;
                    best = ci;
                }
            }
            labels[i] = best;
        }

        let mut moved = false;
        for ci in 0..k {
            let members: Vec<f64> = points
                .iter()
                .zip(labels.iter())
                .filter(|&(_, &l)| l == ci)
                .map(|(p, _)| *p)
                .collect();
            // Empty clusters keep their previous center to avoid oscillation.
            if members.is_empty() {
                continue;
            }
            let mean = members.iter().sum::<f64>() / members.len() as f64;
            if (mean - centers[ci]).abs() > 1e-9 {
                centers[ci] = mean;
                moved = true;
            }
        }

        if !moved {
            break;
        }
    }

    // Sort centers ascending and remap labels to the new order.
    let mut order: Vec<usize> = (0..k).collect();
    order.sort_by(|&a, &b| {
        centers[a]
            .partial_cmp(&centers[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut remap = vec![0usize; k];
    for (new, &old) in order.iter().enumerate() {
        remap[old] = new;
    }

    let sorted_centers: Vec<f64> = order.iter().map(|&i| centers[i]).collect();
    let remapped_labels: Vec<usize> = labels.iter().map(|&l| remap[l]).collect();

    (sorted_centers, remapped_labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::LayoutConfig;

    fn clusterer() -> ColumnClusterer {
        ColumnClusterer::new(&LayoutConfig::default())
    }

    fn boxes_at(xs: &[i32]) -> Vec<Rect> {
        xs.iter().map(|&x| Rect::new(x, 50, 40, 20)).collect()
    }

    #[test]
    fn test_no_boxes_full_width_column() {
        let cols = clusterer().cluster(&[], 1000);
        assert_eq!(cols.len(), 1);
        assert_eq!(cols[0].index, 0);
        assert_eq!(cols[0].x_range, (0, 999));
    }

    #[test]
    fn test_two_columns() {
        // Two tight groups far apart on a 1000px page (k estimate = 4).
        let boxes = boxes_at(&[100, 110, 120, 700, 710, 720]);
        let cols = clusterer().cluster(&boxes, 1000);

        assert!(cols.len() >= 2);
        // Contiguous indices, ascending disjoint ranges.
        for (i, col) in cols.iter().enumerate() {
            assert_eq!(col.index, i);
            assert!(col.x_range.0 <= col.x_range.1);
            if i > 0 {
                assert!(col.x_range.0 > cols[i - 1].x_range.1);
            }
        }
        // Leftmost column covers the left group, last covers the right.
        assert!(cols[0].x_range.0 <= 100 && cols[0].x_range.1 >= 160);
        let last = cols.last().unwrap();
        assert!(last.x_range.0 <= 700 && last.x_range.1 >= 760);
    }

    #[test]
    fn test_deterministic() {
        let boxes = boxes_at(&[30, 340, 350, 660, 900, 910, 150, 155]);
        let a = clusterer().cluster(&boxes, 1200);
        let b = clusterer().cluster(&boxes, 1200);
        assert_eq!(a.len(), b.len());
        for (ca, cb) in a.iter().zip(b.iter()) {
            assert_eq!(ca.index, cb.index);
            assert_eq!(ca.x_range, cb.x_range);
        }
    }

    #[test]
    fn test_ranges_clamped_to_page() {
        let boxes = boxes_at(&[0, 960]);
        let cols = clusterer().cluster(&boxes, 1000);
        for col in &cols {
            assert!(col.x_range.0 >= 0);
            assert!(col.x_range.1 <= 999);
        }
    }

    #[test]
    fn test_kmeans_distinct_values_become_clusters() {
        let points = [10.0, 10.0, 500.0];
        let (centers, labels) = kmeans_1d(&points, 5);
        assert_eq!(centers, vec![10.0, 500.0]);
        assert_eq!(labels, vec![0, 0, 1]);
    }

    #[test]
    fn test_kmeans_separates_groups() {
        let points = [1.0, 2.0, 3.0, 100.0, 101.0, 102.0];
        let (centers, labels) = kmeans_1d(&points, 2);
        assert_eq!(centers.len(), 2);
        assert!(centers[0] < centers[1]);
        assert_eq!(&labels[..3], &[0, 0, 0]);
        assert_eq!(&labels[3..], &[1, 1, 1]);
    }
}
