//! Bounding-rectangle bookkeeping for closed blocks.

use crate::types::CellAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rect {
    top: u32,
    left: u32,
    bottom: u32,
    right: u32,
}

impl Rect {
    fn contains(&self, row: u32, col: u32) -> bool {
        (self.top..=self.bottom).contains(&row) && (self.left..=self.right).contains(&col)
    }
}

/// Answers "is this coordinate inside any closed block's bounding rectangle".
///
/// Rectangles are kept sorted by top row together with the tallest height
/// seen, so a lookup only visits rectangles whose top lies within that height
/// above the probed row. There is no removal; a guard lives for one scan.
#[derive(Debug, Clone, Default)]
pub struct OverlapGuard {
    rects: Vec<Rect>,
    max_height: u32,
}

impl OverlapGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the inclusive bounds of a closed block.
    pub fn insert(&mut self, top_left: CellAddr, bottom_right: CellAddr) {
        let rect = Rect {
            top: top_left.row.min(bottom_right.row),
            left: top_left.col.min(bottom_right.col),
            bottom: top_left.row.max(bottom_right.row),
            right: top_left.col.max(bottom_right.col),
        };
        let pos = self.rects.partition_point(|r| r.top <= rect.top);
        self.rects.insert(pos, rect);
        self.max_height = self.max_height.max(rect.bottom - rect.top + 1);
    }

    /// `true` when `(row, col)` lies inside a registered rectangle.
    pub fn claim(&self, row: u32, col: u32) -> bool {
        if self.rects.is_empty() {
            return false;
        }
        let lowest_top = row.saturating_sub(self.max_height - 1);
        let start = self.rects.partition_point(|r| r.top < lowest_top);
        let end = self.rects.partition_point(|r| r.top <= row);
        self.rects
            .get(start..end)
            .is_some_and(|candidates| candidates.iter().any(|r| r.contains(row, col)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_guard_claims_nothing() {
        let guard = OverlapGuard::new();
        assert!(!guard.claim(0, 0));
        assert!(!guard.claim(1_048_575, 16_383));
    }

    #[test]
    fn test_claim_inside_and_on_edges() {
        let mut guard = OverlapGuard::new();
        guard.insert(CellAddr::new(2, 1), CellAddr::new(4, 3));
        assert!(guard.claim(2, 1));
        assert!(guard.claim(4, 3));
        assert!(guard.claim(3, 2));
        assert!(!guard.claim(1, 1));
        assert!(!guard.claim(5, 1));
        assert!(!guard.claim(3, 0));
        assert!(!guard.claim(3, 4));
    }

    #[test]
    fn test_tall_rectangle_found_from_far_below_its_top() {
        let mut guard = OverlapGuard::new();
        guard.insert(CellAddr::new(0, 0), CellAddr::new(99, 0));
        for row in 1..40 {
            guard.insert(CellAddr::new(row, 5), CellAddr::new(row, 5));
        }
        assert!(guard.claim(99, 0));
        assert!(!guard.claim(100, 0));
        assert!(guard.claim(20, 5));
        assert!(!guard.claim(50, 5));
        assert!(!guard.claim(40, 5));
    }

    #[test]
    fn test_out_of_order_inserts() {
        let mut guard = OverlapGuard::new();
        guard.insert(CellAddr::new(10, 0), CellAddr::new(10, 0));
        guard.insert(CellAddr::new(0, 0), CellAddr::new(1, 1));
        assert!(guard.claim(1, 1));
        assert!(guard.claim(10, 0));
        assert!(!guard.claim(5, 0));
    }

    #[test]
    fn test_matches_linear_scan() {
        let rects = [
            (CellAddr::new(0, 0), CellAddr::new(2, 2)),
            (CellAddr::new(1, 5), CellAddr::new(6, 6)),
            (CellAddr::new(4, 1), CellAddr::new(4, 3)),
            (CellAddr::new(7, 0), CellAddr::new(9, 9)),
        ];
        let mut guard = OverlapGuard::new();
        for (tl, br) in rects {
            guard.insert(tl, br);
        }
        for row in 0..12 {
            for col in 0..12 {
                let linear = rects.iter().any(|(tl, br)| {
                    (tl.row..=br.row).contains(&row) && (tl.col..=br.col).contains(&col)
                });
                assert_eq!(guard.claim(row, col), linear, "({row}, {col})");
            }
        }
    }
}
