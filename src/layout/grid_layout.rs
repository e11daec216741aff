/// Fixed tile size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Geometry of a uniform grid for one viewport size and item count.
///
/// Indices run row-major. The last row is padded to a full `columns` width,
/// so `max_index` may point past the last real item; such padded indices
/// never have an item behind them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub columns: usize,
    pub total_rows: usize,
    /// Last addressable index, `None` when there are no items.
    pub max_index: Option<usize>,
    /// Number of indices the materialized window spans when unclamped.
    pub capacity: usize,
    pub visible_rows: usize,
    pub buffer_rows: usize,
    pub item_count: usize,
    pub cell: CellSize,
    pub gap: f32,
}

/// Computes the layout with the default buffer of rows around the viewport.
#[cfg(test)]
pub fn compute_layout(
    viewport_width: f32,
    viewport_height: f32,
    item_count: usize,
    cell: CellSize,
    gap: f32,
) -> GridLayout {
    GridLayout::compute(
        viewport_width,
        viewport_height,
        item_count,
        cell,
        gap,
        crate::config::DEFAULT_BUFFER_ROWS,
    )
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

impl GridLayout {
    pub fn compute(
        viewport_width: f32,
        viewport_height: f32,
        item_count: usize,
        cell: CellSize,
        gap: f32,
        buffer_rows: usize,
    ) -> Self {
        let viewport_width = sanitize(viewport_width);
        let viewport_height = sanitize(viewport_height);
        let gap = sanitize(gap);
        let col_pitch = (sanitize(cell.width) + gap).max(1.0);
        let row_pitch = (sanitize(cell.height) + gap).max(1.0);

        let columns = (((viewport_width + gap) / col_pitch).floor() as usize).max(1);
        let total_rows = item_count.div_ceil(columns);
        let max_index = (total_rows * columns).checked_sub(1);
        let visible_rows = (((viewport_height + gap) / row_pitch).ceil() as usize).max(1);
        let capacity = (visible_rows + 2 * buffer_rows) * columns;

        Self {
            columns,
            total_rows,
            max_index,
            capacity,
            visible_rows,
            buffer_rows,
            item_count,
            cell,
            gap,
        }
    }

    fn row_pitch(&self) -> f32 {
        (self.cell.height + self.gap).max(1.0)
    }

    fn column_pitch(&self) -> f32 {
        (self.cell.width + self.gap).max(1.0)
    }

    pub fn row_of(&self, index: usize) -> usize {
        index / self.columns
    }

    pub fn column_of(&self, index: usize) -> usize {
        index % self.columns
    }

    /// First index of the row containing `index`.
    #[cfg(test)]
    pub fn row_start(&self, index: usize) -> usize {
        self.row_of(index) * self.columns
    }

    pub fn row_top(&self, row: usize) -> f32 {
        row as f32 * self.row_pitch()
    }

    /// Bottom edge of a row, excluding the trailing gap.
    pub fn row_bottom(&self, row: usize) -> f32 {
        self.row_top(row) + self.cell.height
    }

    /// Top-left corner of the cell at `index`.
    pub fn position_of(&self, index: usize) -> (f32, f32) {
        (
            self.column_of(index) as f32 * self.column_pitch(),
            self.row_top(self.row_of(index)),
        )
    }

    /// Row under a vertical content offset, clamped to the last row.
    pub fn row_at_offset(&self, offset: f32) -> usize {
        let row = (sanitize(offset) / self.row_pitch()).floor() as usize;
        row.min(self.total_rows.saturating_sub(1))
    }

    pub fn content_width(&self) -> f32 {
        (self.columns as f32 * self.column_pitch() - self.gap).max(0.0)
    }

    pub fn content_height(&self) -> f32 {
        if self.total_rows == 0 {
            return 0.0;
        }
        self.row_top(self.total_rows - 1) + self.cell.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellSize = CellSize::new(150.0, 100.0);

    #[test]
    fn test_reference_viewport() {
        let layout = compute_layout(700.0, 400.0, 10, CELL, 25.0);
        assert_eq!(layout.columns, 4);
        assert_eq!(layout.total_rows, 3);
        assert_eq!(layout.max_index, Some(11));
        // 400px at 125px per row -> 4 visible rows, plus 8 buffer rows each side.
        assert_eq!(layout.visible_rows, 4);
        assert_eq!(layout.capacity, (4 + 16) * 4);
    }

    #[test]
    fn test_column_formula_across_widths() {
        for width in [0.0f32, 1.0, 149.0, 150.0, 174.0, 325.0, 700.0, 1919.0, 3840.0] {
            for gap in [0.0f32, 2.0, 25.0] {
                let layout = compute_layout(width, 600.0, 100, CELL, gap);
                let expected = (((width + gap) / (CELL.width + gap)).floor() as usize).max(1);
                assert_eq!(layout.columns, expected, "width {} gap {}", width, gap);
            }
        }
    }

    #[test]
    fn test_max_index_pads_last_row() {
        for n in 1..60usize {
            for width in [150.0f32, 500.0, 700.0, 1200.0] {
                let layout = compute_layout(width, 600.0, n, CELL, 25.0);
                let cols = layout.columns;
                assert_eq!(layout.max_index, Some(n.div_ceil(cols) * cols - 1));
                assert!(layout.max_index.unwrap() >= n - 1);
            }
        }
    }

    #[test]
    fn test_empty_collection_has_no_max_index() {
        let layout = compute_layout(700.0, 400.0, 0, CELL, 25.0);
        assert_eq!(layout.total_rows, 0);
        assert_eq!(layout.max_index, None);
        assert_eq!(layout.content_height(), 0.0);
    }

    #[test]
    fn test_garbage_metrics_fall_back_to_one_column() {
        let layout = compute_layout(f32::NAN, -50.0, 7, CELL, 25.0);
        assert_eq!(layout.columns, 1);
        assert_eq!(layout.visible_rows, 1);
        assert_eq!(layout.max_index, Some(6));
    }

    #[test]
    fn test_positions() {
        let layout = compute_layout(700.0, 400.0, 10, CELL, 25.0);
        assert_eq!(layout.position_of(0), (0.0, 0.0));
        assert_eq!(layout.position_of(5), (175.0, 125.0));
        assert_eq!(layout.row_start(7), 4);
        assert_eq!(layout.row_at_offset(260.0), 2);
        assert_eq!(layout.row_at_offset(10_000.0), 2);
        assert_eq!(layout.content_height(), 350.0);
        assert_eq!(layout.content_width(), 675.0);
    }
}
