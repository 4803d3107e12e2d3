//! Paginated tables for the flowing documents.
//!
//! A `TablePager` owns the page geometry, the vertical cursor and the page
//! counter. Renderers hand it a header callback that paints the top of a fresh
//! page and returns where rows may begin; the pager calls it again whenever
//! a row would start below the break threshold.

use crate::canvas::{Canvas, Color, TextStyle};
use crate::text_fit::{render_text_with_fit, COLUMN_GUTTER};

// ============================================================================
// GEOMETRY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Rows never start below this distance from the bottom edge
    pub break_threshold: f32,
}

impl PageGeometry {
    /// US letter, portrait.
    pub const fn letter(margin: f32, break_threshold: f32) -> Self {
        PageGeometry {
            width: 612.0,
            height: 792.0,
            margin,
            break_threshold,
        }
    }

    pub fn top(&self) -> f32 {
        self.height - self.margin
    }

    pub fn left(&self) -> f32 {
        self.margin
    }

    pub fn right(&self) -> f32 {
        self.width - self.margin
    }

    pub fn center_x(&self) -> f32 {
        self.width / 2.0
    }
}

// ============================================================================
// COLUMNS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub title: &'static str,
    pub x: f32,
}

impl Column {
    pub const fn new(title: &'static str, x: f32) -> Self {
        Column { title, x }
    }
}

/// Fixed column schema; cell widths run up to the next column, the last one
/// up to `right_edge`.
#[derive(Debug, Clone, Copy)]
pub struct Columns<'a> {
    pub columns: &'a [Column],
    pub right_edge: f32,
}

impl<'a> Columns<'a> {
    pub fn new(columns: &'a [Column], right_edge: f32) -> Self {
        Columns {
            columns,
            right_edge,
        }
    }

    /// Usable width of column `index`.
    pub fn width(&self, index: usize) -> f32 {
        let Some(column) = self.columns.get(index) else {
            return 0.0;
        };
        let end = self
            .columns
            .get(index + 1)
            .map(|next| next.x)
            .unwrap_or(self.right_edge);
        (end - column.x - COLUMN_GUTTER).max(0.0)
    }

    /// Column titles in bold with a rule underneath. Returns the cursor below.
    pub fn draw_headers<C: Canvas + ?Sized>(&self, canvas: &mut C, y: f32, size: f32) -> f32 {
        let style = TextStyle::bold(size);
        for (i, column) in self.columns.iter().enumerate() {
            render_text_with_fit(canvas, column.title, column.x, y, self.width(i), style);
        }
        let rule_y = y - 4.0;
        let left = self.columns.first().map(|c| c.x).unwrap_or(0.0);
        canvas.line(left, rule_y, self.right_edge, rule_y, 0.5, Color::RULE);
        rule_y - size - 2.0
    }

    /// One fitted cell per column; missing trailing cells are left blank.
    pub fn draw_row<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        cells: &[&str],
        y: f32,
        style: TextStyle,
    ) {
        for (i, (column, cell)) in self.columns.iter().zip(cells).enumerate() {
            render_text_with_fit(canvas, cell, column.x, y, self.width(i), style);
        }
    }
}

// ============================================================================
// PAGER
// ============================================================================

#[derive(Debug)]
pub struct TablePager {
    geometry: PageGeometry,
    page: usize,
    y: f32,
}

impl TablePager {
    pub fn new(geometry: PageGeometry) -> Self {
        TablePager {
            geometry,
            page: 0,
            y: geometry.top(),
        }
    }

    /// 1-based number of the current page, 0 before the first.
    #[cfg(test)]
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    /// Opens a page and lets `header` paint it. `header` receives the new page
    /// number and returns the cursor where content continues.
    pub fn start_page<C, H>(&mut self, canvas: &mut C, header: &mut H)
    where
        C: Canvas + ?Sized,
        H: FnMut(&mut C, usize) -> f32,
    {
        canvas.begin_page(self.geometry.width, self.geometry.height);
        self.page += 1;
        self.y = header(canvas, self.page);
    }

    /// Reserves a row of `height` points, breaking first if the cursor is
    /// already below the threshold. Returns the row's baseline.
    pub fn row<C, H>(&mut self, canvas: &mut C, height: f32, header: &mut H) -> f32
    where
        C: Canvas + ?Sized,
        H: FnMut(&mut C, usize) -> f32,
    {
        if self.y < self.geometry.break_threshold {
            self.start_page(canvas, header);
        }
        let baseline = self.y;
        self.y -= height;
        baseline
    }

    /// Breaks unless a block of `needed` points still leaves the cursor at or
    /// above the break threshold, so the row after the block stays with it.
    pub fn keep_together<C, H>(&mut self, canvas: &mut C, needed: f32, header: &mut H)
    where
        C: Canvas + ?Sized,
        H: FnMut(&mut C, usize) -> f32,
    {
        if self.y - needed < self.geometry.break_threshold {
            self.start_page(canvas, header);
        }
    }

    /// Breaks unless `needed` points remain above the bottom margin.
    pub fn ensure_room<C, H>(&mut self, canvas: &mut C, needed: f32, header: &mut H)
    where
        C: Canvas + ?Sized,
        H: FnMut(&mut C, usize) -> f32,
    {
        if self.y - needed < self.geometry.margin {
            self.start_page(canvas, header);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::recording::RecordingCanvas;

    const COLUMNS: [Column; 3] = [
        Column::new("A", 40.0),
        Column::new("B", 100.0),
        Column::new("C", 200.0),
    ];

    #[test]
    fn test_column_widths() {
        let columns = Columns::new(&COLUMNS, 572.0);
        assert_eq!(columns.width(0), 100.0 - 40.0 - COLUMN_GUTTER);
        assert_eq!(columns.width(1), 200.0 - 100.0 - COLUMN_GUTTER);
        assert_eq!(columns.width(2), 572.0 - 200.0 - COLUMN_GUTTER);
        assert_eq!(columns.width(3), 0.0);
    }

    #[test]
    fn test_headers_and_rows() {
        let mut canvas = RecordingCanvas::default();
        canvas.begin_page(612.0, 792.0);
        let columns = Columns::new(&COLUMNS, 572.0);

        let next = columns.draw_headers(&mut canvas, 700.0, 8.0);
        assert!(next < 700.0);
        columns.draw_row(&mut canvas, &["1", "", "three"], next, TextStyle::regular(7.0));

        assert_eq!(canvas.texts(), vec!["A", "B", "C", "1", "three"]);
        assert_eq!(canvas.find("three").map(|(_, x, ..)| x), Some(200.0));
    }

    #[test]
    fn test_pager_breaks_below_threshold() {
        let geometry = PageGeometry::letter(40.0, 150.0);
        let mut pager = TablePager::new(geometry);
        let mut canvas = RecordingCanvas::default();
        let mut headers = Vec::new();
        let mut header = |c: &mut RecordingCanvas, page: usize| {
            headers.push(page);
            c.text(&format!("header {page}"), 40.0, 750.0, TextStyle::bold(10.0));
            700.0
        };

        pager.start_page(&mut canvas, &mut header);
        let mut baselines = Vec::new();
        for _ in 0..60 {
            baselines.push(pager.row(&mut canvas, 12.0, &mut header));
        }

        assert!(baselines.iter().all(|y| *y >= 150.0));
        assert_eq!(canvas.page_count(), 2);
        drop(header);
        assert_eq!(headers, vec![1, 2]);
    }

    #[test]
    fn test_ensure_room() {
        let geometry = PageGeometry::letter(40.0, 150.0);
        let mut pager = TablePager::new(geometry);
        let mut canvas = RecordingCanvas::default();
        let mut header = |_: &mut RecordingCanvas, _: usize| 200.0;

        pager.start_page(&mut canvas, &mut header);
        pager.ensure_room(&mut canvas, 100.0, &mut header);
        assert_eq!(pager.page(), 1);

        pager.ensure_room(&mut canvas, 200.0, &mut header);
        assert_eq!(pager.page(), 2);
    }

    #[test]
    fn test_keep_together_uses_break_threshold() {
        let geometry = PageGeometry::letter(40.0, 150.0);
        let mut pager = TablePager::new(geometry);
        let mut canvas = RecordingCanvas::default();
        let mut header = |_: &mut RecordingCanvas, _: usize| 200.0;

        pager.start_page(&mut canvas, &mut header);
        pager.keep_together(&mut canvas, 50.0, &mut header);
        assert_eq!(pager.page(), 1);

        // Fits above the margin but would push the next row below the threshold.
        pager.keep_together(&mut canvas, 60.0, &mut header);
        assert_eq!(pager.page(), 2);
        assert_eq!(pager.y(), 200.0);
    }
}
