//! Single-line text fitting for table cells.
//!
//! Each cell is fitted on its own against a fixed column width. Text that does
//! not fit is cut at the longest character prefix that leaves room for an
//! ellipsis.

use std::borrow::Cow;

use crate::canvas::{Canvas, TextStyle};

/// Share of the column width text may occupy.
pub const SAFETY_MARGIN: f32 = 0.90;
pub const ELLIPSIS: &str = "...";
/// Space left between a cell and the next column.
pub const COLUMN_GUTTER: f32 = 4.0;

/// Decides what to draw for `text` in a column `max_width` points wide.
///
/// Returns `None` when nothing should be drawn. The result is never empty
/// apart from that: at least one character survives truncation even when the
/// column is too narrow for it.
pub fn fit_text<'a, F>(text: &'a str, max_width: f32, measure: F) -> Option<Cow<'a, str>>
where
    F: Fn(&str) -> f32,
{
    if text.is_empty() || max_width <= 0.0 {
        return None;
    }

    let budget = max_width * SAFETY_MARGIN;
    if measure(text) <= budget {
        return Some(Cow::Borrowed(text));
    }

    // Byte offset of every character boundary; boundaries[n] ends the n-char prefix.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let room = budget - measure(ELLIPSIS);

    let (mut lo, mut hi) = (0usize, boundaries.len() - 1);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if measure(&text[..boundaries[mid]]) <= room {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    let keep = boundaries[lo.max(1)];
    Some(Cow::Owned(format!("{}{ELLIPSIS}", &text[..keep])))
}

/// Draws `text` at `(x, y)`, truncated to fit `max_width`. Returns the font
/// size used.
pub fn render_text_with_fit<C: Canvas + ?Sized>(
    canvas: &mut C,
    text: &str,
    x: f32,
    y: f32,
    max_width: f32,
    style: TextStyle,
) -> f32 {
    if let Some(fitted) = fit_text(text, max_width, |s| style.width(s)) {
        canvas.text(&fitted, x, y, style);
    }
    style.size
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::recording::RecordingCanvas;

    fn measure(s: &str) -> f32 {
        TextStyle::regular(8.0).width(s)
    }

    #[test]
    fn test_text_within_budget_is_unchanged() {
        let text = "Oxycodone";
        let max = measure(text) / SAFETY_MARGIN + 0.01;
        assert_eq!(fit_text(text, max, measure).as_deref(), Some(text));
    }

    #[test]
    fn test_long_text_is_truncated_within_budget() {
        let text = "Hydrocodone Bitartrate and Acetaminophen Tablets";
        for max in [20.0, 35.0, 60.0, 120.0] {
            let fitted = fit_text(text, max, measure).unwrap();
            assert!(fitted.ends_with(ELLIPSIS), "{fitted}");
            assert!(measure(&fitted) <= max * SAFETY_MARGIN, "{fitted} at {max}");

            let prefix = fitted.trim_end_matches(ELLIPSIS);
            assert!(!prefix.is_empty());
            assert!(text.starts_with(prefix));
        }
    }

    #[test]
    fn test_prefix_is_longest_that_fits() {
        let text = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        let max = 60.0;
        let fitted = fit_text(text, max, measure).unwrap();
        let prefix = fitted.trim_end_matches(ELLIPSIS);

        let one_more = &text[..prefix.len() + 1];
        assert!(measure(one_more) + measure(ELLIPSIS) > max * SAFETY_MARGIN);
    }

    #[test]
    fn test_narrow_column_keeps_one_character() {
        let fitted = fit_text("Morphine", 2.0, measure).unwrap();
        assert_eq!(fitted, "M...");
    }

    #[test]
    fn test_multibyte_text_cuts_on_char_boundary() {
        let fitted = fit_text("Ñandú µg ÅÄÖ ñññññññññññ", 30.0, measure).unwrap();
        assert!(fitted.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_empty_or_zero_width_draws_nothing() {
        let mut canvas = RecordingCanvas::default();
        canvas.begin_page(612.0, 792.0);

        let style = TextStyle::regular(9.0);
        assert_eq!(render_text_with_fit(&mut canvas, "", 10.0, 10.0, 50.0, style), 9.0);
        assert_eq!(render_text_with_fit(&mut canvas, "Text", 10.0, 10.0, 0.0, style), 9.0);
        assert_eq!(render_text_with_fit(&mut canvas, "Text", 10.0, 10.0, -5.0, style), 9.0);
        assert!(canvas.ops.is_empty());
    }

    #[test]
    fn test_render_draws_fitted_text() {
        let mut canvas = RecordingCanvas::default();
        canvas.begin_page(612.0, 792.0);

        let style = TextStyle::regular(9.0);
        render_text_with_fit(&mut canvas, "Fentanyl Citrate Injection", 40.0, 700.0, 40.0, style);

        let texts = canvas.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with('F'));
        assert!(texts[0].ends_with(ELLIPSIS));
    }
}
