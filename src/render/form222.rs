//! DEA Form 222 overlay.
//!
//! Text is placed at fixed coordinates so it lands in the boxes of the
//! pre-printed sheet. Items are split into fixed-size chunks, one per page.

use tracing::debug;

use super::{render_document, DocumentKind, RenderContext, RenderedPdf};
use crate::background::BackgroundProvider;
use crate::canvas::{Canvas, Color, TextStyle};
use crate::coordinates::{
    format_ndc, CoordinateConfig, FieldOffset, FieldPosition, LineItemColumns,
    FORM222_PAGE_HEIGHT, FORM222_PAGE_WIDTH,
};
use crate::error::RenderResult;
use crate::model::{LineItem, ReportData};

/// Spacing of the calibration grid, in points.
const GRID_STEP: f32 = 50.0;

/// Calibration aids. Both are off in production.
#[derive(Clone, Copy, Default)]
pub struct Form222Options<'a> {
    pub background: Option<&'a dyn BackgroundProvider>,
    pub show_grid: bool,
}

/// `ceil(total / per_page)`, never less than one page.
pub fn pages_needed(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page.max(1)).max(1)
}

pub fn generate_form222(
    data: &ReportData,
    config: &CoordinateConfig,
    options: &Form222Options<'_>,
    ctx: &RenderContext,
) -> RenderResult<RenderedPdf> {
    render_document(DocumentKind::Form222, data, ctx, |canvas| {
        paint_form222(canvas, data, config, options, ctx)
    })
}

pub fn paint_form222<C: Canvas + ?Sized>(
    canvas: &mut C,
    data: &ReportData,
    config: &CoordinateConfig,
    options: &Form222Options<'_>,
    ctx: &RenderContext,
) -> RenderResult<()> {
    let per_page = config.line_items.max_items_per_page.max(1);
    let total = data.line_items.len();
    let pages = pages_needed(total, per_page);
    let backdrop = options.background.and_then(|provider| provider.backdrop());
    debug!(total, per_page, pages, backdrop = backdrop.is_some(), "laying out form 222");

    for (page, chunk) in page_chunks(&data.line_items, per_page, pages).enumerate() {
        canvas.begin_page(FORM222_PAGE_WIDTH, FORM222_PAGE_HEIGHT);
        if let Some(image) = &backdrop {
            canvas.image(image, 0.0, 0.0, FORM222_PAGE_WIDTH, FORM222_PAGE_HEIGHT);
        }
        if options.show_grid {
            draw_grid(canvas);
        }

        paint_registrant(canvas, data, config, ctx);

        let first_number = page * per_page + 1;
        for (row, item) in chunk.iter().enumerate() {
            let y = config.line_item_y(row)?;
            paint_line_item(canvas, &config.line_items.columns, first_number + row, item, y);
        }

        if pages > 1 {
            draw_field(
                canvas,
                &format!("Page {} of {}", page + 1, pages),
                &config.page_number,
            );
        }
    }
    Ok(())
}

/// Item slices per page; an empty list still yields one empty page.
fn page_chunks(
    items: &[LineItem],
    per_page: usize,
    pages: usize,
) -> impl Iterator<Item = &[LineItem]> {
    (0..pages).map(move |page| {
        let start = (page * per_page).min(items.len());
        let end = (start + per_page).min(items.len());
        &items[start..end]
    })
}

/// Fields repeated on every sheet: DEA number, supplier block, date, count.
fn paint_registrant<C: Canvas + ?Sized>(
    canvas: &mut C,
    data: &ReportData,
    config: &CoordinateConfig,
    ctx: &RenderContext,
) {
    draw_field(canvas, data.dea_number(), &config.dea_number);

    let business = &config.business;
    let style = TextStyle::regular(business.size);
    let client = &data.client;
    let fields: [(&str, FieldOffset); 5] = [
        (client.business_name.as_str(), business.name),
        (client.street_address.as_str(), business.street_address),
        (client.city.as_str(), business.city),
        (client.state.as_str(), business.state),
        (client.zip_code.as_str(), business.zip_code),
    ];
    for (text, offset) in fields {
        if text.is_empty() {
            continue;
        }
        canvas.text(
            text,
            business.x + offset.x_offset,
            business.y + offset.y_offset,
            style,
        );
    }

    draw_field(canvas, &ctx.display_date(), &config.order_date);
    draw_field(
        canvas,
        &data.line_items.len().to_string(),
        &config.total_items,
    );
}

/// Draws `text` at `field`, one character per box when the field has a
/// character spacing.
fn draw_field<C: Canvas + ?Sized>(canvas: &mut C, text: &str, field: &FieldPosition) {
    if text.is_empty() {
        return;
    }
    let style = TextStyle::regular(field.size);
    match field.character_spacing {
        Some(spacing) => {
            let mut buf = [0u8; 4];
            for (i, c) in text.chars().enumerate() {
                canvas.text(
                    c.encode_utf8(&mut buf),
                    field.x + i as f32 * spacing,
                    field.y,
                    style,
                );
            }
        }
        None => canvas.text(text, field.x, field.y, style),
    }
}

fn paint_line_item<C: Canvas + ?Sized>(
    canvas: &mut C,
    columns: &LineItemColumns,
    number: usize,
    item: &LineItem,
    y: f32,
) {
    let cell = |canvas: &mut C, text: &str, x: f32, size: f32| {
        if !text.is_empty() {
            canvas.text(text, x, y, TextStyle::regular(size));
        }
    };

    cell(canvas, number.to_string().as_str(), columns.line_number.x, columns.line_number.size);
    cell(canvas, item.packages.to_string().as_str(), columns.packages.x, columns.packages.size);
    cell(canvas, item.package_size.as_str(), columns.package_size.x, columns.package_size.size);
    cell(canvas, item.display_name(), columns.item_name.x, columns.item_name.size);

    let ndc = &columns.ndc;
    match ndc.digit_spacing {
        Some(spacing) => {
            let style = TextStyle::regular(ndc.size);
            let mut buf = [0u8; 4];
            for (i, digit) in item.ndc11.chars().filter(char::is_ascii_digit).enumerate() {
                canvas.text(digit.encode_utf8(&mut buf), ndc.x + i as f32 * spacing, y, style);
            }
        }
        None => cell(canvas, format_ndc(&item.ndc11).as_str(), ndc.x, ndc.size),
    }
}

/// Labelled 50pt grid for lining coordinates up with the form.
fn draw_grid<C: Canvas + ?Sized>(canvas: &mut C) {
    let label = TextStyle::regular(5.0).with_color(Color::GRID);
    let steps = |limit: f32| (1..).map(|i| i as f32 * GRID_STEP).take_while(move |v| *v < limit);

    for x in steps(FORM222_PAGE_WIDTH) {
        canvas.line(x, 0.0, x, FORM222_PAGE_HEIGHT, 0.25, Color::GRID);
        canvas.text(&format!("{x}"), x + 1.0, 2.0, label);
    }
    for y in steps(FORM222_PAGE_HEIGHT) {
        canvas.line(0.0, y, FORM222_PAGE_WIDTH, y, 0.25, Color::GRID);
        canvas.text(&format!("{y}"), 2.0, y + 1.0, label);
    }
}

#[cfg(test)]
mod tests {
    use ::image::{DynamicImage, RgbImage};
    use serde_json::json;

    use super::*;
    use crate::canvas::recording::{DrawOp, RecordingCanvas};
    use crate::coordinates::CoordinateStore;
    use crate::render::fixtures;

    fn paint(data: &ReportData, config: &CoordinateConfig, options: &Form222Options<'_>) -> RecordingCanvas {
        let mut canvas = RecordingCanvas::default();
        paint_form222(&mut canvas, data, config, options, &fixtures::ctx()).unwrap();
        canvas
    }

    /// `(page, text)` for every text drawn at column `x`.
    fn column(canvas: &RecordingCanvas, column_x: f32) -> Vec<(usize, String)> {
        canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { page, text, x, .. } if *x == column_x => Some((*page, text.clone())),
                _ => None,
            })
            .collect()
    }

    struct SolidBackground;

    impl BackgroundProvider for SolidBackground {
        fn backdrop(&self) -> Option<DynamicImage> {
            Some(DynamicImage::ImageRgb8(RgbImage::new(8, 6)))
        }
    }

    #[test]
    fn test_pages_needed() {
        assert_eq!(pages_needed(0, 20), 1);
        assert_eq!(pages_needed(20, 20), 1);
        assert_eq!(pages_needed(21, 20), 2);
        assert_eq!(pages_needed(41, 20), 3);
        assert_eq!(pages_needed(5, 0), 5);
    }

    #[test]
    fn test_overflow_by_one_adds_a_page_and_numbers_continue() {
        let config = CoordinateConfig::default();
        let max = config.line_items.max_items_per_page;
        let canvas = paint(&fixtures::report(2 * max + 1), &config, &Form222Options::default());

        assert_eq!(canvas.page_count(), 3);
        assert!(canvas.pages.iter().all(|p| *p == (FORM222_PAGE_WIDTH, FORM222_PAGE_HEIGHT)));

        let numbers = column(&canvas, config.line_items.columns.line_number.x);
        let expected: Vec<(usize, String)> =
            (0..2 * max + 1).map(|i| (i / max, (i + 1).to_string())).collect();
        assert_eq!(numbers, expected);
    }

    #[test]
    fn test_twenty_five_items_on_two_pages() {
        let config = CoordinateConfig::default();
        assert_eq!(config.line_items.max_items_per_page, 20);
        let canvas = paint(&fixtures::report(25), &config, &Form222Options::default());

        assert_eq!(canvas.page_count(), 2);
        let numbers = column(&canvas, config.line_items.columns.line_number.x);
        assert_eq!(numbers.iter().filter(|(p, _)| *p == 0).count(), 20);
        assert_eq!(numbers.iter().filter(|(p, _)| *p == 1).count(), 5);

        assert_eq!(canvas.find("Page 1 of 2").map(|(page, ..)| page), Some(0));
        assert_eq!(canvas.find("Page 2 of 2").map(|(page, ..)| page), Some(1));

        // Rows restart at the top of the second sheet.
        let first_row_y = config.line_item_y(0).unwrap();
        let (_, _, y, _) = canvas.find("Oxycodone HCl 21mg Tablet").unwrap();
        assert_eq!(y, first_row_y);
    }

    #[test]
    fn test_single_page_has_no_page_stamp() {
        let canvas = paint(&fixtures::report(3), &CoordinateConfig::default(), &Form222Options::default());
        assert_eq!(canvas.page_count(), 1);
        assert!(canvas.texts().iter().all(|t| !t.starts_with("Page ")));
    }

    #[test]
    fn test_empty_report_renders_one_page() {
        let config = CoordinateConfig::default();
        let canvas = paint(&fixtures::report(0), &config, &Form222Options::default());

        assert_eq!(canvas.page_count(), 1);
        assert!(column(&canvas, config.line_items.columns.line_number.x).is_empty());
        let total = &config.total_items;
        assert_eq!(canvas.find("0").map(|(_, x, y, _)| (x, y)), Some((total.x, total.y)));
    }

    #[test]
    fn test_dea_number_is_boxed_per_character() {
        let config = CoordinateConfig::default();
        let canvas = paint(&fixtures::report(1), &config, &Form222Options::default());

        let dea = &config.dea_number;
        let spacing = dea.character_spacing.unwrap();
        let drawn: String = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, x, y, .. } if *y == dea.y && *x >= dea.x => {
                    let slot = (*x - dea.x) / spacing;
                    (slot.fract() == 0.0).then(|| text.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(drawn, "BM1234563");
    }

    #[test]
    fn test_dea_number_as_one_string_without_spacing() {
        let store = CoordinateStore::default();
        let config = store
            .update(&json!({ "deaNumber": { "x": 600.0, "y": 560.0, "size": 11.0 } }))
            .unwrap();
        let canvas = paint(&fixtures::report(1), &config, &Form222Options::default());
        assert_eq!(canvas.find("BM1234563").map(|(_, x, ..)| x), Some(600.0));
    }

    #[test]
    fn test_business_fields_use_offsets() {
        let config = CoordinateConfig::default();
        let canvas = paint(&fixtures::report(1), &config, &Form222Options::default());
        let b = &config.business;

        let (_, x, y, _) = canvas.find("Main Street Pharmacy").unwrap();
        assert_eq!((x, y), (b.x + b.name.x_offset, b.y + b.name.y_offset));
        let (_, x, y, _) = canvas.find("62701").unwrap();
        assert_eq!((x, y), (b.x + b.zip_code.x_offset, b.y + b.zip_code.y_offset));
        assert!(canvas.find("03/07/2024").is_some());
    }

    #[test]
    fn test_ndc_digits_are_boxed_and_stripped() {
        let config = CoordinateConfig::default();
        let mut data = fixtures::report(1);
        data.line_items[0].ndc11 = "59011-0100-01".to_string();
        let canvas = paint(&data, &config, &Form222Options::default());

        let ndc = &config.line_items.columns.ndc;
        let spacing = ndc.digit_spacing.unwrap();
        let row_y = config.line_item_y(0).unwrap();
        let digits: Vec<(f32, String)> = canvas
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, x, y, .. } if *y == row_y && *x >= ndc.x => {
                    Some((*x, text.clone()))
                }
                _ => None,
            })
            .collect();

        assert_eq!(digits.len(), 11);
        assert_eq!(digits.iter().map(|(_, t)| t.as_str()).collect::<String>(), "59011010001");
        assert_eq!(digits[10].0, ndc.x + 10.0 * spacing);
    }

    #[test]
    fn test_ndc_as_formatted_string_without_spacing() {
        let store = CoordinateStore::default();
        let config = store
            .update(&json!({ "lineItems": { "columns": { "ndc": { "x": 470.0, "size": 9.0 } } } }))
            .unwrap();
        let canvas = paint(&fixtures::report(1), &config, &Form222Options::default());
        assert_eq!(canvas.find("59011-0100-00").map(|(_, x, ..)| x), Some(470.0));
    }

    #[test]
    fn test_calibration_aids() {
        let background = SolidBackground;
        let options = Form222Options {
            background: Some(&background),
            show_grid: true,
        };
        let canvas = paint(&fixtures::report(25), &CoordinateConfig::default(), &options);

        assert_eq!(canvas.images(), 2);
        assert!(canvas.find("50").is_some());
        let grid_lines = canvas
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count();
        // 15 vertical + 12 horizontal per page
        assert_eq!(grid_lines, 2 * (15 + 12));
    }

    #[test]
    fn test_updated_capacity_changes_pagination() {
        let store = CoordinateStore::default();
        let config = store
            .update(&json!({ "lineItems": { "maxItemsPerPage": 10 } }))
            .unwrap();
        let canvas = paint(&fixtures::report(25), &config, &Form222Options::default());
        assert_eq!(canvas.page_count(), 3);
        assert!(canvas.find("Page 3 of 3").is_some());
    }

    #[test]
    fn test_render_is_deterministic() {
        let config = CoordinateConfig::default();
        let data = fixtures::report(30);
        let first = paint(&data, &config, &Form222Options::default());
        let second = paint(&data, &config, &Form222Options::default());
        assert_eq!(first.ops, second.ops);
        assert_eq!(first.pages, second.pages);
    }

    #[test]
    fn test_generate_form222_pdf() {
        let data = fixtures::report(25);
        let pdf = generate_form222(
            &data,
            &CoordinateConfig::default(),
            &Form222Options::default(),
            &fixtures::ctx(),
        )
        .unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.filename, "Form222_Main Street Pharmacy_2024-03-07.pdf");
    }
}
