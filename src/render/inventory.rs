//! Inventory report: every returned item in a ten-column table, followed by
//! the total value and signature blocks.

use super::{
    format_money, render_document, text_block, DocumentKind, RenderContext, RenderedPdf,
    ATTRIBUTION,
};
use crate::canvas::{Canvas, Color, TextStyle};
use crate::coordinates::format_ndc;
use crate::error::RenderResult;
use crate::model::{LineItem, ReportData};
use crate::table::{Column, Columns, PageGeometry, TablePager};

const GEOMETRY: PageGeometry = PageGeometry::letter(40.0, 150.0);

const COLUMNS: [Column; 10] = [
    Column::new("NDC", 40.0),
    Column::new("Class", 112.0),
    Column::new("Qty", 140.0),
    Column::new("P/F", 164.0),
    Column::new("Product Name", 188.0),
    Column::new("Manufacturer", 300.0),
    Column::new("Wholesaler", 380.0),
    Column::new("Strength", 450.0),
    Column::new("Size", 505.0),
    Column::new("Form", 540.0),
];

const ROW_HEIGHT: f32 = 12.0;
const ROW_FONT: f32 = 7.0;
const HEADER_FONT: f32 = 8.0;
const LEADING: f32 = 11.0;
/// Room needed below the total for both signature blocks.
const SIGNATURE_HEIGHT: f32 = 90.0;

const COMPANY_X: f32 = 40.0;
const WHOLESALER_X: f32 = 230.0;
const SUMMARY_X: f32 = 420.0;

pub fn generate_inventory(data: &ReportData, ctx: &RenderContext) -> RenderResult<RenderedPdf> {
    render_document(DocumentKind::Inventory, data, ctx, |canvas| {
        paint_inventory(canvas, data, ctx);
        Ok(())
    })
}

pub fn paint_inventory<C: Canvas + ?Sized>(canvas: &mut C, data: &ReportData, ctx: &RenderContext) {
    let columns = Columns::new(&COLUMNS, GEOMETRY.right());
    let mut header = |canvas: &mut C, page: usize| {
        let y = draw_page_header(canvas, data, ctx, page);
        columns.draw_headers(canvas, y, HEADER_FONT)
    };

    let mut pager = TablePager::new(GEOMETRY);
    pager.start_page(canvas, &mut header);

    let wholesaler = data.wholesaler_name();
    let mut total_price = 0.0;
    for item in &data.line_items {
        total_price += item.item_total();
        let y = pager.row(canvas, ROW_HEIGHT, &mut header);
        draw_item(canvas, &columns, item, wholesaler, y);
    }

    let y = pager.row(canvas, 2.0 * ROW_HEIGHT, &mut header);
    canvas.line(GEOMETRY.left(), y + 8.0, GEOMETRY.right(), y + 8.0, 0.75, Color::BLACK);
    let total_style = TextStyle::bold(9.0);
    canvas.text(
        &format!("Total Items: {}", data.line_items.len()),
        GEOMETRY.left(),
        y - 4.0,
        total_style,
    );
    let total = format!("Total Value: {}", format_money(total_price));
    canvas.text(
        &total,
        GEOMETRY.right() - total_style.width(&total),
        y - 4.0,
        total_style,
    );

    pager.ensure_room(canvas, SIGNATURE_HEIGHT, &mut header);
    draw_signatures(canvas, pager.y() - 30.0);
    pager.advance(SIGNATURE_HEIGHT);

    draw_footer(canvas);
}

fn draw_item<C: Canvas + ?Sized>(
    canvas: &mut C,
    columns: &Columns<'_>,
    item: &LineItem,
    wholesaler: &str,
    y: f32,
) {
    let style = if item.is_schedule_ii() {
        TextStyle::bold(ROW_FONT).with_color(Color::CONTROLLED)
    } else {
        TextStyle::regular(ROW_FONT)
    };
    let ndc = format_ndc(&item.ndc11);
    let qty = item.packages.to_string();
    columns.draw_row(
        canvas,
        &[
            ndc.as_str(),
            item.schedule_label(),
            qty.as_str(),
            item.fill_label(),
            item.display_name(),
            item.manufacturer_name().unwrap_or(""),
            wholesaler,
            item.strength.as_str(),
            item.package_size.as_str(),
            item.dosage_form.as_str(),
        ],
        y,
        style,
    );
}

/// Company, wholesaler and summary blocks side by side, then a rule.
/// Returns the baseline for the column headers.
fn draw_page_header<C: Canvas + ?Sized>(
    canvas: &mut C,
    data: &ReportData,
    ctx: &RenderContext,
    page: usize,
) -> f32 {
    let top = GEOMETRY.top();
    let title = TextStyle::bold(11.0);
    let label = TextStyle::bold(8.0);
    let body = TextStyle::regular(8.0);

    let company_end = match &data.company_settings {
        Some(company) => {
            let city = company.city_state_zip();
            text_block(
                canvas,
                &[
                    (company.company_name.as_str(), title),
                    (company.address_line1.as_str(), body),
                    (company.address_line2.as_str(), body),
                    (city.as_str(), body),
                ],
                COMPANY_X,
                top,
                LEADING,
            )
        }
        None => top,
    };

    let wholesaler_end = match &data.wholesaler_info {
        Some(w) => {
            let city = w.city_state_zip();
            let phone = if w.phone.is_empty() {
                String::new()
            } else {
                format!("Phone: {}", w.phone)
            };
            text_block(
                canvas,
                &[
                    ("Wholesaler", label),
                    (w.name.as_str(), body),
                    (w.street_address.as_str(), body),
                    (city.as_str(), body),
                    (phone.as_str(), body),
                ],
                WHOLESALER_X,
                top,
                LEADING,
            )
        }
        None => text_block(
            canvas,
            &[("Wholesaler", label), (data.client.wholesaler.as_str(), body)],
            WHOLESALER_X,
            top,
            LEADING,
        ),
    };

    let page_line = format!("Page {page}");
    let date_line = format!("Date: {}", ctx.display_date());
    let client = &data.client;
    let client_city = client.city_state_zip();
    let summary_end = text_block(
        canvas,
        &[
            ("Inventory Report", title),
            (page_line.as_str(), body),
            (date_line.as_str(), body),
            ("Customer", label),
            (client.business_name.as_str(), body),
            (client.street_address.as_str(), body),
            (client_city.as_str(), body),
        ],
        SUMMARY_X,
        top,
        LEADING,
    );

    let rule_y = company_end.min(wholesaler_end).min(summary_end) + 2.0;
    canvas.line(GEOMETRY.left(), rule_y, GEOMETRY.right(), rule_y, 1.0, Color::BLACK);
    rule_y - 16.0
}

fn draw_signatures<C: Canvas + ?Sized>(canvas: &mut C, y: f32) {
    let label = TextStyle::regular(8.0).with_color(Color::GRAY);
    let date_y = y - 36.0;
    for (x, who) in [(40.0, "Customer Signature"), (320.0, "Company Representative")] {
        canvas.line(x, y, x + 220.0, y, 0.5, Color::BLACK);
        canvas.text(who, x, y - 10.0, label);
        canvas.line(x, date_y, x + 120.0, date_y, 0.5, Color::BLACK);
        canvas.text("Date", x, date_y - 10.0, label);
    }
}

fn draw_footer<C: Canvas + ?Sized>(canvas: &mut C) {
    let style = TextStyle::regular(7.0).with_color(Color::GRAY);
    let x = GEOMETRY.center_x() - style.width(ATTRIBUTION) / 2.0;
    canvas.text(ATTRIBUTION, x, 24.0, style);
}
