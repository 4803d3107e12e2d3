//! Invoice grouped by manufacturer, with the service fee added on top of the
//! returned value.

use std::collections::BTreeMap;

use tracing::debug;

use super::{
    format_money, render_document, text_block, DocumentKind, RenderContext, RenderedPdf,
    ATTRIBUTION,
};
use crate::canvas::{Canvas, Color, TextStyle};
use crate::coordinates::format_ndc;
use crate::error::RenderResult;
use crate::model::{LineItem, ReportData};
use crate::table::{Column, Columns, PageGeometry, TablePager};

const GEOMETRY: PageGeometry = PageGeometry::letter(40.0, 100.0);

const COLUMNS: [Column; 5] = [
    Column::new("Item Name", 40.0),
    Column::new("NDC", 260.0),
    Column::new("Qty", 350.0),
    Column::new("Price/Unit", 410.0),
    Column::new("Total", 490.0),
];

const ROW_HEIGHT: f32 = 13.0;
const ROW_FONT: f32 = 8.0;
const HEADER_FONT: f32 = 8.0;
const LEADING: f32 = 12.0;
const GROUP_GAP: f32 = 10.0;
/// Manufacturer name plus the column-header block drawn beneath it.
const GROUP_HEADING_HEIGHT: f32 = 16.0 + 4.0 + HEADER_FONT + 2.0;
/// Room for the totals block, including the fee line and rule.
const TOTALS_HEIGHT: f32 = 80.0;
const TOTALS_LABEL_X: f32 = 380.0;

/// Items sharing one manufacturer key.
#[derive(Debug)]
pub struct ManufacturerGroup<'a> {
    pub name: &'a str,
    pub items: Vec<&'a LineItem>,
    pub subtotal: f64,
}

/// Groups keyed by manufacturer, in ascending name order.
pub fn group_by_manufacturer(items: &[LineItem]) -> Vec<ManufacturerGroup<'_>> {
    let mut groups: BTreeMap<&str, ManufacturerGroup<'_>> = BTreeMap::new();
    for item in items {
        let name = item.manufacturer_key();
        let group = groups.entry(name).or_insert_with(|| ManufacturerGroup {
            name,
            items: Vec::new(),
            subtotal: 0.0,
        });
        group.items.push(item);
        group.subtotal += item.item_total();
    }
    groups.into_values().collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub percentage: f64,
    pub fee: f64,
    pub grand_total: f64,
}

pub fn compute_totals(groups: &[ManufacturerGroup<'_>], percentage: f64) -> InvoiceTotals {
    let subtotal: f64 = groups.iter().map(|g| g.subtotal).sum();
    let fee = subtotal * (percentage / 100.0);
    InvoiceTotals {
        subtotal,
        percentage,
        fee,
        grand_total: subtotal + fee,
    }
}

/// `{clientId}-{unix millis}`
pub fn invoice_number(client_id: &str, ctx: &RenderContext) -> String {
    format!("{}-{}", client_id, ctx.now.timestamp_millis())
}

pub fn generate_invoice(data: &ReportData, ctx: &RenderContext) -> RenderResult<RenderedPdf> {
    render_document(DocumentKind::Invoice, data, ctx, |canvas| {
        paint_invoice(canvas, data, ctx);
        Ok(())
    })
}

pub fn paint_invoice<C: Canvas + ?Sized>(canvas: &mut C, data: &ReportData, ctx: &RenderContext) {
    let columns = Columns::new(&COLUMNS, GEOMETRY.right());
    let number = invoice_number(&data.client.id, ctx);
    let groups = group_by_manufacturer(&data.line_items);
    let totals = compute_totals(&groups, data.client.invoice_percentage);
    debug!(groups = groups.len(), invoice = %number, "laying out invoice");

    let mut page_header =
        |canvas: &mut C, page: usize| draw_page_header(canvas, data, ctx, &number, page);

    let mut pager = TablePager::new(GEOMETRY);
    pager.start_page(canvas, &mut page_header);

    for group in &groups {
        pager.keep_together(canvas, GROUP_HEADING_HEIGHT, &mut page_header);
        let y = pager.row(canvas, 0.0, &mut page_header);
        canvas.text(group.name, GEOMETRY.left(), y, TextStyle::bold(10.0));
        let next = columns.draw_headers(canvas, y - 16.0, HEADER_FONT);
        pager.advance(y - next);

        let mut continued = |canvas: &mut C, page: usize| {
            let y = draw_page_header(canvas, data, ctx, &number, page);
            canvas.text(
                &format!("{} (continued)", group.name),
                GEOMETRY.left(),
                y,
                TextStyle::bold(10.0),
            );
            columns.draw_headers(canvas, y - 16.0, HEADER_FONT)
        };

        for item in &group.items {
            let y = pager.row(canvas, ROW_HEIGHT, &mut continued);
            draw_item(canvas, &columns, item, y);
        }

        let y = pager.row(canvas, ROW_HEIGHT + GROUP_GAP, &mut continued);
        draw_amount(
            canvas,
            &format!("{} Subtotal:", group.name),
            group.subtotal,
            y - 2.0,
            TextStyle::bold(ROW_FONT),
        );
    }

    pager.ensure_room(canvas, TOTALS_HEIGHT, &mut page_header);
    draw_totals(canvas, &totals, pager.y() - 6.0);
    pager.advance(TOTALS_HEIGHT);

    draw_footer(canvas);
}

fn draw_item<C: Canvas + ?Sized>(canvas: &mut C, columns: &Columns<'_>, item: &LineItem, y: f32) {
    let ndc = format_ndc(&item.ndc11);
    let qty = item.packages.to_string();
    let price = format_money(item.price_per_unit);
    let total = format_money(item.item_total());
    columns.draw_row(
        canvas,
        &[
            item.display_name(),
            ndc.as_str(),
            qty.as_str(),
            price.as_str(),
            total.as_str(),
        ],
        y,
        TextStyle::regular(ROW_FONT),
    );
}

/// Label at the totals column, amount flush right.
fn draw_amount<C: Canvas + ?Sized>(canvas: &mut C, label: &str, amount: f64, y: f32, style: TextStyle) {
    canvas.text(label, TOTALS_LABEL_X, y, style);
    let value = format_money(amount);
    canvas.text(&value, GEOMETRY.right() - style.width(&value), y, style);
}

fn draw_totals<C: Canvas + ?Sized>(canvas: &mut C, totals: &InvoiceTotals, mut y: f32) {
    let body = TextStyle::regular(9.0);
    draw_amount(canvas, "Subtotal:", totals.subtotal, y, body);
    y -= 14.0;

    if totals.percentage > 0.0 {
        let label = format!("Invoice Fee ({}%):", totals.percentage);
        draw_amount(canvas, &label, totals.fee, y, body);
        y -= 14.0;
    }

    canvas.line(TOTALS_LABEL_X - 100.0, y + 8.0, GEOMETRY.right(), y + 8.0, 0.75, Color::BLACK);
    y -= 8.0;
    draw_amount(
        canvas,
        "Grand Total:",
        totals.grand_total,
        y,
        TextStyle::bold(11.0).with_color(Color::ACCENT),
    );
}

/// Company block, invoice details and the bill-to block. Returns the cursor
/// below the rule.
fn draw_page_header<C: Canvas + ?Sized>(
    canvas: &mut C,
    data: &ReportData,
    ctx: &RenderContext,
    number: &str,
    page: usize,
) -> f32 {
    let top = GEOMETRY.top();
    let title = TextStyle::bold(12.0);
    let label = TextStyle::bold(9.0);
    let body = TextStyle::regular(9.0);

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
                GEOMETRY.left(),
                top,
                LEADING,
            )
        }
        None => top,
    };

    let number_line = format!("Invoice #: {number}");
    let date_line = format!("Date: {}", ctx.display_date());
    let page_line = format!("Page {page}");
    let details_end = text_block(
        canvas,
        &[
            ("INVOICE", TextStyle::bold(16.0).with_color(Color::ACCENT)),
            (number_line.as_str(), body),
            (date_line.as_str(), body),
            (page_line.as_str(), body),
        ],
        400.0,
        top,
        LEADING + 2.0,
    );

    let client = &data.client;
    let client_city = client.city_state_zip();
    let bill_to_end = text_block(
        canvas,
        &[
            ("Bill To", label),
            (client.business_name.as_str(), body),
            (client.street_address.as_str(), body),
            (client_city.as_str(), body),
        ],
        GEOMETRY.left(),
        company_end.min(details_end) - 8.0,
        LEADING,
    );

    let rule_y = bill_to_end + 2.0;
    canvas.line(GEOMETRY.left(), rule_y, GEOMETRY.right(), rule_y, 1.0, Color::BLACK);
    rule_y - 18.0
}

fn draw_footer<C: Canvas + ?Sized>(canvas: &mut C) {
    let style = TextStyle::regular(7.0).with_color(Color::GRAY);
    let x = GEOMETRY.center_x() - style.width(ATTRIBUTION) / 2.0;
    canvas.text(ATTRIBUTION, x, 24.0, style);
}
