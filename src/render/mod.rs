//! Document renderers.
//!
//! Each renderer paints onto any `Canvas`; the `generate_*` entry points wrap
//! that in a `PdfCanvas` and turn every failure into a single
//! `RenderError::Generation`.

pub mod form222;
pub mod inventory;
pub mod invoice;

use chrono::{DateTime, Local};
use tracing::{error, info};

use crate::canvas::{Canvas, PdfCanvas, TextStyle};
use crate::error::{RenderError, RenderResult};
use crate::model::ReportData;

pub use form222::{generate_form222, Form222Options};
pub use inventory::generate_inventory;
pub use invoice::generate_invoice;

pub const ATTRIBUTION: &str = "Generated by RxReturns";

/// Per-call inputs that are not part of the report itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub now: DateTime<Local>,
}

impl RenderContext {
    pub fn now() -> Self {
        RenderContext { now: Local::now() }
    }

    #[cfg(test)]
    pub fn at(now: DateTime<Local>) -> Self {
        RenderContext { now }
    }

    /// `MM/DD/YYYY`
    pub fn display_date(&self) -> String {
        self.now.format("%m/%d/%Y").to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Form222,
    Inventory,
    Invoice,
}

impl DocumentKind {
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Form222 => "Form222",
            DocumentKind::Inventory => "Inventory",
            DocumentKind::Invoice => "Invoice",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub filename: String,
}

/// `{kind}_{businessName}_{YYYY-MM-DD}.pdf`, with path separators and
/// quotes in the business name replaced.
pub fn document_filename(kind: DocumentKind, business_name: &str, ctx: &RenderContext) -> String {
    let name: String = business_name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!(
        "{}_{}_{}.pdf",
        kind.label(),
        name,
        ctx.now.format("%Y-%m-%d")
    )
}

/// Paints a document with `paint` and serializes it. Errors are logged here
/// and come back as `Generation`.
pub(crate) fn render_document<F>(
    kind: DocumentKind,
    data: &ReportData,
    ctx: &RenderContext,
    paint: F,
) -> RenderResult<RenderedPdf>
where
    F: FnOnce(&mut PdfCanvas) -> RenderResult<()>,
{
    let result = PdfCanvas::new(kind.label()).and_then(|mut canvas| {
        paint(&mut canvas)?;
        let pages = canvas.page_count();
        canvas.finish().map(|bytes| (bytes, pages))
    });

    match result {
        Ok((bytes, pages)) => {
            info!(
                kind = kind.label(),
                pages,
                items = data.line_items.len(),
                bytes = bytes.len(),
                "document rendered"
            );
            Ok(RenderedPdf {
                bytes,
                filename: document_filename(kind, &data.client.business_name, ctx),
            })
        }
        Err(e) => {
            error!(kind = kind.label(), error = %e, "document generation failed");
            let message = match e {
                RenderError::Generation(message) => message,
                other => other.to_string(),
            };
            Err(RenderError::Generation(message))
        }
    }
}

/// Draws non-empty lines downwards from `y`. Returns the cursor below the
/// last line drawn.
pub(crate) fn text_block<C: Canvas + ?Sized>(
    canvas: &mut C,
    lines: &[(&str, TextStyle)],
    x: f32,
    mut y: f32,
    leading: f32,
) -> f32 {
    for (text, style) in lines {
        if text.trim().is_empty() {
            continue;
        }
        canvas.text(text, x, y, *style);
        y -= leading;
    }
    y
}

/// `$1,234.56`
pub fn format_money(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, digit) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}
