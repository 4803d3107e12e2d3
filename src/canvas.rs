//! Drawing surface shared by the renderers.
//!
//! Renderers work in PDF points with the origin at the bottom-left corner of
//! the page. `PdfCanvas` writes through printpdf; tests swap in a recording
//! canvas so layout can be asserted without parsing PDF output.

use std::io::{BufWriter, Cursor};

use ::image::DynamicImage;
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef,
    Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Px, Rgb,
};

use crate::error::{RenderError, RenderResult};
use crate::font_metrics::{self, FontMetrics};

const PT_TO_MM: f32 = 0.352_777_78;

// ============================================================================
// STYLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const GRAY: Color = Color { r: 110, g: 110, b: 110 };
    pub const RULE: Color = Color { r: 170, g: 170, b: 170 };
    /// Schedule II rows
    pub const CONTROLLED: Color = Color { r: 176, g: 18, b: 18 };
    /// Grand totals
    pub const ACCENT: Color = Color { r: 18, g: 72, b: 150 };
    /// Calibration grid
    pub const GRID: Color = Color { r: 120, g: 170, b: 230 };

    fn to_pdf(self) -> printpdf::Color {
        printpdf::Color::Rgb(Rgb::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            None,
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
}

impl FontFace {
    pub fn metrics(self) -> &'static FontMetrics {
        font_metrics::get_metrics(self == FontFace::Bold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size: f32,
    pub face: FontFace,
    pub color: Color,
}

impl TextStyle {
    pub fn regular(size: f32) -> Self {
        TextStyle {
            size,
            face: FontFace::Regular,
            color: Color::BLACK,
        }
    }

    pub fn bold(size: f32) -> Self {
        TextStyle {
            face: FontFace::Bold,
            ..TextStyle::regular(size)
        }
    }

    pub fn with_color(self, color: Color) -> Self {
        TextStyle { color, ..self }
    }

    /// Width of `text` in points under this style.
    pub fn width(&self, text: &str) -> f32 {
        self.face.metrics().string_width(text, self.size)
    }
}

// ============================================================================
// CANVAS
// ============================================================================

pub trait Canvas {
    /// Starts a new page; everything drawn afterwards lands on it.
    fn begin_page(&mut self, width: f32, height: f32);

    /// Draws `text` with its baseline starting at `(x, y)`.
    fn text(&mut self, text: &str, x: f32, y: f32, style: TextStyle);

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32, color: Color);

    /// Places `image` with its bottom-left corner at `(x, y)`, scaled to the box.
    fn image(&mut self, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32);

    fn page_count(&self) -> usize;
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
        }
    }
}

/// Canvas backed by a printpdf document.
pub struct PdfCanvas {
    doc: PdfDocumentReference,
    fonts: Fonts,
    layer: Option<PdfLayerReference>,
    pages: usize,
}

impl PdfCanvas {
    pub fn new(title: &str) -> RenderResult<Self> {
        let doc = PdfDocument::empty(title);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        Ok(PdfCanvas {
            doc,
            fonts: Fonts { regular, bold },
            layer: None,
            pages: 0,
        })
    }

    /// Serializes the document.
    pub fn finish(self) -> RenderResult<Vec<u8>> {
        if self.pages == 0 {
            return Err(RenderError::Pdf("document has no pages".to_string()));
        }

        let mut buf = Vec::new();
        {
            let mut writer = BufWriter::new(Cursor::new(&mut buf));
            self.doc
                .save(&mut writer)
                .map_err(|e| RenderError::Pdf(e.to_string()))?;
        }
        Ok(buf)
    }
}

fn point(x: f32, y: f32) -> (Point, bool) {
    (Point::new(Mm(x * PT_TO_MM), Mm(y * PT_TO_MM)), false)
}

impl Canvas for PdfCanvas {
    fn begin_page(&mut self, width: f32, height: f32) {
        let (page, layer) = self.doc.add_page(
            Mm(width * PT_TO_MM),
            Mm(height * PT_TO_MM),
            format!("Page {}", self.pages + 1),
        );
        self.layer = Some(self.doc.get_page(page).get_layer(layer));
        self.pages += 1;
    }

    fn text(&mut self, text: &str, x: f32, y: f32, style: TextStyle) {
        let Some(layer) = &self.layer else { return };
        layer.set_fill_color(style.color.to_pdf());
        layer.use_text(
            text,
            style.size,
            Mm(x * PT_TO_MM),
            Mm(y * PT_TO_MM),
            self.fonts.get(style.face),
        );
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, thickness: f32, color: Color) {
        let Some(layer) = &self.layer else { return };
        layer.set_outline_color(color.to_pdf());
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: vec![point(x1, y1), point(x2, y2)],
            is_closed: false,
        });
    }

    fn image(&mut self, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32) {
        let Some(layer) = &self.layer else { return };
        if width <= 0.0 || height <= 0.0 || image.width() == 0 || image.height() == 0 {
            return;
        }

        let rgb = image.to_rgb8();
        let (px_w, px_h) = rgb.dimensions();
        let xobject = Image::from(ImageXObject {
            width: Px(px_w as usize),
            height: Px(px_h as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: rgb.into_raw(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        // The DPI fixes the width; the vertical scale corrects the aspect ratio.
        let dpi = px_w as f32 * 72.0 / width;
        let natural_height = px_h as f32 * 72.0 / dpi;
        xobject.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x * PT_TO_MM)),
                translate_y: Some(Mm(y * PT_TO_MM)),
                dpi: Some(dpi),
                scale_y: Some(height / natural_height),
                ..Default::default()
            },
        );
    }

    fn page_count(&self) -> usize {
        self.pages
    }
}

// ============================================================================
// RECORDING CANVAS (tests)
// ============================================================================
