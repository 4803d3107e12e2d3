//! Reference backdrops for aligning Form 222 output with the printed sheet.
//!
//! Only used while calibrating coordinates. Production runs without a
//! provider, so the renderer has no file paths or environment checks of its
//! own.

use std::path::PathBuf;

use ::image::{DynamicImage, Rgba, RgbImage};
use tracing::{debug, warn};

/// Supplies the image painted behind every Form 222 page.
pub trait BackgroundProvider: Send + Sync {
    /// `None` when no backdrop is available; the page renders without one.
    fn backdrop(&self) -> Option<DynamicImage>;
}

/// Scanned form image on disk, washed out towards white.
#[derive(Debug, Clone)]
pub struct FileBackground {
    path: PathBuf,
    opacity: f32,
}

impl FileBackground {
    pub const DEFAULT_OPACITY: f32 = 0.35;

    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileBackground {
            path: path.into(),
            opacity: Self::DEFAULT_OPACITY,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }
}

impl BackgroundProvider for FileBackground {
    fn backdrop(&self) -> Option<DynamicImage> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "background template unavailable");
                return None;
            }
        };
        match ::image::load_from_memory(&bytes) {
            Ok(img) => {
                debug!(path = %self.path.display(), "background template loaded");
                Some(wash_out(&img, self.opacity))
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "background template unreadable");
                None
            }
        }
    }
}

/// Composites `img` at `opacity` over white. PDF images carry no alpha here,
/// so transparency is baked into the pixels.
pub fn wash_out(img: &DynamicImage, opacity: f32) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut out = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let Rgba([r, g, b, a]) = *pixel;
        let alpha = a as f32 / 255.0 * opacity;
        let blend = |c: u8| (c as f32 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        out.put_pixel(x, y, ::image::Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(out)
}
