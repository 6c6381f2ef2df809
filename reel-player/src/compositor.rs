//! Compositor: draws one frame onto a fixed-resolution surface with a cover fit

use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Drawing surface with a logical resolution independent of its on-screen size
#[derive(Debug, Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    /// Creates a cleared surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Reallocates the backing buffer; previous content is discarded
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.pixels.dimensions() {
            self.pixels = RgbaImage::new(width, height);
        }
    }

    /// Current pixel content
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Placement of an image scaled to cover a surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub offset_x: f64,
    pub offset_y: f64,
    pub draw_width: f64,
    pub draw_height: f64,
}

/// Scales an image so it fully covers the surface, centering the overflow on the dominant axis
pub fn cover_fit(image_width: u32, image_height: u32, surface_width: u32, surface_height: u32) -> CoverFit {
    let (iw, ih) = (image_width as f64, image_height as f64);
    let (sw, sh) = (surface_width as f64, surface_height as f64);
    let image_aspect = iw / ih;
    let surface_aspect = sw / sh;

    if image_aspect > surface_aspect {
        let draw_height = sh;
        let draw_width = draw_height * image_aspect;
        CoverFit {
            offset_x: (sw - draw_width) / 2.0,
            offset_y: 0.0,
            draw_width,
            draw_height,
        }
    } else {
        let draw_width = sw;
        let draw_height = draw_width / image_aspect;
        CoverFit {
            offset_x: 0.0,
            offset_y: (sh - draw_height) / 2.0,
            draw_width,
            draw_height,
        }
    }
}

/// Draws frames onto a [`Surface`], counting successful draws
#[derive(Debug, Default)]
pub struct Compositor {
    draws: u64,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws `image` cover-fitted onto the surface, replacing its content.
    ///
    /// Only the visible part of the frame is resampled, so the cost follows the
    /// surface size. A missing image (or a degenerate size) leaves the surface
    /// untouched and returns `None`.
    pub fn draw(&mut self, surface: &mut Surface, image: Option<&RgbaImage>) -> Option<CoverFit> {
        let image = image?;
        if image.width() == 0 || image.height() == 0 || surface.width() == 0 || surface.height() == 0 {
            return None;
        }

        let fit = cover_fit(image.width(), image.height(), surface.width(), surface.height());
        let (x, y, width, height) = visible_source(&fit, image.width(), image.height(), surface);
        let visible = imageops::crop_imm(image, x, y, width, height).to_image();

        surface.pixels = if visible.dimensions() == surface.pixels.dimensions() {
            visible
        } else {
            imageops::resize(&visible, surface.width(), surface.height(), FilterType::Triangle)
        };

        self.draws += 1;
        Some(fit)
    }

    /// Number of draws that changed the surface
    pub fn draw_count(&self) -> u64 {
        self.draws
    }
}

/// Source rectangle of `fit` that lands inside the surface, in image pixels
fn visible_source(fit: &CoverFit, image_width: u32, image_height: u32, surface: &Surface) -> (u32, u32, u32, u32) {
    let scale = fit.draw_width / image_width as f64;

    let span = |offset: f64, extent: u32, limit: u32| {
        let start = ((-offset / scale).max(0.0).floor() as u32).min(limit - 1);
        let length = ((extent as f64 / scale).round() as u32).clamp(1, limit - start);
        (start, length)
    };
    let (x, width) = span(fit.offset_x, surface.width(), image_width);
    let (y, height) = span(fit.offset_y, surface.height(), image_height);
    (x, y, width, height)
}
