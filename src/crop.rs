// Crop geometry and extraction: pure functions from a decoded source
// image plus a source-pixel region to an encoded avatar. No UI state
// lives here, so everything is testable headless.

use std::io::Cursor;

use base64::{Engine as _, engine::general_purpose};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};

/// Axis-aligned crop region in source-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True if the region is non-empty and lies fully within a `w x h` source.
    pub fn fits_within(&self, w: u32, h: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|right| right <= w)
            && self.y.checked_add(self.height).is_some_and(|bottom| bottom <= h)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    /// The source bytes could not be decoded into pixel data.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The cropped output could not be encoded.
    #[error("failed to encode cropped image: {0}")]
    Encode(image::ImageError),

    /// The crop region does not lie within the source bounds.
    #[error("crop region {region:?} exceeds source bounds {width}x{height}")]
    OutOfBounds {
        region: CropRect,
        width: u32,
        height: u32,
    },

    /// The crop region has zero area.
    #[error("crop region is empty")]
    EmptyRegion,

    /// The SVG source could not be parsed or rasterized.
    #[cfg(feature = "svg")]
    #[error("failed to rasterize svg: {0}")]
    Svg(String),
}

/// The final cropped avatar: decoded pixels plus a self-contained
/// `data:image/png;base64,` URL ready for display or submission.
#[derive(Debug, Clone, PartialEq)]
pub struct CroppedImage {
    pub image: RgbaImage,
    pub data_url: String,
}

impl CroppedImage {
    /// Pixel dimensions of the cropped output.
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Decode raw file bytes into pixel data, guessing the format from the
/// content.
pub fn load_source(bytes: &[u8]) -> Result<DynamicImage, CropError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Convert a rectangle in display coordinates (origin at the displayed
/// image's top-left corner, `scale` display pixels per source pixel)
/// into source-pixel coordinates, rounded and clamped into the source
/// bounds.
pub fn display_rect_to_source_rect(
    display: egui::Rect,
    scale: f32,
    source_w: u32,
    source_h: u32,
) -> CropRect {
    if source_w == 0 || source_h == 0 || scale <= 0.0 {
        return CropRect::new(0, 0, 0, 0);
    }

    let max_x = (source_w - 1) as f32;
    let max_y = (source_h - 1) as f32;
    let x = (display.min.x / scale).round().clamp(0.0, max_x) as u32;
    let y = (display.min.y / scale).round().clamp(0.0, max_y) as u32;
    let width = ((display.width() / scale).round().max(1.0) as u32).min(source_w - x);
    let height = ((display.height() / scale).round().max(1.0) as u32).min(source_h - y);

    CropRect::new(x, y, width, height)
}

/// Extract `region` from `source`, optionally rotating the source about
/// its center first, and encode the result as a PNG data URL.
///
/// With a non-zero rotation the source is first rendered into a buffer
/// sized to the rotated bounding box, so the region is interpreted in
/// the rotated buffer's coordinates. Identical inputs produce
/// byte-identical output.
pub fn extract(
    source: &DynamicImage,
    region: CropRect,
    rotation_degrees: f32,
) -> Result<CroppedImage, CropError> {
    if region.width == 0 || region.height == 0 {
        return Err(CropError::EmptyRegion);
    }

    let base = source.to_rgba8();
    let canvas = if rotation_degrees.rem_euclid(360.0).abs() < f32::EPSILON {
        base
    } else {
        rotate_about_center(&base, rotation_degrees)
    };

    let (width, height) = canvas.dimensions();
    if !region.fits_within(width, height) {
        return Err(CropError::OutOfBounds {
            region,
            width,
            height,
        });
    }

    let cropped =
        imageops::crop_imm(&canvas, region.x, region.y, region.width, region.height).to_image();
    let data_url = encode_data_url(&cropped)?;

    Ok(CroppedImage {
        image: cropped,
        data_url,
    })
}

/// Encode pixels as a self-contained `data:image/png;base64,` URL.
pub fn encode_data_url(image: &RgbaImage) -> Result<String, CropError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(CropError::Encode)?;
    let encoded = general_purpose::STANDARD.encode(buf.get_ref());
    Ok(format!("data:image/png;base64,{encoded}"))
}

/// Render `src` rotated about its center into a buffer sized to the
/// rotated bounding box. Nearest-neighbor inverse mapping; pixels that
/// fall outside the source stay transparent.
fn rotate_about_center(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let (w, h) = (src.width() as f32, src.height() as f32);

    let out_w = ((w * cos.abs() + h * sin.abs()).round() as u32).max(1);
    let out_h = ((w * sin.abs() + h * cos.abs()).round() as u32).max(1);

    let (cx, cy) = (w / 2.0, h / 2.0);
    let (ocx, ocy) = (out_w as f32 / 2.0, out_h as f32 / 2.0);

    let mut out = RgbaImage::from_pixel(out_w, out_h, Rgba([0, 0, 0, 0]));
    for (ox, oy, pixel) in out.enumerate_pixels_mut() {
        // Inverse-map each output pixel back into source space.
        let dx = ox as f32 + 0.5 - ocx;
        let dy = oy as f32 + 0.5 - ocy;
        let sx = cos * dx + sin * dy + cx;
        let sy = cos * dy - sin * dx + cy;
        if sx >= 0.0 && sy >= 0.0 && sx < w && sy < h {
            *pixel = *src.get_pixel(sx as u32, sy as u32);
        }
    }
    out
}
