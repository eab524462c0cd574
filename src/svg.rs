// SVG rasterization for the upload boundary. An SVG source is rendered
// once at its native size and from then on treated like any raster
// source.

use image::{DynamicImage, RgbaImage};
use resvg::tiny_skia::{self, Pixmap};
use resvg::usvg::{Options, Tree};

use crate::crop::CropError;

/// Rasterize SVG bytes at their native size.
pub fn rasterize(bytes: &[u8]) -> Result<DynamicImage, CropError> {
    let options = Options::default();
    let tree = Tree::from_data(bytes, &options).map_err(|e| CropError::Svg(e.to_string()))?;

    let size = tree.size();
    let width = (size.width().ceil() as u32).max(1);
    let height = (size.height().ceil() as u32).max(1);

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| CropError::Svg(format!("cannot allocate {width}x{height} pixmap")))?;
    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    Ok(DynamicImage::ImageRgba8(unpremultiply(&pixmap)))
}

/// tiny-skia stores premultiplied alpha; the image crate expects
/// straight alpha.
fn unpremultiply(pixmap: &Pixmap) -> RgbaImage {
    let mut pixels = Vec::with_capacity((pixmap.width() * pixmap.height() * 4) as usize);
    for pixel in pixmap.pixels() {
        let a = pixel.alpha();
        if a == 0 {
            pixels.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            let r = (pixel.red() as u16 * 255 / a as u16) as u8;
            let g = (pixel.green() as u16 * 255 / a as u16) as u8;
            let b = (pixel.blue() as u16 * 255 / a as u16) as u8;
            pixels.extend_from_slice(&[r, g, b, a]);
        }
    }

    RgbaImage::from_raw(pixmap.width(), pixmap.height(), pixels)
        .expect("pixmap dimensions match buffer length")
}
