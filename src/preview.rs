//! PNG previews of single cube layers.
//!
//! Each LED becomes a `scale x scale` block. x runs left to right and
//! y runs bottom to top, so the image looks like the layer seen from
//! above with the front edge at the bottom.

use crate::Color;
use crate::geometry::CubeGeometry;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Largest block size a preview will render.
pub const MAX_SCALE: u32 = 64;

/// Render layer `z` of `frame` into an image.
///
/// LEDs missing from a short frame are drawn black. A layer outside the
/// cube renders all black.
pub fn render_layer(geometry: &CubeGeometry, frame: &[Color], z: i32, scale: u32) -> RgbImage {
    let side = geometry.side();
    let scale = scale.clamp(1, MAX_SCALE);
    let mut img = RgbImage::new(side * scale, side * scale);

    for y in 0..side {
        for x in 0..side {
            let index = geometry.map_pixel(x as i32, y as i32, z);
            let c = frame.get(index).copied().unwrap_or_default();
            let top = (side - 1 - y) * scale;
            let left = x * scale;

            for dy in 0..scale {
                for dx in 0..scale {
                    img.put_pixel(left + dx, top + dy, Rgb([c.r, c.g, c.b]));
                }
            }
        }
    }

    img
}

/// Encode an image as PNG bytes.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Render a layer and write it to `path` as PNG.
pub fn save_layer(
    path: &Path,
    geometry: &CubeGeometry,
    frame: &[Color],
    z: i32,
    scale: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let img = render_layer(geometry, frame, z, scale);
    img.save_with_format(path, ImageFormat::Png)?;
    tracing::debug!("Saved layer {} preview to {}", z, path.display());
    Ok(())
}
