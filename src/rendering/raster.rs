//! Canvas primitives on `image::RgbaImage`

use crate::{Error, ImageFormat, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, RgbaImage};

/// CSS pixels to device pixels, rounded down
pub fn scaled_px(css_px: f64, scale: f64) -> u32 {
    let px = (css_px * scale).floor();
    if px.is_finite() && px > 0.0 {
        px as u32
    } else {
        0
    }
}

/// Decode a `data:<mime>;base64,<payload>` raster
pub fn decode_data_url(data_url: &str) -> Result<RgbaImage> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| Error::Render("renderer output is not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Render("data URL without payload".into()))?;
    if !meta.ends_with(";base64") {
        return Err(Error::Render(format!("unsupported data URL encoding: {}", meta)));
    }
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Render(format!("invalid base64 payload: {}", e)))?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// Paint `tile` repeatedly down the left edge of `canvas`, starting at the top
pub fn fill_repeat_y(canvas: &mut RgbaImage, tile: &RgbaImage) {
    if tile.height() == 0 || tile.width() == 0 {
        return;
    }
    let mut y = 0u32;
    while y < canvas.height() {
        imageops::overlay(canvas, tile, 0, y as i64);
        y += tile.height();
    }
}

/// Draw `section` at row `y`, centered horizontally
pub fn paste_centered(canvas: &mut RgbaImage, section: &RgbaImage, y: i64) {
    let x = (canvas.width() as i64 - section.width() as i64) / 2;
    imageops::overlay(canvas, section, x, y);
}

/// Exactly `width` x `height` pixels of `source` starting at (`x`, `y`);
/// areas the source does not cover stay transparent.
pub fn crop_exact(source: &RgbaImage, x: i64, y: i64, width: u32, height: u32) -> RgbaImage {
    let mut out = RgbaImage::new(width, height);
    imageops::overlay(&mut out, source, -x, -y);
    out
}

/// Encode the finished canvas.
///
/// `quality` (0..=1) applies to JPEG only. JPEG has no alpha channel, so
/// transparent pixels come out black as they do from a browser canvas.
pub fn encode(canvas: &RgbaImage, format: ImageFormat, quality: f64) -> Result<Vec<u8>> {
    let (w, h) = canvas.dimensions();
    let mut out = Vec::new();
    match format {
        ImageFormat::Png => {
            PngEncoder::new(&mut out).write_image(canvas.as_raw(), w, h, ExtendedColorType::Rgba8)?;
        }
        ImageFormat::Webp => {
            WebPEncoder::new_lossless(&mut out).write_image(canvas.as_raw(), w, h, ExtendedColorType::Rgba8)?;
        }
        ImageFormat::Jpeg => {
            let opaque = flatten(canvas);
            let q = (quality.clamp(0.0, 1.0) * 100.0).round().max(1.0) as u8;
            JpegEncoder::new_with_quality(&mut out, q).write_image(opaque.as_raw(), w, h, ExtendedColorType::Rgb8)?;
        }
    }
    if out.is_empty() {
        return Err(Error::Encode(format!("{} encoder produced no data", format.extension())));
    }
    Ok(out)
}

fn flatten(canvas: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(canvas.width(), canvas.height(), |x, y| {
        let p = canvas.get_pixel(x, y).0;
        let a = p[3] as u32;
        Rgb([
            (p[0] as u32 * a / 255) as u8,
            (p[1] as u32 * a / 255) as u8,
            (p[2] as u32 * a / 255) as u8,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, c: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(c))
    }

    #[test]
    fn scaling_rounds_down() {
        assert_eq!(scaled_px(100.0, 1.8), 180);
        assert_eq!(scaled_px(10.5, 1.0), 10);
        assert_eq!(scaled_px(-3.0, 2.0), 0);
        assert_eq!(scaled_px(f64::NAN, 2.0), 0);
    }

    #[test]
    fn tile_repeats_vertically() {
        let mut canvas = RgbaImage::new(4, 10);
        fill_repeat_y(&mut canvas, &solid(4, 3, [255, 0, 0, 255]));
        assert_eq!(canvas.get_pixel(0, 9).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn narrower_section_is_centered() {
        let mut canvas = RgbaImage::new(10, 4);
        paste_centered(&mut canvas, &solid(4, 2, [0, 0, 255, 255]), 1);
        assert_eq!(canvas.get_pixel(2, 1).0[3], 0);
        assert_eq!(canvas.get_pixel(3, 1).0, [0, 0, 255, 255]);
        assert_eq!(canvas.get_pixel(6, 2).0, [0, 0, 255, 255]);
        assert_eq!(canvas.get_pixel(7, 2).0[3], 0);
        assert_eq!(canvas.get_pixel(3, 3).0[3], 0);
    }

    #[test]
    fn crop_pads_with_transparency() {
        let out = crop_exact(&solid(3, 3, [9, 9, 9, 255]), 0, 0, 5, 2);
        assert_eq!(out.dimensions(), (5, 2));
        assert_eq!(out.get_pixel(2, 1).0, [9, 9, 9, 255]);
        assert_eq!(out.get_pixel(4, 1).0[3], 0);

        let mut src = solid(4, 4, [0, 0, 0, 255]);
        src.put_pixel(2, 3, Rgba([7, 7, 7, 255]));
        let out = crop_exact(&src, 1, 2, 2, 2);
        assert_eq!(out.get_pixel(1, 1).0, [7, 7, 7, 255]);
    }

    #[test]
    fn every_format_decodes_back_to_same_size() {
        let canvas = solid(7, 5, [10, 200, 30, 255]);
        for format in [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp] {
            let bytes = encode(&canvas, format, 0.92).unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (7, 5), "{:?}", format);
        }
    }

    #[test]
    fn data_url_decoding() {
        let bytes = encode(&solid(2, 3, [1, 2, 3, 255]), ImageFormat::Png, 1.0).unwrap();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        assert_eq!(decode_data_url(&url).unwrap().dimensions(), (2, 3));
        assert!(decode_data_url("https://x/y.png").is_err());
        assert!(decode_data_url("data:image/png,raw").is_err());
    }
}
