//! Draws the measurement box onto the photograph for visual inspection.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::Result;
use crate::geometry::BoxCorners;
use crate::landmarks::PixelPoint;

const BOX_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Line width scales with the picture: one pixel per hundred rows, rounded up.
pub fn line_width(image_height: u32) -> u32 {
    image_height.div_ceil(100).max(1)
}

/// Copy of `image` with the four box edges drawn on it.
pub fn draw_box(image: &DynamicImage, corners: &BoxCorners) -> RgbaImage {
    let mut canvas = image.to_rgba8();
    let width = line_width(canvas.height());
    for (from, to) in corners.edges() {
        draw_line(&mut canvas, from, to, width, BOX_COLOR);
    }
    canvas
}

/// Draw the box and save the result; the format follows the file extension.
pub fn save_annotated<P: AsRef<Path>>(
    image: &DynamicImage,
    corners: &BoxCorners,
    path: P,
) -> Result<()> {
    let canvas = draw_box(image, corners);
    let path = path.as_ref();
    // JPEG has no alpha channel.
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    if is_jpeg {
        DynamicImage::ImageRgba8(canvas).to_rgb8().save(path)?;
    } else {
        canvas.save(path)?;
    }
    log::info!("annotated image written to {}", path.display());
    Ok(())
}

/// Draw the box and encode the result as an in-memory JPEG.
pub fn encode_jpeg(image: &DynamicImage, corners: &BoxCorners) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(draw_box(image, corners)).to_rgb8();
    let mut bytes = Cursor::new(Vec::new());
    rgb.write_to(&mut bytes, ImageFormat::Jpeg)?;
    Ok(bytes.into_inner())
}

/// Bresenham line stamped with a `width`-pixel square brush.
fn draw_line(img: &mut RgbaImage, from: PixelPoint, to: PixelPoint, width: u32, color: Rgba<u8>) {
    let (img_w, img_h) = img.dimensions();
    let half = (width as i32 - 1) / 2;

    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx - dy;

    let mut x = from.x;
    let mut y = from.y;

    loop {
        for by in (y - half)..(y - half + width as i32) {
            for bx in (x - half)..(x - half + width as i32) {
                if bx >= 0 && bx < img_w as i32 && by >= 0 && by < img_h as i32 {
                    img.put_pixel(bx as u32, by as u32, color);
                }
            }
        }

        if x == to.x && y == to.y {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corners() -> BoxCorners {
        BoxCorners {
            top_left: PixelPoint::new(2, 3),
            top_right: PixelPoint::new(12, 3),
            bottom_left: PixelPoint::new(2, 8),
            bottom_right: PixelPoint::new(12, 8),
        }
    }

    #[test]
    fn line_width_scales_with_height() {
        assert_eq!(line_width(50), 1);
        assert_eq!(line_width(100), 1);
        assert_eq!(line_width(101), 2);
        assert_eq!(line_width(1080), 11);
    }

    #[test]
    fn box_edges_are_drawn() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(20, 20));
        let canvas = draw_box(&image, &corners());

        for x in 2..=12 {
            assert_eq!(*canvas.get_pixel(x, 3), BOX_COLOR);
            assert_eq!(*canvas.get_pixel(x, 8), BOX_COLOR);
        }
        for y in 3..=8 {
            assert_eq!(*canvas.get_pixel(2, y), BOX_COLOR);
            assert_eq!(*canvas.get_pixel(12, y), BOX_COLOR);
        }
        assert_eq!(*canvas.get_pixel(7, 5), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn box_outside_image_is_clipped() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(5, 5));
        let far = BoxCorners {
            top_left: PixelPoint::new(-10, -10),
            top_right: PixelPoint::new(40, -10),
            bottom_left: PixelPoint::new(-10, 40),
            bottom_right: PixelPoint::new(40, 40),
        };
        let canvas = draw_box(&image, &far);
        assert!(canvas.pixels().all(|p| *p == Rgba([0, 0, 0, 0])));
    }

    #[test]
    fn saves_png_and_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let image = DynamicImage::ImageRgba8(RgbaImage::new(20, 20));

        save_annotated(&image, &corners(), dir.path().join("box.png")).unwrap();
        save_annotated(&image, &corners(), dir.path().join("box.jpg")).unwrap();

        let reloaded = image::open(dir.path().join("box.png")).unwrap().to_rgba8();
        assert_eq!(*reloaded.get_pixel(2, 3), BOX_COLOR);
        assert!(dir.path().join("box.jpg").exists());
    }

    #[test]
    fn jpeg_encoding_keeps_dimensions() {
        let image = DynamicImage::ImageRgba8(RgbaImage::new(20, 16));
        let bytes = encode_jpeg(&image, &corners()).unwrap();

        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (20, 16));
    }
}
