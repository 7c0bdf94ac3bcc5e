//! Composites the main avatar plus ranked counterparty avatars into the
//! "circles" PNG, grounded in
//! `original_source/backend/interactions/circles.py::_create_circles_image`.
//! Geometry comes from [`crate::geometry`]; this module only rasterizes.

use ab_glyph::{FontArc, PxScale};
use chrono::{DateTime, Utc};
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::geometry::{self, Orbit, MAIN_RADIUS_FRACTION};

const RENDER_SIZE: u32 = 1800;
const DELIVERED_SIZE: u32 = 600;
const BG_COLOR: &str = "#1D428A";
const BORDER_COLOR: &str = "#FFC72C";
const FONT_CANDIDATES: [&str; 2] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

#[derive(Debug, Error)]
pub enum CirclesError {
    #[error("no watermark font available")]
    FontUnavailable,
    #[error("image encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

fn hex_to_rgba(hex: &str) -> Rgba<u8> {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
    Rgba([r, g, b, 255])
}

fn hex_is_light(hex: &str) -> bool {
    let hex = hex.trim_start_matches('#');
    let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0) as f64;
    let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0) as f64;
    let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0) as f64;
    (r * 299.0 + g * 587.0 + b * 114.0) / 1000.0 > 155.0
}

fn load_font() -> Option<FontArc> {
    FONT_CANDIDATES
        .iter()
        .find_map(|path| std::fs::read(path).ok())
        .and_then(|bytes| FontArc::try_from_vec(bytes).ok())
}

/// 60x60 white square with a black X, matching `fetch_image`'s except-path
/// placeholder for an avatar that failed to fetch or decode.
fn placeholder_avatar() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(60, 60, Rgba([255, 255, 255, 255]));
    let black = Rgba([0, 0, 0, 255]);
    for i in 0..60i64 {
        if let Some(p) = img.get_pixel_mut_checked(i as u32, i as u32) {
            *p = black;
        }
        if let Some(p) = img.get_pixel_mut_checked(i as u32, (59 - i) as u32) {
            *p = black;
        }
    }
    img
}

fn decode_avatar(bytes: Option<&[u8]>) -> RgbaImage {
    bytes
        .and_then(|b| image::load_from_memory(b).ok())
        .map(DynamicImage::into_rgba8)
        .unwrap_or_else(placeholder_avatar)
}

/// Center-crops to a square, resizes to `2r x 2r`, then zeroes alpha outside
/// the inscribed circle (the source does this with a separate `L`-mode PIL
/// mask image; doing it in one pixel pass avoids materializing that mask).
fn circular_avatar(img: &RgbaImage, diameter: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let side = w.min(h);
    let left = (w - side) / 2;
    let top = (h - side) / 2;
    let cropped = imageops::crop_imm(img, left, top, side, side).to_image();
    let mut resized = imageops::resize(
        &cropped,
        diameter.max(1),
        diameter.max(1),
        imageops::FilterType::Lanczos3,
    );

    let radius = diameter as f64 / 2.0;
    let center = radius;
    for y in 0..resized.height() {
        for x in 0..resized.width() {
            let dx = x as f64 + 0.5 - center;
            let dy = y as f64 + 0.5 - center;
            if (dx * dx + dy * dy).sqrt() > radius {
                resized.get_pixel_mut(x, y).0[3] = 0;
            }
        }
    }
    resized
}

fn paste_avatar(canvas: &mut RgbaImage, avatar: &RgbaImage, center_x: f64, center_y: f64) {
    let r = avatar.width() as i64 / 2;
    let x0 = center_x.round() as i64 - r;
    let y0 = center_y.round() as i64 - r;
    imageops::overlay(canvas, avatar, x0, y0);
}

/// Renders the composite image and returns encoded PNG bytes.
///
/// `counterparty_avatars` is in rank order; entries beyond
/// [`geometry::capacity`] are ignored (the source's `if i >= len(pictures):
/// break`), and a `None` entry stands in for a fetch/decode failure.
pub fn render(
    main_avatar: Option<&[u8]>,
    counterparty_avatars: &[Option<Vec<u8>>],
    start_date: DateTime<Utc>,
    watermark: &str,
) -> Result<Vec<u8>, CirclesError> {
    let mut canvas = RgbaImage::new(RENDER_SIZE, RENDER_SIZE);
    let bg = hex_to_rgba(BG_COLOR);
    draw_filled_rect_mut(
        &mut canvas,
        Rect::at(0, 0).of_size(RENDER_SIZE, RENDER_SIZE),
        bg,
    );

    let border = hex_to_rgba(BORDER_COLOR);
    let border_width = (RENDER_SIZE / 60).max(1);
    for i in 0..border_width {
        draw_hollow_rect_mut(
            &mut canvas,
            Rect::at(i as i32, i as i32).of_size(RENDER_SIZE - 2 * i, RENDER_SIZE - 2 * i),
            border,
        );
    }

    let text_color = if hex_is_light(BG_COLOR) {
        Rgba([0, 0, 0, 255])
    } else {
        Rgba([204, 204, 204, 255])
    };

    if let Some(font) = load_font() {
        let font_size = (RENDER_SIZE / 30) as f32;
        let scale = PxScale::from(font_size);
        let now = Utc::now();
        let range = format!(
            "{} - {}",
            start_date.format("%Y-%m-%d"),
            now.format("%Y-%m-%d")
        );
        let margin = (RENDER_SIZE as f32 / 35.0) as i32;
        draw_text_mut(&mut canvas, text_color, margin, margin, scale, &font, &range);

        let watermark_width = (watermark.len() as f32 * font_size * 0.6) as i32;
        draw_text_mut(
            &mut canvas,
            text_color,
            RENDER_SIZE as i32 - margin - watermark_width,
            margin,
            scale,
            &font,
            watermark,
        );
    } else {
        tracing::debug!("no watermark font found, skipping date/watermark overlay");
    }

    let vertical_displace = 0.04 * RENDER_SIZE as f64;
    let center = RENDER_SIZE as f64 / 2.0;

    let main_diameter = (RENDER_SIZE as f64 * MAIN_RADIUS_FRACTION * 2.0) as u32;
    let main_img = circular_avatar(&decode_avatar(main_avatar), main_diameter);
    paste_avatar(&mut canvas, &main_img, center, center + vertical_displace);

    let mut slot_index = 0usize;
    for orbit in geometry::orbits() {
        let Orbit {
            count,
            distance,
            radius,
            ..
        } = orbit;
        let diameter = (RENDER_SIZE as f64 * radius * 2.0) as u32;

        for i in 0..count {
            let Some(bytes) = counterparty_avatars.get(slot_index) else {
                break;
            };
            slot_index += 1;

            let (dx, dy) = geometry::slot_position(&orbit, i);
            let avatar = circular_avatar(&decode_avatar(bytes.as_deref()), diameter);
            paste_avatar(
                &mut canvas,
                &avatar,
                center + dx * RENDER_SIZE as f64,
                center + vertical_displace + dy * RENDER_SIZE as f64,
            );
            let _ = distance;
        }
    }

    let delivered = imageops::resize(
        &canvas,
        DELIVERED_SIZE,
        DELIVERED_SIZE,
        imageops::FilterType::Lanczos3,
    );

    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(delivered).write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}
