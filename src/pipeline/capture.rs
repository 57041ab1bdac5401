//! Raster capture: one [`CardScene`] → one RGB [`Snapshot`].
//!
//! ## Why spawn_blocking?
//!
//! Rasterisation is pure CPU work — compositing the QR bitmap and filling
//! glyph paths over a megapixel canvas. Running it inside
//! `tokio::task::spawn_blocking` keeps the async control flow responsive
//! without pretending the work itself is asynchronous.
//!
//! ## Why one card per call?
//!
//! Captures read the card's rendered state at invocation time. The export
//! loop awaits each capture before starting the next, in page-major order,
//! and every call receives its own scene; batching captures against a
//! shared rendered tree is exactly the aliasing mistake this design rules
//! out.
//!
//! The canvas is filled solid white before drawing so transparent QR PNGs
//! cannot leave artefacts in the PDF.

use crate::error::ExportError;
use crate::pipeline::card::{CardFont, CardScene, SceneItem};
use tiny_skia::{
    Color, FillRule, IntSize, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Transform,
};
use tracing::debug;
use ttf_parser::OutlineBuilder;

/// An encoded raster of one captured card.
///
/// Pixels are tightly packed RGB8, row-major from the top-left, sized so
/// that `width_px / dpi` inches equals the card cell width.
pub struct Snapshot {
    pub width_px: u32,
    pub height_px: u32,
    pub dpi: u32,
    rgb: Vec<u8>,
}

impl Snapshot {
    /// The raw RGB8 pixel buffer.
    pub fn rgb_bytes(&self) -> &[u8] {
        &self.rgb
    }

    /// The pixel at `(x, y)`.
    pub fn rgb_at(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let i = ((y * self.width_px + x) * 3) as usize;
        (self.rgb[i], self.rgb[i + 1], self.rgb[i + 2])
    }
}

/// Capture one card scene at the given resolution.
///
/// Must be awaited to completion before the next card's capture begins.
pub async fn capture_card(
    scene: CardScene,
    card_index: usize,
    dpi: u32,
) -> Result<Snapshot, ExportError> {
    tokio::task::spawn_blocking(move || capture_blocking(&scene, card_index, dpi))
        .await
        .map_err(|e| ExportError::Internal(format!("Capture task panicked: {e}")))?
}

/// Blocking implementation of scene rasterisation.
fn capture_blocking(scene: &CardScene, card_index: usize, dpi: u32) -> Result<Snapshot, ExportError> {
    let px_per_mm = dpi as f64 / 25.4;
    let (w_mm, h_mm) = scene.size_mm();
    let width_px = (w_mm * px_per_mm).round() as u32;
    let height_px = (h_mm * px_per_mm).round() as u32;

    let mut canvas =
        Pixmap::new(width_px, height_px).ok_or_else(|| ExportError::CaptureFailed {
            card: card_index,
            detail: format!("cannot allocate {width_px}x{height_px} canvas"),
        })?;
    canvas.fill(Color::WHITE);

    for item in scene.items() {
        match item {
            SceneItem::Image {
                image,
                x_mm,
                y_mm,
                width_mm,
                height_mm,
            } => {
                let target_w = ((width_mm * px_per_mm).round() as u32).max(1);
                let target_h = ((height_mm * px_per_mm).round() as u32).max(1);
                let resized = image
                    .resize_exact(target_w, target_h, image::imageops::FilterType::Triangle)
                    .to_rgba8();

                // Flatten any transparency onto white; the resulting pixels
                // are opaque, so straight RGBA is valid premultiplied data.
                let mut data = resized.into_raw();
                for px in data.chunks_exact_mut(4) {
                    let a = px[3] as u16;
                    if a < 255 {
                        for c in &mut px[..3] {
                            *c = ((*c as u16 * a + 255 * (255 - a)) / 255) as u8;
                        }
                        px[3] = 255;
                    }
                }

                let size = IntSize::from_wh(target_w, target_h).ok_or_else(|| {
                    ExportError::CaptureFailed {
                        card: card_index,
                        detail: format!("degenerate image size {target_w}x{target_h}"),
                    }
                })?;
                let tile = Pixmap::from_vec(data, size).ok_or_else(|| {
                    ExportError::CaptureFailed {
                        card: card_index,
                        detail: "image buffer size mismatch".into(),
                    }
                })?;

                canvas.draw_pixmap(
                    (x_mm * px_per_mm).round() as i32,
                    (y_mm * px_per_mm).round() as i32,
                    tile.as_ref(),
                    &PixmapPaint::default(),
                    Transform::identity(),
                    None,
                );
            }
            SceneItem::Text {
                font,
                text,
                x_mm,
                baseline_mm,
                size_mm,
            } => {
                draw_text(
                    &mut canvas,
                    font,
                    text,
                    (x_mm * px_per_mm) as f32,
                    (baseline_mm * px_per_mm) as f32,
                    (size_mm * px_per_mm) as f32,
                )
                .map_err(|e| ExportError::CaptureFailed {
                    card: card_index,
                    detail: e.to_string(),
                })?;
            }
        }
    }

    debug!("Captured card {card_index}: {width_px}x{height_px} px @ {dpi} dpi");

    let rgb = canvas
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    Ok(Snapshot {
        width_px,
        height_px,
        dpi,
        rgb,
    })
}

/// Fill one line of text from glyph outlines, left to right from `x_px`.
fn draw_text(
    canvas: &mut Pixmap,
    font: &CardFont,
    text: &str,
    x_px: f32,
    baseline_px: f32,
    size_px: f32,
) -> Result<(), ExportError> {
    let face = font.parse()?;
    let scale = size_px / face.units_per_em() as f32;

    let mut paint = Paint::default();
    paint.set_color(Color::BLACK);
    paint.anti_alias = true;

    let mut pen_x = x_px;
    for ch in text.chars() {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };

        let mut builder = GlyphPathBuilder::new(pen_x, baseline_px, scale);
        if face.outline_glyph(gid, &mut builder).is_some() {
            if let Some(path) = builder.finish() {
                canvas.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }

        pen_x += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale;
    }

    Ok(())
}

/// Bridges `ttf-parser` outlines into a `tiny-skia` path, translating from
/// the font's y-up em square to the canvas's y-down pixels.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn finish(self) -> Option<Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder.quad_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.origin_x + x1 * self.scale,
            self.origin_y - y1 * self.scale,
            self.origin_x + x2 * self.scale,
            self.origin_y - y2 * self.scale,
            self.origin_x + x * self.scale,
            self.origin_y - y * self.scale,
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::card::SceneItem;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::sync::Arc;

    #[tokio::test]
    async fn empty_scene_is_all_white_at_the_right_size() {
        let snap = capture_card(CardScene::default(), 0, 300).await.unwrap();

        // 105 mm and 148 mm at 300 dpi.
        assert_eq!(snap.width_px, 1240);
        assert_eq!(snap.height_px, 1748);
        assert_eq!(snap.dpi, 300);
        assert_eq!(
            snap.rgb_bytes().len(),
            (snap.width_px * snap.height_px * 3) as usize
        );

        assert_eq!(snap.rgb_at(0, 0), (255, 255, 255));
        assert_eq!(snap.rgb_at(620, 874), (255, 255, 255));
        assert_eq!(snap.rgb_at(1239, 1747), (255, 255, 255));
    }

    #[tokio::test]
    async fn opaque_image_lands_where_placed() {
        let mut scene = CardScene::default();
        scene.push(SceneItem::Image {
            image: Arc::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                10,
                10,
                Rgba([0, 0, 0, 255]),
            ))),
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm: 10.0,
            height_mm: 10.0,
        });

        let snap = capture_card(scene, 0, 150).await.unwrap();
        // Inside the 10 mm square (≈ 59 px at 150 dpi).
        assert_eq!(snap.rgb_at(5, 5), (0, 0, 0));
        // Well outside it.
        assert_eq!(snap.rgb_at(200, 200), (255, 255, 255));
    }

    #[tokio::test]
    async fn transparent_pixels_flatten_onto_white() {
        let mut scene = CardScene::default();
        scene.push(SceneItem::Image {
            image: Arc::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                4,
                4,
                Rgba([0, 0, 0, 0]),
            ))),
            x_mm: 0.0,
            y_mm: 0.0,
            width_mm: 20.0,
            height_mm: 20.0,
        });

        let snap = capture_card(scene, 0, 150).await.unwrap();
        assert_eq!(snap.rgb_at(10, 10), (255, 255, 255));
    }

    #[tokio::test]
    async fn text_produces_dark_pixels_near_its_baseline() {
        let Some(path) = CardFont::discover() else {
            println!("SKIP — no system TTF font found");
            return;
        };
        let font = Arc::new(CardFont::load(path).unwrap());

        let mut scene = CardScene::default();
        scene.push(SceneItem::Text {
            font,
            text: "workspace-42".into(),
            x_mm: 10.0,
            baseline_mm: 20.0,
            size_mm: 6.0,
        });

        let snap = capture_card(scene, 0, 300).await.unwrap();

        // Scan the band above the baseline for any non-white pixel.
        let baseline_y = (20.0 * 300.0 / 25.4) as u32;
        let band_top = baseline_y.saturating_sub(80);
        let mut found_ink = false;
        'outer: for y in band_top..baseline_y {
            for x in 0..snap.width_px {
                if snap.rgb_at(x, y) != (255, 255, 255) {
                    found_ink = true;
                    break 'outer;
                }
            }
        }
        assert!(found_ink, "expected glyph coverage above the baseline");
    }
}
