//! The card renderer collaborator.
//!
//! The pipeline does not care how a card looks; it depends only on the
//! [`CardRenderer`] contract: given one record and its decoded QR image,
//! produce a [`CardScene`] — a retained draw list in card millimetres with
//! the fixed 105 × 148 mm cell dimensions. The capture stage rasterises
//! that scene; nothing else ever interprets it.
//!
//! Each call gets the card's own index, record, and image, so renderers
//! have no shared mutable state between cards and consecutive captures
//! cannot alias to one another.
//!
//! [`ClassicCardRenderer`] is the built-in implementation: QR centred in
//! the upper part of the cell, the three identifier lines below it. Text is
//! drawn from real glyph outlines (`ttf-parser`), so it needs a TTF file —
//! from [`crate::config::ExportConfig::font_path`] or a handful of
//! well-known system locations.

use crate::config::ExportConfig;
use crate::deck::CardRecord;
use crate::error::ExportError;
use crate::pipeline::layout::{CARD_HEIGHT_MM, CARD_WIDTH_MM};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// One drawing operation inside a card cell. Coordinates are millimetres
/// from the cell's top-left corner; y grows downward.
pub enum SceneItem {
    /// A raster image scaled into the given rectangle.
    Image {
        image: Arc<DynamicImage>,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
    },
    /// A single line of black text on the given baseline.
    Text {
        font: Arc<CardFont>,
        text: String,
        x_mm: f64,
        baseline_mm: f64,
        size_mm: f64,
    },
}

/// The rendered representation of one card, ready for capture.
///
/// The scene always covers the full fixed cell; the capture stage fills the
/// background white before drawing the items in order.
#[derive(Default)]
pub struct CardScene {
    items: Vec<SceneItem>,
}

impl CardScene {
    pub fn push(&mut self, item: SceneItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[SceneItem] {
        &self.items
    }

    /// Cell size in millimetres; identical for every card by contract.
    pub fn size_mm(&self) -> (f64, f64) {
        (CARD_WIDTH_MM, CARD_HEIGHT_MM)
    }
}

/// Renders one card record into a [`CardScene`].
pub trait CardRenderer: Send + Sync {
    /// Render the card at deck index `index`.
    fn render(
        &self,
        index: usize,
        record: &CardRecord,
        qr: Arc<DynamicImage>,
    ) -> Result<CardScene, ExportError>;
}

// ── Font handling ────────────────────────────────────────────────────────

/// Well-known regular sans TTF locations, tried in order when no font path
/// is configured.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// An owned TTF font for card text.
///
/// `ttf_parser::Face` borrows its backing bytes, so the bytes are owned
/// here and a fresh `Face` is parsed per use — parsing is a cheap header
/// read, not a rasterisation.
#[derive(Debug)]
pub struct CardFont {
    data: Vec<u8>,
    path: PathBuf,
}

impl CardFont {
    /// Load and validate a TTF file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|e| ExportError::FontLoadFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        ttf_parser::Face::parse(&data, 0).map_err(|e| ExportError::FontLoadFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!("Loaded card font: {}", path.display());
        Ok(Self { data, path })
    }

    /// First present path from [`SYSTEM_FONT_PATHS`].
    pub fn discover() -> Option<PathBuf> {
        SYSTEM_FONT_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
    }

    /// Resolve the font for the built-in renderer: explicit config path,
    /// else system discovery.
    pub fn from_config(config: &ExportConfig) -> Result<Arc<Self>, ExportError> {
        let path = match &config.font_path {
            Some(p) => p.clone(),
            None => Self::discover().ok_or(ExportError::FontNotFound)?,
        };
        Ok(Arc::new(Self::load(path)?))
    }

    /// Path the font was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn parse(&self) -> Result<ttf_parser::Face<'_>, ExportError> {
        // Validated at load; re-parsing can still fail if the file lied
        // about a later table, so the error is propagated, not unwrapped.
        ttf_parser::Face::parse(&self.data, 0).map_err(|e| ExportError::FontLoadFailed {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }

    /// Advance width of `text` at `size_mm`, in millimetres. Missing glyphs
    /// fall back to the font's default advance of 0.
    pub fn measure_mm(&self, text: &str, size_mm: f64) -> Result<f64, ExportError> {
        let face = self.parse()?;
        let upem = face.units_per_em() as f64;
        let mut advance = 0.0;
        for ch in text.chars() {
            if let Some(gid) = face.glyph_index(ch) {
                advance += face.glyph_hor_advance(gid).unwrap_or(0) as f64;
            }
        }
        Ok(advance / upem * size_mm)
    }
}

// ── Built-in renderer ────────────────────────────────────────────────────

/// QR centred above three centred identifier lines, black on white.
pub struct ClassicCardRenderer {
    font: Arc<CardFont>,
}

/// Side of the square QR area in millimetres.
const QR_SIZE_MM: f64 = 70.0;
/// Top of the QR area.
const QR_TOP_MM: f64 = 24.0;
/// Identifier text size.
const TEXT_SIZE_MM: f64 = 5.0;
/// Baseline of the first identifier line.
const TEXT_FIRST_BASELINE_MM: f64 = 112.0;
/// Baseline-to-baseline distance between identifier lines.
const TEXT_LEADING_MM: f64 = 9.0;
/// Minimum side margin for overlong text.
const TEXT_MARGIN_MM: f64 = 4.0;

impl ClassicCardRenderer {
    pub fn new(font: Arc<CardFont>) -> Self {
        Self { font }
    }

    /// Build the renderer from config (explicit font path or discovery).
    pub fn from_config(config: &ExportConfig) -> Result<Self, ExportError> {
        Ok(Self::new(CardFont::from_config(config)?))
    }

    fn centred_text(&self, scene: &mut CardScene, text: &str, baseline_mm: f64) -> Result<(), ExportError> {
        let width = self.font.measure_mm(text, TEXT_SIZE_MM)?;
        let x_mm = ((CARD_WIDTH_MM - width) / 2.0).max(TEXT_MARGIN_MM);
        scene.push(SceneItem::Text {
            font: Arc::clone(&self.font),
            text: text.to_string(),
            x_mm,
            baseline_mm,
            size_mm: TEXT_SIZE_MM,
        });
        Ok(())
    }
}

impl CardRenderer for ClassicCardRenderer {
    fn render(
        &self,
        index: usize,
        record: &CardRecord,
        qr: Arc<DynamicImage>,
    ) -> Result<CardScene, ExportError> {
        let mut scene = CardScene::default();

        scene.push(SceneItem::Image {
            image: qr,
            x_mm: (CARD_WIDTH_MM - QR_SIZE_MM) / 2.0,
            y_mm: QR_TOP_MM,
            width_mm: QR_SIZE_MM,
            height_mm: QR_SIZE_MM,
        });

        let lines = [
            record.workspace_id.as_str(),
            record.user_id.as_str(),
            record.qr_code_id.as_str(),
        ];
        for (n, line) in lines.iter().enumerate() {
            self.centred_text(
                &mut scene,
                line,
                TEXT_FIRST_BASELINE_MM + n as f64 * TEXT_LEADING_MM,
            )?;
        }

        debug!("Rendered card {index}: {} scene items", scene.items().len());
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn qr() -> Arc<DynamicImage> {
        Arc::new(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            64,
            64,
            Rgba([0, 0, 0, 255]),
        )))
    }

    fn record() -> CardRecord {
        CardRecord {
            qr_code_src: "unused.png".into(),
            workspace_id: "ws-main".into(),
            user_id: "alice".into(),
            qr_code_id: "qr-0007".into(),
        }
    }

    #[test]
    fn scene_reports_the_fixed_cell_size() {
        let scene = CardScene::default();
        assert_eq!(scene.size_mm(), (105.0, 148.0));
    }

    #[test]
    fn classic_renderer_emits_qr_and_three_lines() {
        let Some(path) = CardFont::discover() else {
            println!("SKIP — no system TTF font found");
            return;
        };
        let font = Arc::new(CardFont::load(path).unwrap());
        let renderer = ClassicCardRenderer::new(font);

        let scene = renderer.render(0, &record(), qr()).unwrap();
        assert_eq!(scene.items().len(), 4);

        let images = scene
            .items()
            .iter()
            .filter(|i| matches!(i, SceneItem::Image { .. }))
            .count();
        assert_eq!(images, 1);

        // QR square is centred inside the 105 mm cell.
        if let SceneItem::Image { x_mm, width_mm, .. } = &scene.items()[0] {
            assert_eq!(*width_mm, QR_SIZE_MM);
            assert!((x_mm - 17.5).abs() < f64::EPSILON);
        } else {
            panic!("first item must be the QR image");
        }
    }

    #[test]
    fn measure_is_monotonic_in_text_length() {
        let Some(path) = CardFont::discover() else {
            println!("SKIP — no system TTF font found");
            return;
        };
        let font = CardFont::load(path).unwrap();
        let short = font.measure_mm("ws", 5.0).unwrap();
        let long = font.measure_mm("ws-a-much-longer-id", 5.0).unwrap();
        assert!(long > short);
        assert!(short > 0.0);
    }

    #[test]
    fn missing_font_file_is_a_load_error() {
        let err = CardFont::load("/no/such/font.ttf").unwrap_err();
        assert!(matches!(err, ExportError::FontLoadFailed { .. }));
    }
}
