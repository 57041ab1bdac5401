//! Export-run controller: the state machine that glues the pipeline stages
//! together, plus the eager one-call entry points.
//!
//! A run owns its state explicitly:
//!
//! ```text
//! Idle → WaitingForAssets → ReadyToExport → Exporting(page, slot)
//!                                         → Finalizing → Done
//!                  (any failure) → Failed
//! ```
//!
//! Readiness is a hard gate. [`ExportController::trigger`] inspects the
//! state synchronously before any capture work starts: unless the run is
//! `ReadyToExport` the trigger is a silent no-op returning `Ok(None)`. A
//! failed asset load is logged and leaves the gate shut for the whole run;
//! it is never retried.
//!
//! Captures are strictly sequential and page-major. Each card's scene is
//! rendered from its own record and its own decoded QR image, captured,
//! and placed before the next card starts. Any failure flips the run to
//! `Failed` and no artifact is delivered.
//!
//! Most callers want the eager [`export`] / [`export_to_file`] functions,
//! which drive a controller through the whole sequence and propagate the
//! first error.

use crate::config::ExportConfig;
use crate::deck::Deck;
use crate::error::ExportError;
use crate::pipeline::assemble::DocumentAssembler;
use crate::pipeline::assets::{self, AssetStore};
use crate::pipeline::capture::capture_card;
use crate::pipeline::card::{CardRenderer, ClassicCardRenderer};
use crate::pipeline::layout;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Where an export run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    /// Nothing has happened yet.
    Idle,
    /// Asset preloading is in flight.
    WaitingForAssets,
    /// Every asset decoded; the trigger is armed.
    ReadyToExport,
    /// Capturing and placing the card at this page and slot.
    Exporting { page: usize, slot: usize },
    /// All cards placed; serialising the document.
    Finalizing,
    /// Artifact delivered. Terminal.
    Done,
    /// The run aborted; no artifact exists. Terminal.
    Failed,
}

/// Statistics for a completed export run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportStats {
    /// Cards captured into the artifact.
    pub cards: usize,
    /// Pages in the artifact.
    pub pages: usize,
    /// Size of the finished PDF in bytes.
    pub pdf_bytes: usize,
    /// Total time rendering and rasterising cards.
    pub capture_ms: u64,
    /// Time serialising the document.
    pub finalize_ms: u64,
    /// Wall time for the whole export (gate excluded).
    pub total_ms: u64,
}

/// A finished export: the derived filename, the PDF bytes, and run stats.
#[derive(Debug)]
pub struct ExportArtifact {
    /// `{workspaceId}-{userId}-{qrCodeId}-feedback-card.pdf`, from record 0.
    pub filename: String,
    pub bytes: Vec<u8>,
    pub stats: ExportStats,
}

/// Drives one deck through the gate, the capture loop, and assembly.
pub struct ExportController {
    deck: Deck,
    config: ExportConfig,
    renderer: Arc<dyn CardRenderer>,
    assets: Option<AssetStore>,
    state: ExportState,
}

impl ExportController {
    /// Controller with the built-in card renderer.
    ///
    /// Fails if no usable TTF font is configured or discoverable.
    pub fn new(deck: Deck, config: ExportConfig) -> Result<Self, ExportError> {
        let renderer = Arc::new(ClassicCardRenderer::from_config(&config)?);
        Ok(Self::with_renderer(deck, config, renderer))
    }

    /// Controller with a custom [`CardRenderer`].
    pub fn with_renderer(
        deck: Deck,
        config: ExportConfig,
        renderer: Arc<dyn CardRenderer>,
    ) -> Self {
        Self {
            deck,
            config,
            renderer,
            assets: None,
            state: ExportState::Idle,
        }
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Whether the trigger is armed.
    pub fn is_ready(&self) -> bool {
        self.state == ExportState::ReadyToExport
    }

    /// Run the asset readiness gate.
    ///
    /// On success the controller becomes `ReadyToExport`. On failure every
    /// broken source has been logged, the error is returned, and the state
    /// drops back to `Idle`; the gate does not retry within a run.
    pub async fn load_assets(&mut self) -> Result<(), ExportError> {
        self.state = ExportState::WaitingForAssets;
        match assets::preload(&self.deck, &self.config).await {
            Ok(store) => {
                self.assets = Some(store);
                self.state = ExportState::ReadyToExport;
                Ok(())
            }
            Err(e) => {
                error!("Asset readiness gate stays shut: {e}");
                self.state = ExportState::Idle;
                Err(e)
            }
        }
    }

    /// Fire the export trigger.
    ///
    /// A no-op returning `Ok(None)` unless the controller is
    /// `ReadyToExport`. Otherwise runs the full capture-and-assemble
    /// sequence; on any failure the state becomes `Failed` and the error is
    /// propagated with no artifact.
    pub async fn trigger(&mut self) -> Result<Option<ExportArtifact>, ExportError> {
        if !self.is_ready() {
            debug!("Export trigger ignored in state {:?}", self.state);
            return Ok(None);
        }

        match self.run().await {
            Ok(artifact) => {
                self.state = ExportState::Done;
                Ok(Some(artifact))
            }
            Err(e) => {
                self.state = ExportState::Failed;
                Err(e)
            }
        }
    }

    async fn run(&mut self) -> Result<ExportArtifact, ExportError> {
        let run_start = Instant::now();

        let filename = self.deck.artifact_filename()?;
        let title = filename.trim_end_matches(".pdf").to_string();
        let store = self
            .assets
            .as_ref()
            .ok_or_else(|| ExportError::Internal("trigger fired without assets".into()))?
            .clone();

        let total_cards = self.deck.len();
        let total_pages = layout::page_count(total_cards);
        info!("Exporting {total_cards} cards across {total_pages} pages → {filename}");

        if let Some(cb) = &self.config.progress_callback {
            cb.on_export_start(total_cards, total_pages);
        }

        let mut assembler = DocumentAssembler::begin(&title);
        let mut capture_ms = 0u64;

        let pages: Vec<Vec<_>> = layout::chunks(self.deck.cards())
            .map(|chunk| chunk.to_vec())
            .collect();

        for (page, chunk) in pages.iter().enumerate() {
            if page > 0 {
                assembler.add_page();
            }

            for (slot, record) in chunk.iter().enumerate() {
                let index = page * layout::CARDS_PER_PAGE + slot;
                self.state = ExportState::Exporting { page, slot };

                if let Some(cb) = &self.config.progress_callback {
                    cb.on_card_start(index, total_cards);
                }

                let qr = store.get(index).ok_or_else(|| {
                    ExportError::Internal(format!("no decoded asset for card {index}"))
                })?;

                let capture_start = Instant::now();
                let scene = self.renderer.render(index, record, qr)?;
                let snapshot = capture_card(scene, index, self.config.dpi).await?;
                capture_ms += capture_start.elapsed().as_millis() as u64;

                let placement = layout::placement(index);
                debug_assert_eq!(placement.page, page);
                debug_assert_eq!(placement.slot, slot);
                assembler.place_snapshot(
                    index,
                    &snapshot,
                    placement.x_mm,
                    placement.y_mm,
                    layout::CARD_WIDTH_MM,
                    layout::CARD_HEIGHT_MM,
                )?;

                if let Some(cb) = &self.config.progress_callback {
                    cb.on_card_placed(index, total_cards);
                }
            }

            if let Some(cb) = &self.config.progress_callback {
                cb.on_page_complete(page, total_pages);
            }
        }

        self.state = ExportState::Finalizing;
        let finalize_start = Instant::now();
        let bytes = assembler.finalize()?;
        let finalize_ms = finalize_start.elapsed().as_millis() as u64;

        let stats = ExportStats {
            cards: total_cards,
            pages: total_pages,
            pdf_bytes: bytes.len(),
            capture_ms,
            finalize_ms,
            total_ms: run_start.elapsed().as_millis() as u64,
        };

        if let Some(cb) = &self.config.progress_callback {
            cb.on_export_complete(total_cards, bytes.len());
        }

        info!(
            "Export complete: {} pages, {} bytes in {} ms",
            stats.pages, stats.pdf_bytes, stats.total_ms
        );

        Ok(ExportArtifact {
            filename,
            bytes,
            stats,
        })
    }
}

// ── Eager entry points ───────────────────────────────────────────────────

/// Export a deck to in-memory PDF bytes.
///
/// Runs the full sequence: gate, capture loop, assembly. The first failure
/// at any stage is returned and no artifact exists.
pub async fn export(deck: Deck, config: ExportConfig) -> Result<ExportArtifact, ExportError> {
    let mut controller = ExportController::new(deck, config)?;
    controller.load_assets().await?;
    controller
        .trigger()
        .await?
        .ok_or_else(|| ExportError::Internal("armed trigger produced no artifact".into()))
}

/// Export a deck and write the artifact into `output_dir` under its derived
/// filename. Returns the written path and the run stats.
///
/// The write is atomic: bytes go to a temp file in the same directory,
/// which is renamed over the final name only once fully written.
pub async fn export_to_file(
    deck: Deck,
    config: ExportConfig,
    output_dir: impl AsRef<Path>,
) -> Result<(PathBuf, ExportStats), ExportError> {
    let artifact = export(deck, config).await?;

    let output_dir = output_dir.as_ref();
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| ExportError::OutputWriteFailed {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

    let final_path = output_dir.join(&artifact.filename);
    let tmp_path = output_dir.join(format!(".{}.tmp", artifact.filename));

    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(|e| ExportError::OutputWriteFailed {
            path: tmp_path.clone(),
            source: e,
        })?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
        // Best effort; the temp file is garbage either way.
        if let Err(rm) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Could not remove temp file {}: {rm}", tmp_path.display());
        }
        return Err(ExportError::OutputWriteFailed {
            path: final_path,
            source: e,
        });
    }

    info!("Wrote {}", final_path.display());
    Ok((final_path, artifact.stats))
}

/// Blocking wrapper around [`export`] for non-async callers.
pub fn export_sync(deck: Deck, config: ExportConfig) -> Result<ExportArtifact, ExportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExportError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(export(deck, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::CardRecord;
    use crate::pipeline::card::{CardScene, SceneItem};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Renderer that needs no font: a single full-bleed rectangle.
    struct StubRenderer;

    impl CardRenderer for StubRenderer {
        fn render(
            &self,
            _index: usize,
            _record: &CardRecord,
            qr: Arc<DynamicImage>,
        ) -> Result<CardScene, ExportError> {
            let mut scene = CardScene::default();
            scene.push(SceneItem::Image {
                image: qr,
                x_mm: 10.0,
                y_mm: 10.0,
                width_mm: 40.0,
                height_mm: 40.0,
            });
            Ok(scene)
        }
    }

    fn data_uri_png() -> String {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(&buf))
    }

    fn deck_of(n: usize) -> Deck {
        Deck::from_cards(
            (0..n)
                .map(|k| CardRecord {
                    qr_code_src: data_uri_png(),
                    workspace_id: "ws".into(),
                    user_id: "u".into(),
                    qr_code_id: format!("q{k}"),
                })
                .collect(),
        )
    }

    fn low_dpi() -> ExportConfig {
        ExportConfig::builder().dpi(72).build().unwrap()
    }

    #[tokio::test]
    async fn trigger_before_load_is_a_silent_noop() {
        let mut c = ExportController::with_renderer(deck_of(2), low_dpi(), Arc::new(StubRenderer));
        assert_eq!(c.state(), ExportState::Idle);
        assert!(c.trigger().await.unwrap().is_none());
        assert_eq!(c.state(), ExportState::Idle);
    }

    #[tokio::test]
    async fn failed_gate_keeps_the_trigger_inert() {
        let deck = Deck::from_cards(vec![CardRecord {
            qr_code_src: "/missing/qr.png".into(),
            workspace_id: "ws".into(),
            user_id: "u".into(),
            qr_code_id: "q0".into(),
        }]);
        let mut c = ExportController::with_renderer(deck, low_dpi(), Arc::new(StubRenderer));

        assert!(c.load_assets().await.is_err());
        assert!(!c.is_ready());
        assert!(c.trigger().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_run_reaches_done_with_stats() {
        let mut c = ExportController::with_renderer(deck_of(4), low_dpi(), Arc::new(StubRenderer));
        c.load_assets().await.unwrap();
        assert!(c.is_ready());

        let artifact = c.trigger().await.unwrap().expect("armed trigger exports");
        assert_eq!(c.state(), ExportState::Done);
        assert_eq!(artifact.filename, "ws-u-q0-feedback-card.pdf");
        assert_eq!(artifact.stats.cards, 4);
        assert_eq!(artifact.stats.pages, 1);
        assert!(artifact.bytes.starts_with(b"%PDF"));
        assert_eq!(artifact.stats.pdf_bytes, artifact.bytes.len());
    }

    #[tokio::test]
    async fn renderer_failure_flips_the_run_to_failed() {
        struct FailingRenderer {
            fail_at: usize,
        }
        impl CardRenderer for FailingRenderer {
            fn render(
                &self,
                index: usize,
                _record: &CardRecord,
                _qr: Arc<DynamicImage>,
            ) -> Result<CardScene, ExportError> {
                if index == self.fail_at {
                    return Err(ExportError::CaptureFailed {
                        card: index,
                        detail: "boom".into(),
                    });
                }
                Ok(CardScene::default())
            }
        }

        let mut c = ExportController::with_renderer(
            deck_of(4),
            low_dpi(),
            Arc::new(FailingRenderer { fail_at: 2 }),
        );
        c.load_assets().await.unwrap();

        let err = c.trigger().await.unwrap_err();
        assert!(matches!(err, ExportError::CaptureFailed { card: 2, .. }));
        assert_eq!(c.state(), ExportState::Failed);
    }

    #[test]
    fn export_sync_runs_outside_a_runtime() {
        // export_sync builds its own controller with the classic renderer,
        // which needs a font; exercise the runtime wrapper only when one is
        // present.
        let Some(_) = crate::pipeline::card::CardFont::discover() else {
            println!("SKIP — no system TTF font found");
            return;
        };
        let artifact = export_sync(deck_of(1), low_dpi()).unwrap();
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }
}
