//! Error types for the cardpress library.
//!
//! A single fatal [`ExportError`] covers every failure mode. There is no
//! non-fatal, per-card error type on purpose: the export contract is
//! whole-document-or-nothing. Either every card on every page is captured
//! and placed, or no artifact is delivered and the run ends failed. The
//! user retries the entire run from the start.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the cardpress library.
///
/// Every variant is terminal for the current export run.
#[derive(Debug, Error)]
pub enum ExportError {
    // ── Asset errors (readiness gate) ─────────────────────────────────────
    /// A card's QR source file was not found.
    #[error("QR asset for card {index} not found: '{path}'\nCheck the qrCodeSrc paths in the manifest.")]
    AssetMissing { index: usize, path: PathBuf },

    /// A card's QR source file exists but could not be read.
    #[error("Failed to read QR asset for card {index}: '{path}'")]
    AssetUnreadable {
        index: usize,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A card's QR source bytes are not a decodable image.
    #[error("QR asset for card {index} is not a decodable image: '{src}'\nDetail: {detail}")]
    AssetDecode {
        index: usize,
        src: String,
        detail: String,
    },

    /// A `data:` URI QR source is malformed.
    #[error("QR asset for card {index} has a malformed data URI\nDetail: {detail}")]
    AssetDataUri { index: usize, detail: String },

    // ── Manifest errors ───────────────────────────────────────────────────
    /// The card manifest file could not be read.
    #[error("Failed to read card manifest '{path}'")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The card manifest is not valid JSON for an array of card records.
    #[error("Card manifest '{path}' is not a valid card array: {detail}\nExpected JSON like: [{{\"qrCodeSrc\": \"...\", \"workspaceId\": \"...\", \"userId\": \"...\", \"qrCodeId\": \"...\"}}]")]
    ManifestParse { path: PathBuf, detail: String },

    /// The deck contains no cards; there is nothing to export and no first
    /// record to derive the artifact name from.
    #[error("The deck is empty — nothing to export.")]
    EmptyDeck,

    // ── Renderer errors ───────────────────────────────────────────────────
    /// No usable TTF font was found for the built-in card renderer.
    #[error("No TTF font found for card text.\nPass one with --font /path/to/font.ttf (or ExportConfig::builder().font_path(...)).")]
    FontNotFound,

    /// A font file was found but could not be loaded or parsed.
    #[error("Failed to load font '{path}': {detail}")]
    FontLoadFailed { path: PathBuf, detail: String },

    // ── Capture errors ────────────────────────────────────────────────────
    /// Rendering or rasterising a single card failed. Aborts the whole run.
    #[error("Capture failed for card {card}: {detail}")]
    CaptureFailed { card: usize, detail: String },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// Placing a snapshot onto the current page failed.
    #[error("Failed to place card {card} on the page: {detail}")]
    PlacementFailed { card: usize, detail: String },

    /// Serialising the accumulated pages into PDF bytes failed.
    #[error("Failed to finalise the PDF document: {detail}")]
    FinalizeFailed { detail: String },

    /// Could not write the finished artifact to disk.
    #[error("Failed to write output file '{path}'")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
