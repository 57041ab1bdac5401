//! # cardpress
//!
//! Turn a deck of QR feedback cards into a print-ready multi-page PDF.
//!
//! ## Why this crate?
//!
//! Printing a batch of per-user QR cards by hand means fiddling with word
//! processors and mis-sized grids. This crate takes an ordered list of card
//! records (a QR image plus three identifier strings each), rasterises every
//! card at print resolution, and lays them out four to a page on a fixed
//! 210 × 296 mm sheet, so each A4 print guillotines cleanly into four
//! 105 × 148 mm cards.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Deck (JSON manifest or in-memory records)
//!  │
//!  ├─ 1. Assets    decode every QR source up front (all-or-nothing gate)
//!  ├─ 2. Card      render one record into a draw list (CardRenderer)
//!  ├─ 3. Capture   rasterise the card on white at the configured DPI
//!  ├─ 4. Layout    index → page, slot, millimetre offset (2 × 2 grid)
//!  ├─ 5. Assemble  place snapshots into the multi-page PDF
//!  └─ 6. Output    {workspaceId}-{userId}-{qrCodeId}-feedback-card.pdf
//! ```
//!
//! Nothing is exported unless everything succeeds: a single missing asset
//! keeps the trigger inert, and a single failed capture aborts the run with
//! no artifact.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cardpress::{export_to_file, Deck, ExportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let deck = Deck::load("cards.json").await?;
//!     let config = ExportConfig::builder().dpi(300).build()?;
//!     let (path, stats) = export_to_file(deck, config, "out").await?;
//!     println!("{} ({} pages, {} bytes)", path.display(), stats.pages, stats.pdf_bytes);
//!     Ok(())
//! }
//! ```
//!
//! For staged control — arm the gate first, fire the trigger later — use
//! [`ExportController`] directly.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cardpress` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! cardpress = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod deck;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportConfig, ExportConfigBuilder};
pub use deck::{CardRecord, Deck};
pub use error::ExportError;
pub use export::{
    export, export_sync, export_to_file, ExportArtifact, ExportController, ExportState,
    ExportStats,
};
pub use pipeline::card::{CardFont, CardRenderer, CardScene, ClassicCardRenderer, SceneItem};
pub use pipeline::layout::{
    Placement, CARDS_PER_PAGE, CARD_HEIGHT_MM, CARD_WIDTH_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
