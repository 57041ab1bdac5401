//! Card records and the deck manifest.
//!
//! A [`Deck`] is the sole input to the export pipeline: an ordered,
//! immutable list of [`CardRecord`]s. Order is significant — it determines
//! page and slot placement — and fixed for the lifetime of a run.
//!
//! The JSON field names are camelCase to match the upstream dataset format
//! the cards come from, so a manifest can be produced by simply dumping
//! that dataset:
//!
//! ```json
//! [
//!   {
//!     "qrCodeSrc": "qr/ws-1-alice-qr-9.png",
//!     "workspaceId": "ws-1",
//!     "userId": "alice",
//!     "qrCodeId": "qr-9"
//!   }
//! ]
//! ```

use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One printable card: a QR image source plus three identifier strings.
///
/// `qr_code_src` is a local file path or a `data:image/...;base64,` URI.
/// Remote URLs are not supported — the pipeline never fetches data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CardRecord {
    /// Path or data URI of the pre-rendered QR image.
    pub qr_code_src: String,
    /// Workspace the QR code belongs to.
    pub workspace_id: String,
    /// User the QR code belongs to.
    pub user_id: String,
    /// Identifier of the QR code itself.
    pub qr_code_id: String,
}

/// The full ordered card sequence for one export run.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<CardRecord>,
}

impl Deck {
    /// Build a deck from an already-ordered list of records.
    pub fn from_cards(cards: Vec<CardRecord>) -> Self {
        Self { cards }
    }

    /// Parse a deck from a JSON array of card records.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        let cards: Vec<CardRecord> = serde_json::from_str(json)?;
        Ok(Self { cards })
    }

    /// Load a deck from a JSON manifest file on disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ExportError::ManifestRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        let deck = Self::from_json_str(&raw).map_err(|e| ExportError::ManifestParse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        debug!("Loaded manifest {}: {} cards", path.display(), deck.len());
        Ok(deck)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The ordered records. Index `k` lands on page `k / 4`, slot `k % 4`.
    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    /// Artifact name, derived from the first record regardless of how many
    /// pages follow: `{workspaceId}-{userId}-{qrCodeId}-feedback-card.pdf`.
    pub fn artifact_filename(&self) -> Result<String, ExportError> {
        let first = self.cards.first().ok_or(ExportError::EmptyDeck)?;
        Ok(format!(
            "{}-{}-{}-feedback-card.pdf",
            first.workspace_id, first.user_id, first.qr_code_id
        ))
    }
}
