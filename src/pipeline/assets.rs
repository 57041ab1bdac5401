//! Asset readiness gate: decode every card's QR image before any export.
//!
//! All sources are loaded concurrently — they have no shared target and
//! order does not matter here — but the gate itself is all-or-nothing: a
//! single failed source means the gate never opens for this run and the
//! export trigger stays inert. Failures are logged, not retried.
//!
//! The decoded images live in an [`AssetStore`] addressed by deck index.
//! Each capture later looks up its own card's image by index; there is no
//! shared "current image" reference that could alias consecutive captures
//! to the same content.

use crate::config::ExportConfig;
use crate::deck::Deck;
use crate::error::ExportError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::join_all;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Decoded QR images, one per card, addressed by deck index.
#[derive(Clone, Debug)]
pub struct AssetStore {
    images: Vec<Arc<DynamicImage>>,
}

impl AssetStore {
    /// The decoded image for the card at deck index `index`.
    pub fn get(&self, index: usize) -> Option<Arc<DynamicImage>> {
        self.images.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Decode every card's QR source. Resolves only when **all** succeed.
///
/// On failure every remaining load still runs to completion (so each broken
/// source is logged once), then the first error is returned and the gate
/// stays shut.
pub async fn preload(deck: &Deck, _config: &ExportConfig) -> Result<AssetStore, ExportError> {
    if deck.is_empty() {
        return Err(ExportError::EmptyDeck);
    }

    let handles: Vec<_> = deck
        .cards()
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let src = record.qr_code_src.clone();
            tokio::task::spawn_blocking(move || decode_source(index, &src))
        })
        .collect();

    let mut images = Vec::with_capacity(handles.len());
    let mut first_error: Option<ExportError> = None;

    for (index, joined) in join_all(handles).await.into_iter().enumerate() {
        let result =
            joined.map_err(|e| ExportError::Internal(format!("Asset task panicked: {e}")))?;
        match result {
            Ok(img) => images.push(Arc::new(img)),
            Err(e) => {
                error!("QR asset {index} failed to load: {e}");
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    info!("All {} QR assets loaded", images.len());
    Ok(AssetStore { images })
}

/// Blocking decode of one QR source: a local file path or a `data:` URI.
fn decode_source(index: usize, src: &str) -> Result<DynamicImage, ExportError> {
    let bytes = if src.starts_with("data:") {
        decode_data_uri(index, src)?
    } else {
        let path = PathBuf::from(src);
        if !path.exists() {
            return Err(ExportError::AssetMissing { index, path });
        }
        std::fs::read(&path).map_err(|e| ExportError::AssetUnreadable {
            index,
            path,
            source: e,
        })?
    };

    let img = image::load_from_memory(&bytes).map_err(|e| ExportError::AssetDecode {
        index,
        src: src.to_string(),
        detail: e.to_string(),
    })?;

    debug!("Decoded QR asset {index}: {}x{} px", img.width(), img.height());
    Ok(img)
}

/// Extract the payload of a `data:<mime>;base64,<payload>` URI.
fn decode_data_uri(index: usize, uri: &str) -> Result<Vec<u8>, ExportError> {
    let rest = &uri["data:".len()..];
    let (header, payload) = rest.split_once(',').ok_or_else(|| ExportError::AssetDataUri {
        index,
        detail: "missing ',' separator".into(),
    })?;

    if !header.ends_with(";base64") {
        return Err(ExportError::AssetDataUri {
            index,
            detail: format!("only base64 data URIs are supported, got header '{header}'"),
        });
    }

    STANDARD
        .decode(payload.trim())
        .map_err(|e| ExportError::AssetDataUri {
            index,
            detail: format!("invalid base64 payload: {e}"),
        })
}
