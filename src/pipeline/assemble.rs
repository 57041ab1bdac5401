//! Document assembly: accumulate captured snapshots into a multi-page PDF.
//!
//! The assembler wraps `printpdf` behind the three operations the export
//! loop needs: `begin` (a document with its implicit first page),
//! `add_page`, and `place_snapshot`. Pages are only ever appended and
//! drawing always targets the newest page; the export loop adds a page
//! exactly when a chunk of four cards starts after the first.
//!
//! Coordinates arrive in the layout's page millimetres (origin top-left, y
//! down). PDF pages have their origin bottom-left with y up, so placement
//! flips y against the fixed page height once, here, and nowhere else.
//!
//! `finalize` consumes the assembler. Serialising the accumulated pages is
//! a one-shot operation; there is no way to place anything afterwards.

use crate::error::ExportError;
use crate::pipeline::capture::Snapshot;
use crate::pipeline::layout::{PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use printpdf::{
    ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Px,
};
use std::io::BufWriter;
use tracing::debug;

/// Accumulates snapshot placements into an in-memory PDF document.
pub struct DocumentAssembler {
    doc: PdfDocumentReference,
    current_layer: PdfLayerReference,
    page_count: usize,
}

impl DocumentAssembler {
    /// Start a document with its implicit first page.
    pub fn begin(title: &str) -> Self {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "cards");
        let current_layer = doc.get_page(page).get_layer(layer);
        Self {
            doc,
            current_layer,
            page_count: 1,
        }
    }

    /// Append a fresh page; subsequent placements land on it.
    pub fn add_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "cards");
        self.current_layer = self.doc.get_page(page).get_layer(layer);
        self.page_count += 1;
        debug!("Started page {}", self.page_count);
    }

    /// Pages appended so far, including the implicit first one.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Place a captured card on the current page.
    ///
    /// `x_mm`/`y_mm` are the cell's top-left offset in layout coordinates,
    /// `width_mm`/`height_mm` the size the snapshot must cover on paper. A
    /// capture made at the snapshot's own dpi already has that physical
    /// size; the scale factors only correct rounding in the pixel dims.
    pub fn place_snapshot(
        &self,
        card_index: usize,
        snapshot: &Snapshot,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
    ) -> Result<(), ExportError> {
        if snapshot.width_px == 0 || snapshot.height_px == 0 {
            return Err(ExportError::PlacementFailed {
                card: card_index,
                detail: "empty snapshot".into(),
            });
        }

        let natural_w_mm = snapshot.width_px as f64 / snapshot.dpi as f64 * 25.4;
        let natural_h_mm = snapshot.height_px as f64 / snapshot.dpi as f64 * 25.4;

        let xobject = ImageXObject {
            width: Px(snapshot.width_px as usize),
            height: Px(snapshot.height_px as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: false,
            image_data: snapshot.rgb_bytes().to_vec(),
            image_filter: None,
            clipping_bbox: None,
        };

        Image::from(xobject).add_to_layer(
            self.current_layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x_mm)),
                translate_y: Some(Mm(PAGE_HEIGHT_MM - y_mm - height_mm)),
                scale_x: Some(width_mm / natural_w_mm),
                scale_y: Some(height_mm / natural_h_mm),
                dpi: Some(snapshot.dpi as f64),
                ..Default::default()
            },
        );

        debug!(
            "Placed card {card_index} at ({x_mm}, {y_mm}) mm on page {}",
            self.page_count
        );
        Ok(())
    }

    /// Serialise every accumulated page into the finished PDF bytes.
    pub fn finalize(self) -> Result<Vec<u8>, ExportError> {
        let mut writer = BufWriter::new(Vec::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| ExportError::FinalizeFailed {
                detail: e.to_string(),
            })?;
        writer
            .into_inner()
            .map_err(|e| ExportError::FinalizeFailed {
                detail: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::capture::capture_card;
    use crate::pipeline::card::CardScene;

    async fn blank_snapshot() -> Snapshot {
        capture_card(CardScene::default(), 0, 72).await.unwrap()
    }

    #[test]
    fn begin_starts_with_one_page() {
        let asm = DocumentAssembler::begin("t");
        assert_eq!(asm.page_count(), 1);
    }

    #[test]
    fn add_page_appends() {
        let mut asm = DocumentAssembler::begin("t");
        asm.add_page();
        asm.add_page();
        assert_eq!(asm.page_count(), 3);
    }

    #[tokio::test]
    async fn finalize_yields_a_pdf() {
        let snap = blank_snapshot().await;
        let mut asm = DocumentAssembler::begin("ws-1-alice-qr-9-feedback-card");
        asm.place_snapshot(0, &snap, 0.0, 0.0, 105.0, 148.0).unwrap();
        asm.place_snapshot(1, &snap, 105.0, 0.0, 105.0, 148.0).unwrap();
        asm.add_page();
        asm.place_snapshot(4, &snap, 0.0, 148.0, 105.0, 148.0).unwrap();

        let bytes = asm.finalize().unwrap();
        assert!(bytes.starts_with(b"%PDF"), "not a PDF header");
        assert!(bytes.len() > 1000);
    }
}
