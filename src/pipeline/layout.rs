//! Pagination and placement: a flat card index into page, slot, and a
//! millimetre offset on the page.
//!
//! The grid is part of the output contract and therefore fixed: a 210 × 296
//! portrait page holding 2 × 2 cards of 105 × 148 mm each. Placement is a
//! pure function of the card's index — page-major, then row-major, then
//! column-major — so card order in the deck is strictly preserved and two
//! runs over the same deck place every card identically.

use crate::deck::CardRecord;

/// Page width in millimetres (portrait).
pub const PAGE_WIDTH_MM: f64 = 210.0;
/// Page height in millimetres. 296, not A4's 297, so the 2 × 2 grid divides
/// it into exact 148 mm cells.
pub const PAGE_HEIGHT_MM: f64 = 296.0;

/// Cards per row.
pub const COLUMNS: usize = 2;
/// Rows per page.
pub const ROWS_PER_PAGE: usize = 2;
/// Cards per page; the chunk size for pagination.
pub const CARDS_PER_PAGE: usize = COLUMNS * ROWS_PER_PAGE;

/// Width of one card cell in millimetres.
pub const CARD_WIDTH_MM: f64 = PAGE_WIDTH_MM / COLUMNS as f64;
/// Height of one card cell in millimetres.
pub const CARD_HEIGHT_MM: f64 = PAGE_HEIGHT_MM / ROWS_PER_PAGE as f64;

/// Where one card lands: page, slot within the page, and the top-left
/// offset of its cell in page millimetres (y grows downward from the top of
/// the page; the assembler converts to PDF coordinates).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// 0-indexed output page.
    pub page: usize,
    /// 0-indexed slot within the page, `0..CARDS_PER_PAGE`.
    pub slot: usize,
    /// Horizontal offset of the cell, `0` or [`CARD_WIDTH_MM`].
    pub x_mm: f64,
    /// Vertical offset of the cell from the page top, `0` or [`CARD_HEIGHT_MM`].
    pub y_mm: f64,
}

/// Number of pages needed for `cards` cards: `ceil(cards / 4)`.
pub fn page_count(cards: usize) -> usize {
    cards.div_ceil(CARDS_PER_PAGE)
}

/// Placement for the card at deck index `card_index`.
pub fn placement(card_index: usize) -> Placement {
    let page = card_index / CARDS_PER_PAGE;
    let slot = card_index % CARDS_PER_PAGE;
    let row = slot / COLUMNS;
    let col = slot % COLUMNS;
    Placement {
        page,
        slot,
        x_mm: col as f64 * CARD_WIDTH_MM,
        y_mm: row as f64 * CARD_HEIGHT_MM,
    }
}

/// The deck sliced into page chunks of at most [`CARDS_PER_PAGE`] records.
/// The final chunk may be short; its unused slots stay empty.
pub fn chunks(cards: &[CardRecord]) -> impl Iterator<Item = &[CardRecord]> {
    cards.chunks(CARDS_PER_PAGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_constants_are_consistent() {
        assert_eq!(CARDS_PER_PAGE, 4);
        assert_eq!(CARD_WIDTH_MM, 105.0);
        assert_eq!(CARD_HEIGHT_MM, 148.0);
    }

    #[test]
    fn page_count_is_ceiling_division() {
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(4), 1);
        assert_eq!(page_count(5), 2);
        assert_eq!(page_count(8), 2);
        assert_eq!(page_count(9), 3);
        assert_eq!(page_count(0), 0);
    }

    #[test]
    fn last_page_holds_the_remainder() {
        // N cards → last page holds N - 4*(pages-1), always 1–4 for N > 0.
        for n in 1..=20usize {
            let pages = page_count(n);
            let on_last = n - CARDS_PER_PAGE * (pages - 1);
            assert!((1..=CARDS_PER_PAGE).contains(&on_last), "n={n}");
        }
    }

    #[test]
    fn placement_is_pure_in_index_mod_four() {
        for k in 0..32 {
            let a = placement(k);
            let b = placement(k + CARDS_PER_PAGE);
            assert_eq!(a.slot, b.slot);
            assert_eq!(a.x_mm, b.x_mm);
            assert_eq!(a.y_mm, b.y_mm);
            assert_eq!(b.page, a.page + 1);
        }
    }

    #[test]
    fn offsets_only_take_grid_values() {
        for k in 0..64 {
            let p = placement(k);
            assert!(p.x_mm == 0.0 || p.x_mm == CARD_WIDTH_MM);
            assert!(p.y_mm == 0.0 || p.y_mm == CARD_HEIGHT_MM);
        }
    }

    #[test]
    fn order_is_page_major_row_major_column_major() {
        let expected = [
            (0, 0, 0.0, 0.0),
            (0, 1, 105.0, 0.0),
            (0, 2, 0.0, 148.0),
            (0, 3, 105.0, 148.0),
            (1, 0, 0.0, 0.0),
        ];
        for (k, &(page, slot, x, y)) in expected.iter().enumerate() {
            let p = placement(k);
            assert_eq!((p.page, p.slot, p.x_mm, p.y_mm), (page, slot, x, y), "k={k}");
        }
    }

    #[test]
    fn chunks_preserve_order_and_slice_at_boundaries() {
        let records: Vec<_> = (0..6)
            .map(|n| CardRecord {
                qr_code_src: format!("{n}.png"),
                workspace_id: "ws".into(),
                user_id: "u".into(),
                qr_code_id: format!("{n}"),
            })
            .collect();

        let pages: Vec<&[CardRecord]> = chunks(&records).collect();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 4);
        assert_eq!(pages[1].len(), 2);
        assert_eq!(pages[1][0].qr_code_id, "4");
    }
}
