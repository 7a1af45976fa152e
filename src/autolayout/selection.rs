use egui::Pos2;
use std::cmp::Ordering;

use super::Highlight;

/// The highlight a drop at `pointer` (canvas-relative) would land on.
///
/// Highlights whose drop zone contains the pointer win over the rest; among
/// equals the one closest to the pointer wins, then the earliest in the list.
pub fn select_highlight(highlights: &[Highlight], pointer: Pos2) -> Option<&Highlight> {
    let key = |h: &Highlight| {
        (
            !h.drop_rect().contains(pointer),
            h.rect().distance_sq_to_pos(pointer),
        )
    };
    highlights
        .iter()
        .min_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal))
}
