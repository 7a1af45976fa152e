//! Grid-unit and pixel helpers shared by the highlight generators.

use egui::{Pos2, Rect, Vec2};

use super::WidgetPositions;
use crate::widget::{Widget, WidgetId, WidgetTree};

/// Row span of `widget` for the requested breakpoint.
pub fn widget_height(widget: &Widget, is_mobile: bool) -> f32 {
    widget.grid(is_mobile).rows().max(0.0)
}

/// Column span of `widget` for the requested breakpoint.
pub fn widget_width(widget: &Widget, is_mobile: bool) -> f32 {
    widget.grid(is_mobile).columns().max(0.0)
}

/// Rows covered by `ids` taken together: lowest bottom minus highest top.
/// Ids missing from the tree are ignored; no children means zero rows.
pub fn total_rows_of_children(
    tree: &WidgetTree,
    ids: impl IntoIterator<Item = WidgetId>,
    is_mobile: bool,
) -> f32 {
    span(tree, ids, is_mobile, |_| 1.0)
}

/// Pixel height covered by `ids`, converting each child's rows with its own
/// row spacing.
pub fn layer_height_px(
    tree: &WidgetTree,
    ids: impl IntoIterator<Item = WidgetId>,
    is_mobile: bool,
) -> f32 {
    span(tree, ids, is_mobile, |w| w.parent_row_space)
}

fn span(
    tree: &WidgetTree,
    ids: impl IntoIterator<Item = WidgetId>,
    is_mobile: bool,
    scale: impl Fn(&Widget) -> f32,
) -> f32 {
    let mut top = f32::INFINITY;
    let mut bottom = f32::NEG_INFINITY;
    for id in ids {
        let Some(widget) = tree.get(&id) else {
            continue;
        };
        let grid = widget.grid(is_mobile);
        let s = scale(widget);
        top = top.min(grid.top_row * s);
        bottom = bottom.max(grid.bottom_row * s);
    }
    if top > bottom { 0.0 } else { bottom - top }
}

/// Pixel rectangle of `id` relative to the canvas origin.
///
/// A widget the renderer has not measured yet reads as an empty rectangle at
/// the origin.
pub fn relative_rect(positions: &WidgetPositions, id: WidgetId, canvas_offset: Pos2) -> Rect {
    match positions.get(&id) {
        Some(p) => p.rect().translate(-canvas_offset.to_vec2()),
        None => {
            tracing::trace!("no pixel position for widget {}", id);
            Rect::from_min_size(Pos2::ZERO, Vec2::ZERO)
        }
    }
}
