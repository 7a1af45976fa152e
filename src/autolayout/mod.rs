//! Drop-target highlights for flex-layer canvases.
//!
//! A canvas widget arranges its children in horizontal flex layers. Each layer
//! holds three alignment runs (start, center, end). While a widget is being
//! dragged, the editor shows a highlight for every place the widget could be
//! dropped: vertical slots between siblings of a run, and horizontal bands
//! between layers that create a new layer.
//!
//! Everything here is a pure function of an immutable snapshot. Callers
//! recompute on every drag frame and throw the previous result away.

pub mod geometry;
pub mod highlights;
pub mod selection;

use egui::{Rect, pos2, vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::widget::WidgetId;

pub use highlights::{
    AlignmentRun, CanvasSnapshot, HighlightsPayload, LayerContext, derive_highlights_from_layers,
    generate_highlights_for_alignment, generate_horizontal_highlights,
    generate_vertical_highlights,
};
pub use selection::select_highlight;

/// Inner padding of a flex canvas; the first band sits this far from the top.
pub const FLEXBOX_PADDING: f32 = 4.0;
/// Thickness of a highlight bar.
pub const DEFAULT_HIGHLIGHT_SIZE: f32 = 4.0;
/// Vertical gap between consecutive layers.
pub const ROW_GAP: f32 = 12.0;
/// Pixel height of one grid row.
pub const GRID_ROW_HEIGHT: f32 = 10.0;
pub const GRID_COLUMNS: f32 = 64.0;
/// Columns the start (or end) run may occupy before an empty center run
/// stops offering its own slot.
pub const CENTER_ENCROACH_COLUMNS: f32 = 25.0;
/// Columns start + center may occupy before an empty end run stops offering
/// its own slot.
pub const END_ENCROACH_COLUMNS: f32 = 50.0;
/// Pointer catchment on either side of a vertical highlight.
pub const VERTICAL_DROP_ZONE: f32 = 16.0;
/// Pointer catchment above and below a horizontal band.
pub const HORIZONTAL_DROP_ZONE: f32 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlexLayerAlignment {
    #[default]
    Start,
    Center,
    End,
}

impl FlexLayerAlignment {
    /// Left-to-right order of the runs inside a layer.
    pub const ALL: [FlexLayerAlignment; 3] = [
        FlexLayerAlignment::Start,
        FlexLayerAlignment::Center,
        FlexLayerAlignment::End,
    ];

    pub const fn display_name(&self) -> &'static str {
        match self {
            FlexLayerAlignment::Start => "Start",
            FlexLayerAlignment::Center => "Center",
            FlexLayerAlignment::End => "End",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponsiveBehavior {
    Fill,
    #[default]
    Hug,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerChild {
    pub id: WidgetId,
    pub align: FlexLayerAlignment,
}

/// One horizontal row of a canvas, children in visual order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlexLayer {
    pub children: Vec<LayerChild>,
}

impl FlexLayer {
    pub fn contains(&self, id: WidgetId) -> bool {
        self.children.iter().any(|c| c.id == id)
    }
}

/// Pixel rectangle of a rendered widget, in page coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetPosition {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl WidgetPosition {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(pos2(self.left, self.top), vec2(self.width, self.height))
    }
}

/// Live pixel positions supplied by the renderer, keyed by widget id.
pub type WidgetPositions = BTreeMap<WidgetId, WidgetPosition>;

/// Extra pointer catchment around a highlight rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DropZone {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl DropZone {
    pub const VERTICAL: DropZone = DropZone {
        top: 0.0,
        bottom: 0.0,
        left: VERTICAL_DROP_ZONE,
        right: VERTICAL_DROP_ZONE,
    };

    pub const HORIZONTAL: DropZone = DropZone {
        top: HORIZONTAL_DROP_ZONE,
        bottom: HORIZONTAL_DROP_ZONE,
        left: 0.0,
        right: 0.0,
    };
}

/// A drop target rectangle, relative to the canvas origin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Highlight {
    /// Dropping here creates a new layer at `layer_index`.
    pub is_new_layer: bool,
    /// Insertion index into the canvas' flattened child list.
    pub index: usize,
    pub layer_index: usize,
    /// Position within the alignment run.
    pub row_index: usize,
    pub alignment: FlexLayerAlignment,
    pub pos_x: f32,
    pub pos_y: f32,
    pub width: f32,
    pub height: f32,
    pub is_vertical: bool,
    pub canvas_id: WidgetId,
    pub drop_zone: DropZone,
}

impl Highlight {
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(pos2(self.pos_x, self.pos_y), vec2(self.width, self.height))
    }

    /// Rectangle plus drop zone margins.
    pub fn drop_rect(&self) -> Rect {
        let r = self.rect();
        Rect::from_min_max(
            pos2(r.min.x - self.drop_zone.left, r.min.y - self.drop_zone.top),
            pos2(r.max.x + self.drop_zone.right, r.max.y + self.drop_zone.bottom),
        )
    }
}
