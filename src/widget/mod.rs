use egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::autolayout::{FlexLayer, FlexLayerAlignment, ResponsiveBehavior};

/// Immutable snapshot of every widget on the page, indexed by id.
pub type WidgetTree = BTreeMap<WidgetId, Widget>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(u64);

impl WidgetId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Bounding box in grid units for one breakpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridBox {
    pub top_row: f32,
    pub bottom_row: f32,
    pub left_column: f32,
    pub right_column: f32,
}

impl GridBox {
    pub const fn new(top_row: f32, bottom_row: f32, left_column: f32, right_column: f32) -> Self {
        Self {
            top_row,
            bottom_row,
            left_column,
            right_column,
        }
    }

    pub fn rows(&self) -> f32 {
        self.bottom_row - self.top_row
    }

    pub fn columns(&self) -> f32 {
        self.right_column - self.left_column
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    #[serde(default)]
    pub parent_id: Option<WidgetId>,
    pub kind: WidgetKind,
    #[serde(default)]
    pub children: Vec<WidgetId>,
    pub desktop: GridBox,
    pub mobile: GridBox,
    /// Pixels per grid row.
    pub parent_row_space: f32,
    /// Pixels per grid column.
    pub parent_column_space: f32,
    #[serde(default)]
    pub alignment: FlexLayerAlignment,
    #[serde(default)]
    pub responsive_behavior: ResponsiveBehavior,
    /// Modals and other overlays sit outside the flex flow.
    #[serde(default)]
    pub detach_from_layout: bool,
    /// Only canvas widgets carry layers.
    #[serde(default)]
    pub flex_layers: Vec<FlexLayer>,
}

impl Widget {
    /// A widget of `kind` at the grid origin, sized from the kind's defaults.
    pub fn new(id: WidgetId, kind: WidgetKind) -> Self {
        let size = kind.default_size();
        let grid = GridBox::new(0.0, size.y, 0.0, size.x);
        Self {
            id,
            parent_id: None,
            kind,
            children: Vec::new(),
            desktop: grid,
            mobile: grid,
            parent_row_space: crate::autolayout::GRID_ROW_HEIGHT,
            parent_column_space: 1.0,
            alignment: FlexLayerAlignment::Start,
            responsive_behavior: kind.default_responsive_behavior(),
            detach_from_layout: kind == WidgetKind::Modal,
            flex_layers: Vec::new(),
        }
    }

    pub fn grid(&self, is_mobile: bool) -> &GridBox {
        if is_mobile { &self.mobile } else { &self.desktop }
    }

    pub fn grid_mut(&mut self, is_mobile: bool) -> &mut GridBox {
        if is_mobile {
            &mut self.mobile
        } else {
            &mut self.desktop
        }
    }

    pub fn is_canvas(&self) -> bool {
        self.kind == WidgetKind::Canvas
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetKind {
    Canvas,
    Button,
    Text,
    Input,
    Checkbox,
    Image,
    Container,
    Modal,
}

impl WidgetKind {
    /// Default footprint in grid units: x = columns, y = rows.
    pub fn default_size(&self) -> Vec2 {
        match self {
            WidgetKind::Canvas => vec2(64.0, 40.0),
            WidgetKind::Button => vec2(16.0, 4.0),
            WidgetKind::Text => vec2(16.0, 4.0),
            WidgetKind::Input => vec2(30.0, 7.0),
            WidgetKind::Checkbox => vec2(12.0, 4.0),
            WidgetKind::Image => vec2(20.0, 12.0),
            WidgetKind::Container => vec2(64.0, 10.0),
            WidgetKind::Modal => vec2(40.0, 24.0),
        }
    }

    pub fn default_responsive_behavior(&self) -> ResponsiveBehavior {
        match self {
            WidgetKind::Canvas | WidgetKind::Input | WidgetKind::Container => {
                ResponsiveBehavior::Fill
            }
            _ => ResponsiveBehavior::Hug,
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            WidgetKind::Canvas => "Canvas",
            WidgetKind::Button => "Button",
            WidgetKind::Text => "Text",
            WidgetKind::Input => "Input",
            WidgetKind::Checkbox => "Checkbox",
            WidgetKind::Image => "Image",
            WidgetKind::Container => "Container",
            WidgetKind::Modal => "Modal",
        }
    }

    pub const PALETTE: [WidgetKind; 7] = [
        WidgetKind::Button,
        WidgetKind::Text,
        WidgetKind::Input,
        WidgetKind::Checkbox,
        WidgetKind::Image,
        WidgetKind::Container,
        WidgetKind::Modal,
    ];
}
