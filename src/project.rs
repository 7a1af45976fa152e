//! Canvas snapshot: the widget tree, its rendered pixel positions, and the
//! operations the editor performs on them between drag frames.

use egui::{Pos2, Rect, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::autolayout::{
    CanvasSnapshot, FLEXBOX_PADDING, FlexLayer, FlexLayerAlignment, GRID_COLUMNS, Highlight,
    HighlightsPayload, LayerChild, ROW_GAP, ResponsiveBehavior, WidgetPosition, WidgetPositions,
    derive_highlights_from_layers, geometry::widget_width,
};
use crate::widget::{Widget, WidgetId, WidgetKind, WidgetTree};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("canvas {0} is not in the widget tree")]
    UnknownCanvas(WidgetId),
    #[error("widget {0} is not in the widget tree")]
    UnknownWidget(WidgetId),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub widgets: WidgetTree,
    #[serde(default)]
    pub positions: WidgetPositions,
    pub canvas_id: WidgetId,
    pub canvas_width: f32,
    /// Page position of the canvas' top-left corner.
    #[serde(default)]
    pub canvas_offset: Pos2,
    #[serde(default)]
    pub is_mobile: bool,
}

impl Default for Project {
    fn default() -> Self {
        use FlexLayerAlignment::*;

        let mut project = Project::new(640.0);
        for layer in [
            vec![
                (WidgetKind::Button, Start),
                (WidgetKind::Text, Center),
                (WidgetKind::Checkbox, End),
            ],
            vec![(WidgetKind::Input, Start), (WidgetKind::Button, Start)],
            vec![(WidgetKind::Image, Center)],
        ] {
            let children = layer
                .into_iter()
                .map(|(kind, align)| LayerChild {
                    id: project.add_widget(kind),
                    align,
                })
                .collect();
            if let Some(canvas) = project.widgets.get_mut(&project.canvas_id) {
                canvas.flex_layers.push(FlexLayer { children });
            }
        }
        project.sync_alignment();
        project.layout();
        project
    }
}

#[derive(Clone, Copy, Debug)]
struct LayoutItem {
    id: WidgetId,
    align: FlexLayerAlignment,
    size: Vec2,
}

impl Project {
    /// An empty canvas `canvas_width` pixels wide.
    pub fn new(canvas_width: f32) -> Self {
        let canvas_id = WidgetId::new(1);
        let mut canvas = Widget::new(canvas_id, WidgetKind::Canvas);
        canvas.parent_row_space = 1.0;
        let mut widgets = WidgetTree::new();
        widgets.insert(canvas_id, canvas);
        Self {
            widgets,
            positions: WidgetPositions::new(),
            canvas_id,
            canvas_width,
            canvas_offset: Pos2::ZERO,
            is_mobile: false,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        let project: Project = serde_json::from_str(json)?;
        if !project.widgets.contains_key(&project.canvas_id) {
            return Err(ProjectError::UnknownCanvas(project.canvas_id));
        }
        Ok(project)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ProjectError> {
        let json = std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let project = Self::from_json(&json)?;
        tracing::info!(
            "Loaded {} widgets from {}",
            project.widgets.len(),
            path.display()
        );
        Ok(project)
    }

    pub fn save(&self, path: &Path) -> Result<(), ProjectError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ProjectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Saved project to {}", path.display());
        Ok(())
    }

    pub fn canvas(&self) -> Option<&Widget> {
        self.widgets.get(&self.canvas_id)
    }

    /// Pixels per grid column at the current canvas width.
    pub fn column_space(&self) -> f32 {
        self.canvas_width / GRID_COLUMNS
    }

    pub fn next_id(&self) -> WidgetId {
        let max = self.widgets.keys().map(|id| id.get()).max().unwrap_or(0);
        WidgetId::new(max + 1)
    }

    /// Adds a widget of `kind` to the canvas, outside any layer. Place it with
    /// [`Project::commit_drop`].
    pub fn add_widget(&mut self, kind: WidgetKind) -> WidgetId {
        let id = self.next_id();
        let mut widget = Widget::new(id, kind);
        widget.parent_id = Some(self.canvas_id);
        widget.parent_column_space = self.column_space();
        self.widgets.insert(id, widget);
        if let Some(canvas) = self.widgets.get_mut(&self.canvas_id) {
            canvas.children.push(id);
        }
        id
    }

    pub fn remove_widget(&mut self, id: WidgetId) -> Result<(), ProjectError> {
        if self.widgets.remove(&id).is_none() {
            return Err(ProjectError::UnknownWidget(id));
        }
        self.positions.remove(&id);
        for widget in self.widgets.values_mut() {
            widget.children.retain(|c| *c != id);
            for layer in &mut widget.flex_layers {
                layer.children.retain(|c| c.id != id);
            }
            widget.flex_layers.retain(|l| !l.children.is_empty());
        }
        self.layout();
        Ok(())
    }

    pub fn snapshot(&self) -> CanvasSnapshot<'_> {
        CanvasSnapshot {
            tree: &self.widgets,
            positions: &self.positions,
            canvas_id: self.canvas_id,
            canvas_offset: self.canvas_offset,
            canvas_width: self.canvas_width,
            is_mobile: self.is_mobile,
        }
    }

    /// Drop targets for the current frame with `dragged` taken out of the
    /// flow.
    pub fn highlights(&self, dragged: &[WidgetId]) -> HighlightsPayload {
        derive_highlights_from_layers(&self.snapshot(), dragged)
    }

    /// Moves `id` to the slot `highlight` describes and lays the canvas out
    /// again.
    ///
    /// `highlight` must come from the layers as they were while `id` was being
    /// dragged: the widget is first taken out of its old layer, and layers left
    /// without laid-out children disappear, which brings layer and row indices
    /// in line with the ones the highlights were computed against.
    pub fn commit_drop(&mut self, id: WidgetId, highlight: &Highlight) -> Result<(), ProjectError> {
        let canvas_id = highlight.canvas_id;
        let old_parent = match self.widgets.get(&id) {
            Some(widget) => widget.parent_id,
            None => return Err(ProjectError::UnknownWidget(id)),
        };
        if id == canvas_id {
            return Err(ProjectError::UnknownWidget(id));
        }
        if let Some(parent) = old_parent
            && parent != canvas_id
            && let Some(old) = self.widgets.get_mut(&parent)
        {
            old.children.retain(|c| *c != id);
            for layer in &mut old.flex_layers {
                layer.children.retain(|c| c.id != id);
            }
            old.flex_layers.retain(|l| !l.children.is_empty());
        }

        let mut layers = match self.widgets.get_mut(&canvas_id) {
            Some(canvas) => std::mem::take(&mut canvas.flex_layers),
            None => return Err(ProjectError::UnknownCanvas(canvas_id)),
        };
        for layer in &mut layers {
            layer.children.retain(|c| c.id != id);
        }
        let widgets = &self.widgets;
        layers.retain(|l| {
            l.children
                .iter()
                .any(|c| widgets.get(&c.id).is_some_and(|w| !w.detach_from_layout))
        });

        let child = LayerChild {
            id,
            align: highlight.alignment,
        };
        if highlight.is_new_layer || highlight.layer_index >= layers.len() {
            let at = highlight.layer_index.min(layers.len());
            layers.insert(
                at,
                FlexLayer {
                    children: vec![child],
                },
            );
        } else {
            insert_into_layer(
                &mut layers[highlight.layer_index],
                child,
                highlight.row_index,
                &self.widgets,
            );
        }

        let order: Vec<WidgetId> = layers
            .iter()
            .flat_map(|l| l.children.iter().map(|c| c.id))
            .collect();
        if let Some(canvas) = self.widgets.get_mut(&canvas_id) {
            let detached: Vec<WidgetId> = canvas
                .children
                .iter()
                .copied()
                .filter(|c| *c != id && !order.contains(c))
                .collect();
            canvas.children = order;
            canvas.children.extend(detached);
            canvas.flex_layers = layers;
        }
        if let Some(widget) = self.widgets.get_mut(&id) {
            widget.parent_id = Some(canvas_id);
            widget.alignment = highlight.alignment;
        }

        tracing::debug!(
            "Dropped widget {} into layer {} ({}, slot {}{})",
            id,
            highlight.layer_index,
            highlight.alignment.display_name(),
            highlight.row_index,
            if highlight.is_new_layer { ", new layer" } else { "" }
        );
        self.layout();
        Ok(())
    }

    /// Copies each child's layer alignment onto the widget itself.
    fn sync_alignment(&mut self) {
        let Some(canvas) = self.canvas() else {
            return;
        };
        let pairs: Vec<LayerChild> = canvas
            .flex_layers
            .iter()
            .flat_map(|l| l.children.iter().copied())
            .collect();
        for child in pairs {
            if let Some(w) = self.widgets.get_mut(&child.id) {
                w.alignment = child.align;
            }
        }
    }

    /// Reference flex layout: recomputes pixel positions for the canvas and
    /// writes the resulting grid boxes back for the active breakpoint.
    ///
    /// Layers stack from `FLEXBOX_PADDING` with `ROW_GAP` between them. Inside
    /// a layer the start run packs left, the center run is centered and the
    /// end run packs right. On mobile, children that do not fit wrap onto a
    /// new line and `Fill` widgets take the whole width.
    pub fn layout(&mut self) {
        let Some(canvas) = self.canvas() else {
            tracing::warn!("Layout skipped: canvas {} missing", self.canvas_id);
            return;
        };
        let is_mobile = self.is_mobile;
        let width = self.canvas_width;
        let column_space = self.column_space();

        let mut placed: Vec<(WidgetId, Rect)> = Vec::new();
        let mut top = FLEXBOX_PADDING;
        for layer in &canvas.flex_layers {
            let items: Vec<LayoutItem> = layer
                .children
                .iter()
                .filter_map(|c| {
                    let w = self.widgets.get(&c.id)?;
                    if w.detach_from_layout {
                        return None;
                    }
                    let height = w.grid(is_mobile).rows().max(0.0) * w.parent_row_space;
                    let item_width = if is_mobile && w.responsive_behavior == ResponsiveBehavior::Fill {
                        width
                    } else {
                        (widget_width(w, is_mobile) * column_space).min(width)
                    };
                    Some(LayoutItem {
                        id: c.id,
                        align: c.align,
                        size: vec2(item_width, height),
                    })
                })
                .collect();
            if items.is_empty() {
                continue;
            }

            let mut line_top = top;
            for line in wrap_lines(&items, width, is_mobile) {
                let line_height = line.iter().map(|i| i.size.y).fold(0.0, f32::max);
                placed.extend(place_line(&line, width, line_top));
                line_top += line_height;
            }
            top = line_top + ROW_GAP;
        }

        let detached: Vec<WidgetId> = canvas
            .children
            .iter()
            .copied()
            .filter(|id| self.widgets.get(id).is_some_and(|w| w.detach_from_layout))
            .collect();
        let canvas_height = top;

        let offset = self.canvas_offset.to_vec2();
        let mut positions = WidgetPositions::new();
        positions.insert(
            self.canvas_id,
            WidgetPosition::new(offset.x, offset.y, width, canvas_height),
        );

        for (id, rect) in placed {
            let rect = rect.translate(offset);
            positions.insert(
                id,
                WidgetPosition::new(rect.left(), rect.top(), rect.width(), rect.height()),
            );
            if let Some(w) = self.widgets.get_mut(&id) {
                let row_space = w.parent_row_space;
                w.parent_column_space = column_space;
                let grid = w.grid_mut(is_mobile);
                let rows = grid.rows();
                if row_space > 0.0 {
                    grid.top_row = (rect.top() - offset.y) / row_space;
                    grid.bottom_row = grid.top_row + rows;
                }
                if column_space > 0.0 {
                    grid.left_column = (rect.left() - offset.x) / column_space;
                    grid.right_column = grid.left_column + rect.width() / column_space;
                }
            }
        }

        for id in detached {
            if let Some(w) = self.widgets.get(&id) {
                let size = vec2(
                    (widget_width(w, is_mobile) * column_space).min(width),
                    w.grid(is_mobile).rows() * w.parent_row_space,
                );
                let left = offset.x + (width - size.x) / 2.0;
                positions.insert(
                    id,
                    WidgetPosition::new(left, offset.y + FLEXBOX_PADDING, size.x, size.y),
                );
            }
        }

        tracing::trace!("Laid out {} widgets", positions.len());
        self.positions = positions;
    }
}

/// Inserts `child` in front of the `row_index`-th laid-out member of its
/// alignment run, or after the run's last laid-out member when the index is
/// past the end. Detached and dangling members do not count, matching the
/// slots the highlights were built from.
fn insert_into_layer(
    layer: &mut FlexLayer,
    child: LayerChild,
    row_index: usize,
    widgets: &WidgetTree,
) {
    let run: Vec<usize> = layer
        .children
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.align == child.align
                && widgets.get(&c.id).is_some_and(|w| !w.detach_from_layout)
        })
        .map(|(i, _)| i)
        .collect();
    let at = match (run.get(row_index), run.last()) {
        (Some(&i), _) => i,
        (None, Some(&last)) => last + 1,
        (None, None) => layer
            .children
            .iter()
            .position(|c| c.align as usize > child.align as usize)
            .unwrap_or(layer.children.len()),
    };
    layer.children.insert(at, child);
}

/// Splits a layer into visual lines. Desktop layers never wrap.
fn wrap_lines(items: &[LayoutItem], width: f32, wrap: bool) -> Vec<Vec<LayoutItem>> {
    if !wrap {
        return vec![items.to_vec()];
    }
    let mut lines: Vec<Vec<LayoutItem>> = Vec::new();
    let mut line: Vec<LayoutItem> = Vec::new();
    let mut x = 0.0;
    for &item in items {
        if !line.is_empty() && x + item.size.x > width {
            lines.push(std::mem::take(&mut line));
            x = 0.0;
        }
        x += item.size.x;
        line.push(item);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Places one line's runs: start packed left, center centered, end packed
/// right, never overlapping the run before.
fn place_line(line: &[LayoutItem], width: f32, top: f32) -> Vec<(WidgetId, Rect)> {
    let run_width = |align: FlexLayerAlignment| -> f32 {
        line.iter()
            .filter(|i| i.align == align)
            .map(|i| i.size.x)
            .sum()
    };
    let start_end = run_width(FlexLayerAlignment::Start);
    let center_width = run_width(FlexLayerAlignment::Center);
    let center_start = ((width - center_width) / 2.0).max(start_end);
    let end_start = (width - run_width(FlexLayerAlignment::End)).max(center_start + center_width);

    let mut cursor = [0.0, center_start, end_start];
    line.iter()
        .map(|item| {
            let x = &mut cursor[item.align as usize];
            let rect = Rect::from_min_size(pos2(*x, top), item.size);
            *x += item.size.x;
            (item.id, rect)
        })
        .collect()
}
