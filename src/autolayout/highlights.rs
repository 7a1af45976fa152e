//! Highlight generation: alignment runs, layers, and whole canvases.

use egui::{Pos2, Rect};

use super::geometry::{layer_height_px, relative_rect, widget_width};
use super::{
    CENTER_ENCROACH_COLUMNS, DEFAULT_HIGHLIGHT_SIZE, DropZone, END_ENCROACH_COLUMNS,
    FLEXBOX_PADDING, FlexLayer, FlexLayerAlignment, Highlight, ROW_GAP, WidgetPositions,
};
use crate::widget::{WidgetId, WidgetTree};

/// Read-only inputs shared by every layer of one canvas.
#[derive(Clone, Copy, Debug)]
pub struct CanvasSnapshot<'a> {
    pub tree: &'a WidgetTree,
    pub positions: &'a WidgetPositions,
    pub canvas_id: WidgetId,
    /// Page position of the canvas; highlights are relative to it.
    pub canvas_offset: Pos2,
    pub canvas_width: f32,
    pub is_mobile: bool,
}

/// Where a layer sits within its canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LayerContext {
    pub layer_index: usize,
    /// Top of the layer, in pixels from the canvas top.
    pub offset_top: f32,
    /// Children counted in earlier layers.
    pub child_count: usize,
}

/// One alignment group of a layer.
#[derive(Clone, Copy, Debug)]
pub struct AlignmentRun<'a> {
    pub children: &'a [WidgetId],
    pub alignment: FlexLayerAlignment,
    /// Canvas insertion index of the first child.
    pub first_index: usize,
    /// Slot height used when the run is empty.
    pub max_height: f32,
    /// Skip the slot in front of the first child (or the lone slot of an
    /// empty run).
    pub avoid_initial_highlight: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighlightsPayload {
    pub highlights: Vec<Highlight>,
    pub child_count: usize,
}

fn vertical_highlight(
    snapshot: &CanvasSnapshot<'_>,
    layer: &LayerContext,
    run: &AlignmentRun<'_>,
    row_index: usize,
    pos: Pos2,
    height: f32,
) -> Highlight {
    Highlight {
        is_new_layer: false,
        index: run.first_index + row_index,
        layer_index: layer.layer_index,
        row_index,
        alignment: run.alignment,
        pos_x: pos.x,
        pos_y: pos.y,
        width: DEFAULT_HIGHLIGHT_SIZE,
        height,
        is_vertical: true,
        canvas_id: snapshot.canvas_id,
        drop_zone: DropZone::VERTICAL,
    }
}

/// Vertical slots for one alignment run: one in front of every child and one
/// after the last.
///
/// Children are grouped into wrapped rows by their pixel rectangles; a child
/// whose top reaches the bottom of the current row opens a new one. Slots take
/// the top of their row and the height of the row's tallest child.
pub fn generate_highlights_for_alignment(
    snapshot: &CanvasSnapshot<'_>,
    layer: &LayerContext,
    run: &AlignmentRun<'_>,
) -> Vec<Highlight> {
    let mut res = Vec::new();

    if run.children.is_empty() {
        if run.avoid_initial_highlight {
            return res;
        }
        let x = match run.alignment {
            FlexLayerAlignment::Start => 0.0,
            FlexLayerAlignment::Center => (snapshot.canvas_width - DEFAULT_HIGHLIGHT_SIZE) / 2.0,
            FlexLayerAlignment::End => snapshot.canvas_width - DEFAULT_HIGHLIGHT_SIZE,
        };
        res.push(vertical_highlight(
            snapshot,
            layer,
            run,
            0,
            Pos2::new(x, layer.offset_top),
            run.max_height,
        ));
        return res;
    }

    let rects: Vec<Rect> = run
        .children
        .iter()
        .map(|&id| relative_rect(snapshot.positions, id, snapshot.canvas_offset))
        .collect();

    for (row_start, row_end) in wrapped_rows(&rects) {
        let row = &rects[row_start..row_end];
        // Unmeasured children only shape a row that has nothing else.
        let any_measured = row.iter().any(|r| !is_unmeasured(r));
        let measured = || row.iter().filter(move |r| !any_measured || !is_unmeasured(r));
        let top = measured().map(|r| r.top()).fold(f32::INFINITY, f32::min);
        let height = measured().map(|r| r.height()).fold(0.0, f32::max);

        for (i, rect) in row.iter().enumerate() {
            let row_index = row_start + i;
            if row_index == 0 && run.avoid_initial_highlight {
                continue;
            }
            res.push(vertical_highlight(
                snapshot,
                layer,
                run,
                row_index,
                Pos2::new(rect.left() - DEFAULT_HIGHLIGHT_SIZE, top),
                height,
            ));
        }

        if row_end == rects.len() {
            let last = measured().last().unwrap_or(&rects[row_end - 1]);
            res.push(vertical_highlight(
                snapshot,
                layer,
                run,
                row_end,
                Pos2::new(last.right(), top),
                height,
            ));
        }
    }

    res
}

/// A zero-size rect stands in for a child the renderer has not measured yet.
fn is_unmeasured(rect: &Rect) -> bool {
    rect.width() <= 0.0 && rect.height() <= 0.0
}

/// Splits rectangles, in flow order, into `[start, end)` ranges of wrapped
/// rows. Unmeasured rects stay in the row they follow and never move its
/// bounds.
fn wrapped_rows(rects: &[Rect]) -> Vec<(usize, usize)> {
    let mut rows = Vec::new();
    if rects.is_empty() {
        return rows;
    }
    let mut start = 0;
    let mut bounds: Option<(f32, f32)> = None;
    for (i, rect) in rects.iter().enumerate() {
        if is_unmeasured(rect) {
            continue;
        }
        match bounds {
            Some((row_top, row_bottom)) if rect.top() >= row_bottom && rect.top() > row_top => {
                rows.push((start, i));
                start = i;
                bounds = Some((rect.top(), rect.bottom()));
            }
            Some((row_top, row_bottom)) => bounds = Some((row_top, row_bottom.max(rect.bottom()))),
            None => bounds = Some((rect.top(), rect.bottom())),
        }
    }
    rows.push((start, rects.len()));
    rows
}

/// Vertical slots for every alignment run of `flex_layer`, start to end.
///
/// Detached widgets and ids missing from the tree are skipped. Dragged
/// widgets count towards `child_count` but get no slots. An empty center run
/// gives up its slot when start or end reaches into its third of the canvas;
/// an empty end run does the same when start and center together cover most
/// of the row.
pub fn generate_vertical_highlights(
    snapshot: &CanvasSnapshot<'_>,
    layer: &LayerContext,
    flex_layer: &FlexLayer,
    dragged: &[WidgetId],
) -> HighlightsPayload {
    let mut count = 0;
    let mut runs: [Vec<WidgetId>; 3] = Default::default();
    let mut columns = [0.0_f32; 3];
    let mut max_height: f32 = 0.0;

    for child in &flex_layer.children {
        let Some(widget) = snapshot.tree.get(&child.id) else {
            continue;
        };
        if widget.detach_from_layout {
            continue;
        }
        count += 1;
        if dragged.contains(&child.id) {
            continue;
        }
        let rect = relative_rect(snapshot.positions, child.id, snapshot.canvas_offset);
        max_height = max_height.max(rect.height());

        let slot = child.align as usize;
        runs[slot].push(child.id);
        columns[slot] += widget_width(widget, snapshot.is_mobile);
    }

    let [start, center, end] = &runs;
    let [start_columns, center_columns, end_columns] = columns;

    let plan = [
        (start, false),
        (
            center,
            center.is_empty()
                && (start_columns > CENTER_ENCROACH_COLUMNS || end_columns > CENTER_ENCROACH_COLUMNS),
        ),
        (
            end,
            end.is_empty() && start_columns + center_columns > END_ENCROACH_COLUMNS,
        ),
    ];

    let mut highlights = Vec::new();
    let mut first_index = layer.child_count;
    for ((children, avoid_initial_highlight), alignment) in plan.into_iter().zip(FlexLayerAlignment::ALL) {
        let run = AlignmentRun {
            children,
            alignment,
            first_index,
            max_height,
            avoid_initial_highlight,
        };
        highlights.extend(generate_highlights_for_alignment(snapshot, layer, &run));
        first_index += children.len();
    }

    HighlightsPayload {
        highlights,
        child_count: count,
    }
}

/// A new-layer band at `pos_y`: three segments, one per alignment, each a
/// third of the canvas wide.
pub fn generate_horizontal_highlights(
    snapshot: &CanvasSnapshot<'_>,
    child_count: usize,
    layer_index: usize,
    pos_y: f32,
) -> Vec<Highlight> {
    let width = snapshot.canvas_width / 3.0;
    FlexLayerAlignment::ALL
        .iter()
        .enumerate()
        .map(|(i, &alignment)| Highlight {
            is_new_layer: true,
            index: child_count,
            layer_index,
            row_index: 0,
            alignment,
            pos_x: width * i as f32 + FLEXBOX_PADDING,
            pos_y,
            width,
            height: DEFAULT_HIGHLIGHT_SIZE,
            is_vertical: false,
            canvas_id: snapshot.canvas_id,
            drop_zone: DropZone::HORIZONTAL,
        })
        .collect()
}

/// All highlights of a canvas, top to bottom.
///
/// Each layer that still has children once `dragged` is discounted gets a
/// band above it followed by its vertical slots. A final band closes the
/// canvas, so an empty canvas yields exactly that one band. `child_count` of
/// the result is the number of laid-out children, dragged ones included.
pub fn derive_highlights_from_layers(
    snapshot: &CanvasSnapshot<'_>,
    dragged: &[WidgetId],
) -> HighlightsPayload {
    let Some(canvas) = snapshot.tree.get(&snapshot.canvas_id) else {
        tracing::debug!("canvas {} not in widget tree", snapshot.canvas_id);
        return HighlightsPayload::default();
    };

    let mut highlights = Vec::new();
    let mut child_count = 0;
    let mut layer_index = 0;
    let mut offset_top = FLEXBOX_PADDING;
    let mut band_top = FLEXBOX_PADDING;

    for flex_layer in &canvas.flex_layers {
        let laid_out: Vec<WidgetId> = flex_layer
            .children
            .iter()
            .filter(|c| {
                snapshot
                    .tree
                    .get(&c.id)
                    .is_some_and(|w| !w.detach_from_layout)
            })
            .map(|c| c.id)
            .collect();
        let is_empty = laid_out.iter().all(|id| dragged.contains(id));

        let layer = LayerContext {
            layer_index,
            offset_top,
            child_count,
        };
        let payload = generate_vertical_highlights(snapshot, &layer, flex_layer, dragged);

        if !is_empty {
            highlights.extend(generate_horizontal_highlights(
                snapshot,
                child_count,
                layer_index,
                band_top,
            ));
            highlights.extend(payload.highlights);

            let height = layer_height_px(snapshot.tree, laid_out, snapshot.is_mobile);
            band_top = offset_top + height;
            offset_top = band_top + ROW_GAP;
            layer_index += 1;
        }
        child_count += payload.child_count;
    }

    highlights.extend(generate_horizontal_highlights(
        snapshot,
        child_count,
        layer_index,
        band_top,
    ));

    tracing::trace!(
        "canvas {}: {} highlights over {} layers, {} children",
        snapshot.canvas_id,
        highlights.len(),
        layer_index,
        child_count
    );

    HighlightsPayload {
        highlights,
        child_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autolayout::{LayerChild, ResponsiveBehavior, WidgetPosition};
    use crate::widget::{GridBox, Widget, WidgetKind};

    const CANVAS: WidgetId = WidgetId::new(1);

    fn id(n: u64) -> WidgetId {
        WidgetId::new(n)
    }

    fn canvas(layers: Vec<Vec<(u64, FlexLayerAlignment)>>) -> Widget {
        let mut w = Widget::new(CANVAS, WidgetKind::Canvas);
        w.desktop = GridBox::new(0.0, 70.0, 0.0, 64.0);
        w.mobile = GridBox::new(0.0, 70.0, 0.0, 640.0);
        w.parent_row_space = 1.0;
        w.responsive_behavior = ResponsiveBehavior::Fill;
        w.flex_layers = layers
            .into_iter()
            .map(|children| FlexLayer {
                children: children
                    .into_iter()
                    .map(|(n, align)| LayerChild { id: id(n), align })
                    .collect(),
            })
            .collect();
        w.children = w
            .flex_layers
            .iter()
            .flat_map(|l| l.children.iter().map(|c| c.id))
            .collect();
        w
    }

    fn button(n: u64, desktop: GridBox, mobile: GridBox) -> Widget {
        let mut w = Widget::new(id(n), WidgetKind::Button);
        w.parent_id = Some(CANVAS);
        w.desktop = desktop;
        w.mobile = mobile;
        w.parent_row_space = 10.0;
        w.parent_column_space = 10.0;
        w
    }

    fn tree(widgets: Vec<Widget>) -> WidgetTree {
        widgets.into_iter().map(|w| (w.id, w)).collect()
    }

    fn positions(entries: &[(u64, WidgetPosition)]) -> WidgetPositions {
        entries.iter().map(|&(n, p)| (id(n), p)).collect()
    }

    fn snapshot<'a>(
        tree: &'a WidgetTree,
        positions: &'a WidgetPositions,
        canvas_width: f32,
        is_mobile: bool,
    ) -> CanvasSnapshot<'a> {
        CanvasSnapshot {
            tree,
            positions,
            canvas_id: CANVAS,
            canvas_offset: Pos2::ZERO,
            canvas_width,
            is_mobile,
        }
    }

    fn start_layer(ids: &[u64]) -> Vec<(u64, FlexLayerAlignment)> {
        ids.iter().map(|&n| (n, FlexLayerAlignment::Start)).collect()
    }

    /// Two start-aligned buttons side by side: 16 and 10 columns wide.
    fn side_by_side() -> (WidgetTree, WidgetPositions) {
        let tree = tree(vec![
            canvas(vec![start_layer(&[2, 3])]),
            button(
                2,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(0.0, 4.0, 0.0, 16.0),
            ),
            button(
                3,
                GridBox::new(0.0, 6.0, 16.0, 26.0),
                GridBox::new(0.0, 6.0, 16.0, 26.0),
            ),
        ]);
        let positions = positions(&[
            (2, WidgetPosition::new(0.0, 0.0, 160.0, 40.0)),
            (3, WidgetPosition::new(160.0, 0.0, 100.0, 60.0)),
        ]);
        (tree, positions)
    }

    #[test]
    fn test_empty_canvas_gets_one_band() {
        let tree = tree(vec![canvas(vec![])]);
        let positions = WidgetPositions::new();
        let payload = derive_highlights_from_layers(&snapshot(&tree, &positions, 632.0, false), &[]);

        let hl = &payload.highlights;
        assert_eq!(hl.len(), 3);
        assert_eq!(payload.child_count, 0);
        assert!(hl.iter().all(|h| !h.is_vertical && h.is_new_layer));
        assert_eq!(hl[0].width.round(), 211.0);
        assert_eq!(hl[0].height, DEFAULT_HIGHLIGHT_SIZE);
        assert_eq!(hl[0].pos_y, FLEXBOX_PADDING);
        assert_eq!(hl[1].pos_x.round(), 215.0);
        assert_eq!(hl[2].pos_x.round(), 425.0);
        assert_eq!(
            hl.iter().map(|h| h.alignment).collect::<Vec<_>>(),
            FlexLayerAlignment::ALL
        );
    }

    #[test]
    fn test_bands_above_every_layer_and_below_last() {
        let tree = tree(vec![
            canvas(vec![start_layer(&[2])]),
            button(
                2,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(0.0, 4.0, 0.0, 16.0),
            ),
        ]);
        let positions = positions(&[(2, WidgetPosition::new(0.0, 0.0, 160.0, 40.0))]);
        let payload = derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[]);

        let hl = &payload.highlights;
        assert_eq!(hl.len(), 10);
        assert_eq!(payload.child_count, 1);
        assert!(hl[..3].iter().all(|h| !h.is_vertical && h.is_new_layer));
        assert!(hl[3..7].iter().all(|h| h.is_vertical && !h.is_new_layer));
        assert!(hl[7..].iter().all(|h| !h.is_vertical && h.is_new_layer));

        assert_eq!(hl[0].pos_y, FLEXBOX_PADDING);
        // Bottom band sits at the layer's bottom: 4 rows of 10px.
        assert_eq!(hl[7].pos_y, FLEXBOX_PADDING + 40.0);

        assert_eq!(hl[0].layer_index, 0);
        assert_eq!(hl[3].layer_index, 0);
        assert_eq!(hl[7].layer_index, 1);
        assert_eq!(hl[0].index, 0);
        assert_eq!(hl[7].index, 1);

        // Start run: before and after the button; empty center and end slots.
        assert_eq!(hl[3].alignment, FlexLayerAlignment::Start);
        assert_eq!(hl[4].alignment, FlexLayerAlignment::Start);
        assert_eq!(hl[5].alignment, FlexLayerAlignment::Center);
        assert_eq!(hl[6].alignment, FlexLayerAlignment::End);
        assert_eq!(hl[5].pos_x, (640.0 - DEFAULT_HIGHLIGHT_SIZE) / 2.0);
        assert_eq!(hl[6].pos_x, 640.0 - DEFAULT_HIGHLIGHT_SIZE);
        assert_eq!(hl[5].height, 40.0);
    }

    #[test]
    fn test_alignment_slots_before_each_child_and_after_last() {
        let tree = tree(vec![]);
        let positions = positions(&[(2, WidgetPosition::new(0.0, 0.0, 160.0, 40.0))]);
        let snap = snapshot(&tree, &positions, 640.0, false);
        let children = [id(2)];
        let run = AlignmentRun {
            children: &children,
            alignment: FlexLayerAlignment::Start,
            first_index: 0,
            max_height: 40.0,
            avoid_initial_highlight: false,
        };
        let layer = LayerContext {
            offset_top: 4.0,
            ..Default::default()
        };
        let result = generate_highlights_for_alignment(&snap, &layer, &run);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].pos_x, -DEFAULT_HIGHLIGHT_SIZE);
        assert_eq!(result[0].pos_y, 0.0);
        assert_eq!(result[0].width, DEFAULT_HIGHLIGHT_SIZE);
        assert_eq!(result[0].height, 40.0);

        // 16 columns at 10px.
        assert_eq!(result[1].pos_x, 160.0);
        assert!(!result[1].is_new_layer);
        assert!(result[1].is_vertical);
        assert_eq!(result[1].layer_index, 0);
        assert_eq!(result[1].row_index, 1);
        assert_eq!(result[1].index, 1);
    }

    #[test]
    fn test_slots_as_tall_as_tallest_child() {
        let tree = tree(vec![]);
        let positions = positions(&[
            (2, WidgetPosition::new(0.0, 0.0, 160.0, 40.0)),
            (3, WidgetPosition::new(0.0, 0.0, 160.0, 60.0)),
        ]);
        let snap = snapshot(&tree, &positions, 640.0, false);
        let children = [id(2), id(3)];
        let run = AlignmentRun {
            children: &children,
            alignment: FlexLayerAlignment::Start,
            first_index: 0,
            max_height: 60.0,
            avoid_initial_highlight: false,
        };
        let result = generate_highlights_for_alignment(&snap, &LayerContext::default(), &run);

        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|h| h.height == 60.0));
    }

    #[test]
    fn test_avoided_empty_run_has_no_slots() {
        let tree = tree(vec![]);
        let positions = WidgetPositions::new();
        let snap = snapshot(&tree, &positions, 640.0, false);
        let run = AlignmentRun {
            children: &[],
            alignment: FlexLayerAlignment::Start,
            first_index: 0,
            max_height: 40.0,
            avoid_initial_highlight: true,
        };
        let layer = LayerContext {
            offset_top: 4.0,
            ..Default::default()
        };
        assert!(generate_highlights_for_alignment(&snap, &layer, &run).is_empty());
    }

    #[test]
    fn test_avoid_initial_skips_first_leading_slot() {
        let tree = tree(vec![]);
        let positions = positions(&[
            (2, WidgetPosition::new(0.0, 0.0, 160.0, 40.0)),
            (3, WidgetPosition::new(160.0, 0.0, 100.0, 40.0)),
        ]);
        let snap = snapshot(&tree, &positions, 640.0, false);
        let children = [id(2), id(3)];
        let run = AlignmentRun {
            children: &children,
            alignment: FlexLayerAlignment::Start,
            first_index: 5,
            max_height: 40.0,
            avoid_initial_highlight: true,
        };
        let result = generate_highlights_for_alignment(&snap, &LayerContext::default(), &run);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].row_index, 1);
        assert_eq!(result[0].index, 6);
        assert_eq!(result[0].pos_x, 156.0);
        assert_eq!(result[1].pos_x, 260.0);
    }

    #[test]
    fn test_encroached_empty_center_has_no_slot() {
        let (tree, positions) = side_by_side();
        let layer = tree[&CANVAS].flex_layers[0].clone();
        let ctx = LayerContext {
            offset_top: 4.0,
            ..Default::default()
        };
        let result =
            generate_vertical_highlights(&snapshot(&tree, &positions, 640.0, false), &ctx, &layer, &[]);

        // 26 start columns reach into the center third; end is still free.
        assert_eq!(result.highlights.len(), 4);
        assert_eq!(result.child_count, 2);
        assert!(
            result
                .highlights
                .iter()
                .all(|h| h.alignment != FlexLayerAlignment::Center)
        );
        assert_eq!(result.highlights[3].alignment, FlexLayerAlignment::End);
        assert_eq!(result.highlights[3].height, 60.0);
    }

    #[test]
    fn test_wrapped_run_slots_follow_rows() {
        let mut input = button(
            3,
            GridBox::new(0.0, 6.0, 16.0, 64.0),
            GridBox::new(4.0, 10.0, 0.0, 64.0),
        );
        input.kind = WidgetKind::Input;
        input.responsive_behavior = ResponsiveBehavior::Fill;
        let tree = tree(vec![
            canvas(vec![start_layer(&[2, 3])]),
            button(
                2,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(0.0, 4.0, 0.0, 16.0),
            ),
            input,
        ]);
        let positions = positions(&[
            (2, WidgetPosition::new(0.0, 0.0, 158.0, 40.0)),
            (3, WidgetPosition::new(0.0, 40.0, 632.0, 60.0)),
        ]);
        let layer = tree[&CANVAS].flex_layers[0].clone();
        let result = generate_vertical_highlights(
            &snapshot(&tree, &positions, 632.0, true),
            &LayerContext::default(),
            &layer,
            &[],
        );

        let hl = &result.highlights;
        assert_eq!(hl.len(), 3);
        assert_eq!(result.child_count, 2);

        assert_eq!(hl[0].pos_y, 0.0);
        assert_eq!(hl[0].height, 40.0);
        // The input wrapped onto its own row: 4 mobile rows of 10px down.
        assert_eq!(hl[1].pos_y, 40.0);
        assert_eq!(hl[1].height, 60.0);
        assert_eq!(hl[2].pos_x, 632.0);
        assert_eq!(hl[2].pos_y, 40.0);

        // Nothing in the wrapped row lands inside the first row's band.
        assert!(hl[1..].iter().all(|h| h.pos_y >= hl[0].pos_y + hl[0].height));
    }

    #[test]
    fn test_unmeasured_child_keeps_wrapped_row_in_place() {
        let mut input = button(
            3,
            GridBox::new(0.0, 6.0, 16.0, 64.0),
            GridBox::new(4.0, 10.0, 0.0, 64.0),
        );
        input.kind = WidgetKind::Input;
        let tree = tree(vec![
            canvas(vec![start_layer(&[2, 3, 4])]),
            button(
                2,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(0.0, 4.0, 0.0, 16.0),
            ),
            input,
            button(
                4,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(10.0, 14.0, 0.0, 16.0),
            ),
        ]);
        // Widget 4 has not been rendered yet.
        let positions = positions(&[
            (2, WidgetPosition::new(0.0, 0.0, 158.0, 40.0)),
            (3, WidgetPosition::new(0.0, 40.0, 632.0, 60.0)),
        ]);
        let layer = tree[&CANVAS].flex_layers[0].clone();
        let hl = generate_vertical_highlights(
            &snapshot(&tree, &positions, 632.0, true),
            &LayerContext::default(),
            &layer,
            &[],
        )
        .highlights;

        assert_eq!(hl.len(), 4);
        assert!(hl[1..].iter().all(|h| h.pos_y == 40.0 && h.height == 60.0));
        assert_eq!(hl[3].pos_x, 632.0);
    }

    #[test]
    fn test_dragged_widget_empties_its_layer() {
        let tree = tree(vec![
            canvas(vec![start_layer(&[2])]),
            button(
                2,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(0.0, 4.0, 0.0, 16.0),
            ),
        ]);
        let positions = positions(&[(2, WidgetPosition::new(0.0, 0.0, 160.0, 40.0))]);
        let payload =
            derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[id(2)]);

        assert_eq!(payload.highlights.len(), 3);
        assert_eq!(payload.child_count, 1);
        assert_eq!(payload.highlights[0].pos_y, FLEXBOX_PADDING);
        assert_eq!(payload.highlights[0].layer_index, 0);
    }

    #[test]
    fn test_dragged_sibling_gets_no_slot() {
        let (tree, positions) = side_by_side();
        let payload =
            derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[id(3)]);

        assert_eq!(payload.child_count, 2);
        let verticals: Vec<_> = payload.highlights.iter().filter(|h| h.is_vertical).collect();
        // Start: before and after button 2; 16 columns leave center and end open.
        assert_eq!(verticals.len(), 4);
        assert_eq!(verticals[1].pos_x, 160.0);
        assert_eq!(verticals[0].height, 40.0);
    }

    #[test]
    fn test_layers_are_ordered_top_to_bottom() {
        let tree = tree(vec![
            canvas(vec![start_layer(&[2]), start_layer(&[3])]),
            button(
                2,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(0.0, 4.0, 0.0, 16.0),
            ),
            button(
                3,
                GridBox::new(5.2, 11.2, 0.0, 16.0),
                GridBox::new(5.2, 11.2, 0.0, 16.0),
            ),
        ]);
        let positions = positions(&[
            (2, WidgetPosition::new(0.0, 4.0, 160.0, 40.0)),
            (3, WidgetPosition::new(0.0, 56.0, 160.0, 60.0)),
        ]);
        let payload = derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[]);
        let hl = &payload.highlights;

        // band + 4 verticals per layer, then the closing band
        assert_eq!(hl.len(), 3 + 4 + 3 + 4 + 3);
        assert_eq!(payload.child_count, 2);

        let bands: Vec<&Highlight> = hl.iter().filter(|h| h.is_new_layer).collect();
        assert_eq!(bands[3].pos_y, FLEXBOX_PADDING + 40.0);
        assert_eq!(bands[3].layer_index, 1);
        assert_eq!(bands[3].index, 1);
        assert_eq!(bands[6].layer_index, 2);
        assert_eq!(bands[6].index, 2);

        for pair in bands.windows(2) {
            assert!(pair[0].pos_y <= pair[1].pos_y);
        }
        let second_layer: Vec<_> = hl.iter().filter(|h| h.is_vertical && h.layer_index == 1).collect();
        assert_eq!(second_layer.len(), 4);
        assert_eq!(second_layer[0].index, 1);
        assert_eq!(second_layer[0].pos_y, 56.0);
    }

    #[test]
    fn test_n_children_give_n_plus_one_slots() {
        let ids: Vec<u64> = (2..7).collect();
        let mut widgets = vec![canvas(vec![start_layer(&ids)])];
        let mut entries = Vec::new();
        for (i, &n) in ids.iter().enumerate() {
            let left = i as f32 * 4.0;
            widgets.push(button(
                n,
                GridBox::new(0.0, 4.0, left, left + 4.0),
                GridBox::new(0.0, 4.0, left, left + 4.0),
            ));
            entries.push((n, WidgetPosition::new(left * 10.0, 0.0, 40.0, 40.0)));
        }
        let tree = tree(widgets);
        let positions = positions(&entries);
        let payload = derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[]);

        let start: Vec<_> = payload
            .highlights
            .iter()
            .filter(|h| h.is_vertical && h.alignment == FlexLayerAlignment::Start)
            .collect();
        assert_eq!(start.len(), ids.len() + 1);
        for pair in start.windows(2) {
            assert!(pair[0].pos_x < pair[1].pos_x);
            assert_eq!(pair[0].index + 1, pair[1].index);
        }
    }

    #[test]
    fn test_detached_and_dangling_children_are_skipped() {
        let mut modal = Widget::new(id(4), WidgetKind::Modal);
        modal.parent_id = Some(CANVAS);
        let tree = tree(vec![
            canvas(vec![vec![
                (2, FlexLayerAlignment::Start),
                (4, FlexLayerAlignment::Center),
                (99, FlexLayerAlignment::End),
            ]]),
            button(
                2,
                GridBox::new(0.0, 4.0, 0.0, 16.0),
                GridBox::new(0.0, 4.0, 0.0, 16.0),
            ),
            modal,
        ]);
        let positions = positions(&[(2, WidgetPosition::new(0.0, 0.0, 160.0, 40.0))]);
        let payload = derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[]);

        assert_eq!(payload.child_count, 1);
        assert_eq!(payload.highlights.len(), 10);
    }

    #[test]
    fn test_missing_positions_read_as_empty() {
        let (tree, _) = side_by_side();
        let positions = WidgetPositions::new();
        let payload = derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[]);

        assert_eq!(payload.child_count, 2);
        let verticals: Vec<_> = payload.highlights.iter().filter(|h| h.is_vertical).collect();
        // 3 start slots; 26 columns still suppress the empty center.
        assert_eq!(verticals.len(), 4);
        assert!(verticals[..3].iter().all(|h| h.height == 0.0 && h.pos_y == 0.0));
    }

    #[test]
    fn test_unknown_canvas_yields_nothing() {
        let tree = tree(vec![]);
        let positions = WidgetPositions::new();
        let payload = derive_highlights_from_layers(&snapshot(&tree, &positions, 640.0, false), &[]);
        assert_eq!(payload, HighlightsPayload::default());
    }

    #[test]
    fn test_same_snapshot_same_highlights() {
        let (tree, positions) = side_by_side();
        let snap = snapshot(&tree, &positions, 640.0, false);
        let first = derive_highlights_from_layers(&snap, &[]);
        let second = derive_highlights_from_layers(&snap, &[]);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.highlights).unwrap(),
            serde_json::to_string(&second.highlights).unwrap()
        );
    }

    #[test]
    fn test_canvas_offset_is_subtracted() {
        let (tree, mut positions) = side_by_side();
        for p in positions.values_mut() {
            p.left += 100.0;
            p.top += 50.0;
        }
        let mut snap = snapshot(&tree, &positions, 640.0, false);
        snap.canvas_offset = Pos2::new(100.0, 50.0);
        let payload = derive_highlights_from_layers(&snap, &[]);
        let first_vertical = payload.highlights.iter().find(|h| h.is_vertical).unwrap();
        assert_eq!(first_vertical.pos_x, -DEFAULT_HIGHLIGHT_SIZE);
        assert_eq!(first_vertical.pos_y, 0.0);
    }

    #[test]
    fn test_wrapped_rows_grouping() {
        let rects = [
            Rect::from_min_size(Pos2::new(0.0, 0.0), egui::vec2(10.0, 40.0)),
            Rect::from_min_size(Pos2::new(10.0, 10.0), egui::vec2(10.0, 20.0)),
            Rect::from_min_size(Pos2::new(0.0, 40.0), egui::vec2(10.0, 20.0)),
            Rect::from_min_size(Pos2::new(0.0, 60.0), egui::vec2(10.0, 20.0)),
        ];
        assert_eq!(wrapped_rows(&rects), vec![(0, 2), (2, 3), (3, 4)]);
        assert!(wrapped_rows(&[]).is_empty());

        let with_unmeasured = [rects[0], rects[2], Rect::ZERO, rects[3]];
        assert_eq!(wrapped_rows(&with_unmeasured), vec![(0, 1), (1, 3), (3, 4)]);
    }
}
