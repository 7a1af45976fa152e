use crate::{
    autolayout::{GRID_ROW_HEIGHT, Highlight, ResponsiveBehavior, select_highlight},
    project::Project,
    widget::{WidgetId, WidgetKind},
};
use egui::{Align2, Color32, CornerRadius, FontId, Id, Pos2, Rect, Sense, Stroke, Vec2, vec2};
use std::path::PathBuf;

/// Canvas area below the last layer that still accepts drops.
const MIN_CANVAS_HEIGHT: f32 = 480.0;
/// How far outside the canvas a release still counts as a drop.
const DROP_MARGIN: f32 = 24.0;

const HIGHLIGHT_COLOR: Color32 = Color32::from_rgb(100, 160, 255);

/// What the pointer is carrying.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DragSource {
    /// A new widget pulled from the palette.
    Palette(WidgetKind),
    /// A widget already on the canvas.
    Canvas(WidgetId),
}

pub struct PreviewApp {
    palette_open: bool,
    project: Project,
    selected: Option<WidgetId>,
    dragging: Option<DragSource>,
    /// Current project file path (for Save)
    current_file: Option<PathBuf>,
    /// Error/status message to display
    status_message: Option<(String, std::time::Instant)>,
    /// Show highlights even when nothing is being dragged
    show_highlights: bool,
    show_drop_zones: bool,
    last_highlight_count: usize,
}

impl Default for PreviewApp {
    fn default() -> Self {
        Self {
            palette_open: true,
            project: Project::default(),
            selected: None,
            dragging: None,
            current_file: None,
            status_message: None,
            show_highlights: false,
            show_drop_zones: false,
            last_highlight_count: 0,
        }
    }
}

impl PreviewApp {
    pub fn with_file(path: PathBuf) -> Self {
        let mut app = Self::default();
        app.load_project(path);
        app
    }

    pub fn canvas_width(&self) -> f32 {
        self.project.canvas_width
    }

    fn save_project(&mut self, path: PathBuf) {
        match self.project.save(&path) {
            Ok(()) => {
                self.set_status(format!("Saved to {}", path.display()));
                self.current_file = Some(path);
            }
            Err(e) => {
                tracing::error!("{e}");
                self.set_status(format!("Save failed: {e}"));
            }
        }
    }

    fn load_project(&mut self, path: PathBuf) {
        match Project::load(&path) {
            Ok(mut project) => {
                project.layout();
                self.project = project;
                self.selected = None;
                self.dragging = None;
                self.set_status(format!("Loaded {}", path.display()));
                self.current_file = Some(path);
            }
            Err(e) => {
                tracing::error!("{e}");
                self.set_status(format!("Load failed: {e}"));
            }
        }
    }

    /// Set a status message that will auto-clear after a few seconds
    fn set_status(&mut self, msg: String) {
        self.status_message = Some((msg, std::time::Instant::now()));
    }

    fn delete_widget(&mut self, id: WidgetId) {
        if let Err(e) = self.project.remove_widget(id) {
            tracing::warn!("{e}");
            self.set_status(e.to_string());
        }
    }

    fn drop_at(&mut self, source: DragSource, target: &Highlight) {
        let id = match source {
            DragSource::Palette(kind) => self.project.add_widget(kind),
            DragSource::Canvas(id) => id,
        };
        if self
            .project
            .widgets
            .get(&id)
            .is_some_and(|w| w.detach_from_layout)
        {
            // Overlays never enter a layer.
            self.project.layout();
            self.selected = Some(id);
            return;
        }
        match self.project.commit_drop(id, target) {
            Ok(()) => self.selected = Some(id),
            Err(e) => {
                tracing::error!("{e}");
                self.set_status(format!("Drop failed: {e}"));
            }
        }
    }

    fn canvas_ui(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let content_height = self
                .project
                .positions
                .get(&self.project.canvas_id)
                .map_or(0.0, |p| p.height);
            let size = vec2(
                self.project.canvas_width,
                content_height.max(MIN_CANVAS_HEIGHT),
            );
            let (resp, painter) = ui.allocate_painter(size, Sense::click());
            let canvas = resp.rect;
            // page coordinates -> screen coordinates
            let to_screen = canvas.min - self.project.canvas_offset;

            painter.rect_filled(canvas, 0.0, Color32::from_gray(24));
            painter.rect_stroke(
                canvas,
                CornerRadius::ZERO,
                Stroke::new(1.0, Color32::from_gray(60)),
                egui::StrokeKind::Inside,
            );

            let dragged_id = match self.dragging {
                Some(DragSource::Canvas(id)) => Some(id),
                _ => None,
            };
            let ids: Vec<WidgetId> = self
                .project
                .positions
                .keys()
                .copied()
                .filter(|id| *id != self.project.canvas_id)
                .collect();
            for id in ids {
                self.draw_widget(ui, id, to_screen, dragged_id == Some(id));
            }

            let pointer = ui.ctx().pointer_interact_pos();
            let mut target = None;
            if self.dragging.is_some() || self.show_highlights {
                let dragged: Vec<WidgetId> = dragged_id.into_iter().collect();
                let payload = self.project.highlights(&dragged);
                self.last_highlight_count = payload.highlights.len();

                if self.dragging.is_some()
                    && let Some(p) = pointer
                    && canvas.expand(DROP_MARGIN).contains(p)
                {
                    target = select_highlight(&payload.highlights, (p - canvas.min).to_pos2())
                        .cloned();
                }
                self.paint_highlights(ui, canvas.min, &payload.highlights, target.as_ref());
            }

            if let (Some(DragSource::Palette(kind)), Some(mouse)) = (self.dragging, pointer) {
                let ghost_size = kind.default_size()
                    * vec2(self.project.column_space(), GRID_ROW_HEIGHT);
                let ghost = Rect::from_center_size(mouse, ghost_size);
                let layer = egui::LayerId::new(egui::Order::Tooltip, Id::new("ghost"));
                let painter = ui.ctx().layer_painter(layer);
                painter.rect_filled(ghost, 4.0, Color32::from_gray(40));
                painter.rect_stroke(
                    ghost,
                    CornerRadius::same(4),
                    Stroke::new(1.0, Color32::LIGHT_BLUE),
                    egui::StrokeKind::Outside,
                );
            }

            if self.dragging.is_some() && ui.input(|i| i.pointer.any_released()) {
                if let Some(source) = self.dragging.take()
                    && let Some(hl) = target
                {
                    self.drop_at(source, &hl);
                }
            }

            if resp.clicked() {
                self.selected = None;
            }
        });
    }

    fn paint_highlights(
        &self,
        ui: &egui::Ui,
        origin: Pos2,
        highlights: &[Highlight],
        target: Option<&Highlight>,
    ) {
        let painter = ui.painter();
        let offset = origin.to_vec2();
        for h in highlights {
            let rect = h.rect().translate(offset);
            let color = if Some(h) == target {
                HIGHLIGHT_COLOR
            } else {
                HIGHLIGHT_COLOR.gamma_multiply(0.3)
            };
            painter.rect_filled(rect, 1.0, color);
            if self.show_drop_zones {
                painter.rect_stroke(
                    h.drop_rect().translate(offset),
                    CornerRadius::ZERO,
                    Stroke::new(1.0, HIGHLIGHT_COLOR.gamma_multiply(0.2)),
                    egui::StrokeKind::Inside,
                );
            }
        }
    }

    fn draw_widget(&mut self, ui: &mut egui::Ui, id: WidgetId, to_screen: Vec2, ghosted: bool) {
        let Some(pos) = self.project.positions.get(&id).copied() else {
            return;
        };
        let Some((kind, detached)) = self
            .project
            .widgets
            .get(&id)
            .map(|w| (w.kind, w.detach_from_layout))
        else {
            return;
        };
        let rect = pos.rect().translate(to_screen);

        let fill = if ghosted {
            Color32::from_gray(32)
        } else {
            kind_color(kind)
        };
        let painter = ui.painter();
        painter.rect_filled(rect, 4.0, fill);
        if self.selected == Some(id) {
            painter.rect_stroke(
                rect,
                CornerRadius::same(4),
                Stroke::new(2.0, HIGHLIGHT_COLOR),
                egui::StrokeKind::Outside,
            );
        }
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            format!("{} {}", kind.display_name(), id),
            FontId::proportional(12.0),
            Color32::WHITE,
        );

        let resp = ui.interact(
            rect,
            ui.make_persistent_id(("widget", id)),
            Sense::click_and_drag(),
        );
        if resp.hovered() && !detached {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
        }
        if resp.clicked() {
            self.selected = Some(id);
        }
        if resp.drag_started() && !detached {
            self.selected = Some(id);
            self.dragging = Some(DragSource::Canvas(id));
        }
    }

    fn palette_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Palette");
        ui.separator();
        ui.label("Drag any widget onto the canvas");
        ui.add_space(4.0);
        for kind in WidgetKind::PALETTE {
            let r = ui.add(egui::Button::new(kind.display_name()).sense(Sense::drag()));
            if r.drag_started() {
                self.dragging = Some(DragSource::Palette(kind));
            }
        }
        ui.add_space(8.0);
        ui.separator();
        egui::CollapsingHeader::new("Shortcuts")
            .default_open(false)
            .show(ui, |ui| {
                ui.small("Delete: remove selected");
                ui.small("Esc: cancel drag");
                ui.small("F2: toggle mobile");
            });
    }

    fn inspector_ui(&mut self, ui: &mut egui::Ui) {
        ui.heading("Inspector");
        ui.separator();
        let is_mobile = self.project.is_mobile;
        let Some(id) = self.selected else {
            ui.label("Select a widget");
            return;
        };
        let mut relayout = false;
        let mut delete = false;
        if let Some(w) = self.project.widgets.get_mut(&id) {
            ui.label(format!("ID: {}", w.id));
            ui.label(format!("Kind: {}", w.kind.display_name()));
            ui.label(format!("Alignment: {}", w.alignment.display_name()));
            ui.add_space(6.0);

            ui.horizontal(|ui| {
                ui.label("Behavior");
                relayout |= ui
                    .selectable_value(&mut w.responsive_behavior, ResponsiveBehavior::Hug, "Hug")
                    .changed();
                relayout |= ui
                    .selectable_value(&mut w.responsive_behavior, ResponsiveBehavior::Fill, "Fill")
                    .changed();
            });

            let grid = w.grid_mut(is_mobile);
            let mut columns = grid.columns();
            let mut rows = grid.rows();
            ui.horizontal(|ui| {
                ui.label("Columns");
                if ui
                    .add(egui::DragValue::new(&mut columns).range(1.0..=64.0))
                    .changed()
                {
                    grid.right_column = grid.left_column + columns;
                    relayout = true;
                }
            });
            ui.horizontal(|ui| {
                ui.label("Rows");
                if ui
                    .add(egui::DragValue::new(&mut rows).range(1.0..=100.0))
                    .changed()
                {
                    grid.bottom_row = grid.top_row + rows;
                    relayout = true;
                }
            });
            ui.label(format!(
                "Grid: rows {:.1}..{:.1}, cols {:.1}..{:.1}",
                grid.top_row, grid.bottom_row, grid.left_column, grid.right_column
            ));

            ui.add_space(6.0);
            if let Some(p) = self.project.positions.get(&id) {
                ui.label(format!(
                    "Pixels: {:.0},{:.0} {:.0}×{:.0}",
                    p.left, p.top, p.width, p.height
                ));
            }
            ui.add_space(6.0);
            delete = ui.button("Delete").clicked();
        }
        if delete {
            self.selected = None;
            self.delete_widget(id);
        } else if relayout {
            self.project.layout();
        }
    }

    fn top_bar(&mut self, ui: &mut egui::Ui) {
        // Show status message if recent
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed().as_secs() < 3 {
                ui.horizontal(|ui| {
                    ui.label(msg);
                });
            } else {
                self.status_message = None;
            }
        }

        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui
                    .button("New Canvas")
                    .on_hover_text("Start from an empty canvas")
                    .clicked()
                {
                    let width = self.project.canvas_width;
                    self.project = Project::new(width);
                    self.project.layout();
                    self.selected = None;
                    self.current_file = None;
                    self.set_status("New canvas created".into());
                    ui.close_kind(egui::UiKind::Menu);
                }
                if ui
                    .button("Sample Canvas")
                    .on_hover_text("Load the built-in sample layers")
                    .clicked()
                {
                    self.project = Project::default();
                    self.selected = None;
                    self.current_file = None;
                    ui.close_kind(egui::UiKind::Menu);
                }
                ui.separator();
                if ui.button("Open...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Canvas snapshot", &["json"])
                        .pick_file()
                    {
                        self.load_project(path);
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
                if ui.button("Save").clicked() {
                    if let Some(path) = self.current_file.clone() {
                        self.save_project(path);
                    } else if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Canvas snapshot", &["json"])
                        .set_file_name("canvas.json")
                        .save_file()
                    {
                        self.save_project(path);
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
                if ui.button("Save As...").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("Canvas snapshot", &["json"])
                        .set_file_name("canvas.json")
                        .save_file()
                    {
                        self.save_project(path);
                    }
                    ui.close_kind(egui::UiKind::Menu);
                }
            });

            ui.menu_button("View", |ui| {
                ui.checkbox(&mut self.palette_open, "Show Palette");
                ui.checkbox(&mut self.show_highlights, "Always Show Highlights");
                ui.checkbox(&mut self.show_drop_zones, "Show Drop Zones");
            });

            ui.menu_button("Settings", |ui| {
                let mut relayout = false;
                ui.horizontal(|ui| {
                    ui.label("Canvas width");
                    relayout |= ui
                        .add(egui::DragValue::new(&mut self.project.canvas_width).range(160.0..=1920.0))
                        .changed();
                });
                relayout |= ui
                    .checkbox(&mut self.project.is_mobile, "Mobile breakpoint (F2)")
                    .changed();
                if relayout {
                    self.project.layout();
                }
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let mode = if self.project.is_mobile { "Mobile" } else { "Desktop" };
                ui.label(format!("{} · {:.0}px", mode, self.project.canvas_width));
                if self.dragging.is_some() || self.show_highlights {
                    ui.separator();
                    ui.label(format!("{} highlights", self.last_highlight_count));
                }
                ui.separator();
                ui.strong("Auto-layout Highlight Preview");
            });
        });
    }
}

fn kind_color(kind: WidgetKind) -> Color32 {
    match kind {
        WidgetKind::Button => Color32::from_rgb(70, 110, 170),
        WidgetKind::Text => Color32::from_rgb(90, 90, 90),
        WidgetKind::Input => Color32::from_rgb(60, 130, 100),
        WidgetKind::Checkbox => Color32::from_rgb(130, 100, 60),
        WidgetKind::Image => Color32::from_rgb(120, 70, 130),
        WidgetKind::Container | WidgetKind::Canvas => Color32::from_rgb(60, 60, 80),
        WidgetKind::Modal => Color32::from_rgba_unmultiplied(150, 60, 60, 200),
    }
}

impl eframe::App for PreviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let (delete_pressed, cancel_pressed, toggle_mobile) = ctx.input(|i| {
            let del = i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace);
            (del, i.key_pressed(egui::Key::Escape), i.key_pressed(egui::Key::F2))
        });

        if cancel_pressed {
            self.dragging = None;
        }
        if delete_pressed
            && !ctx.wants_keyboard_input()
            && let Some(id) = self.selected.take()
        {
            self.delete_widget(id);
        }
        if toggle_mobile {
            self.project.is_mobile = !self.project.is_mobile;
            self.project.layout();
        }

        egui::TopBottomPanel::top("menubar").show(ctx, |ui| self.top_bar(ui));
        if self.palette_open {
            egui::SidePanel::left("palette")
                .resizable(true)
                .default_width(160.0)
                .show(ctx, |ui| {
                    self.palette_ui(ui);
                });
        }
        egui::SidePanel::right("inspector")
            .default_width(240.0)
            .show(ctx, |ui| self.inspector_ui(ui));

        self.canvas_ui(ctx);

        if self.dragging.is_some() {
            ctx.set_cursor_icon(egui::CursorIcon::Grabbing);
        }
    }
}
