//! Interactive preview of auto-layout drop highlights.

use autolayout_builder::app::PreviewApp;
use eframe::egui;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn initial_inner_size(canvas_width: f32) -> egui::Vec2 {
    // Canvas plus right inspector (240) and left palette (160)
    let w = canvas_width + 240.0 + 160.0 + 32.0;
    let h = 560.0;
    egui::vec2(w, h)
}

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("autolayout_builder=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = match std::env::args().nth(1) {
        Some(path) => PreviewApp::with_file(PathBuf::from(path)),
        None => PreviewApp::default(),
    };

    let mut native_options = eframe::NativeOptions::default();
    let size = initial_inner_size(app.canvas_width());
    native_options.viewport = egui::ViewportBuilder::default()
        .with_inner_size(size)
        .with_resizable(true);

    tracing::info!("Starting preview at {:.0}px canvas", app.canvas_width());
    eframe::run_native(
        "Auto-layout Highlight Preview",
        native_options,
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
