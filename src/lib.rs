//! Drop-target highlights for flex-layer canvases, with an egui preview.
//!
//! [`autolayout`] holds the pure highlight engine. [`project`] wraps it in a
//! serializable canvas snapshot with a reference layout pass, and [`app`] is
//! the interactive preview built on top.

pub mod app;
pub mod autolayout;
pub mod project;
pub mod widget;
