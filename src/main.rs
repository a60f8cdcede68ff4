//! Image Resizer - A small desktop tool for resizing a single image
//!
//! The user picks an image and a target size; the resized copy is written
//! to `~/imageresizer` and the folder is opened afterwards.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod channel;
mod config;
mod file_ops;
mod menu;
mod resizer;
mod session;

use app::ImageResizerApp;
use config::RunMode;

pub const APP_NAME: &str = "Image Resizer";

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mode = RunMode::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(mode.main_window_size())
            .with_min_inner_size([400.0, 450.0])
            .with_title(APP_NAME),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Ok(Box::new(ImageResizerApp::new(cc, mode)))),
    )
}
