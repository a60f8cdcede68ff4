//! GUI module - Application state and UI rendering
//!
//! This module contains the main application state and egui-based UI:
//! the resize form, the About viewport and the window lifecycle glue.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use rfd::FileDialog;
use uuid::Uuid;

use crate::channel::{ResizeChannel, ResizeReply};
use crate::config::{AppSettings, RunMode};
use crate::menu::{menu_template, show_menu_bar, Menu, MenuAction, Platform};
use crate::resizer::{
    destination_folder, is_supported_image, ResizeOrchestrator, ResizeRequest,
    SUPPORTED_EXTENSIONS,
};
use crate::session::{LifecycleAction, UiSession};
use crate::APP_NAME;

const ABOUT_TITLE: &str = "About Image Resizer";
const MAX_HISTORY: usize = 50;
const PREVIEW_MAX_HEIGHT: f32 = 180.0;

/// Contents of the resize form
#[derive(Default)]
struct MainForm {
    image_path: Option<PathBuf>,
    source_dimensions: Option<(u32, u32)>,
    width: String,
    height: String,
}

impl MainForm {
    fn from_settings(settings: &AppSettings) -> Self {
        Self {
            width: settings.last_width.clone(),
            height: settings.last_height.clone(),
            ..Default::default()
        }
    }
}

/// One finished request, shown newest first
struct HistoryEntry {
    at: DateTime<Local>,
    image_path: PathBuf,
    message: String,
    success: bool,
}

#[derive(Clone)]
enum MessageType {
    Info,
    Success,
    Error,
}

/// Application state
pub struct ImageResizerApp {
    mode: RunMode,
    menus: Vec<Menu>,
    session: UiSession,
    settings: AppSettings,
    form: MainForm,
    channel: ResizeChannel,
    in_flight: Vec<Uuid>,
    history: Vec<HistoryEntry>,
    status_message: Option<(String, MessageType)>,
    /// The main window was closed but the process kept running
    awaiting_reactivation: bool,
    allow_close: bool,
}

impl ImageResizerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, mode: RunMode) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let platform = Platform::current();
        let settings = AppSettings::load(cc.storage);
        let repaint_ctx = cc.egui_ctx.clone();
        let channel = ResizeChannel::spawn(
            ResizeOrchestrator::default(),
            destination_folder(),
            move || repaint_ctx.request_repaint(),
        );
        log::info!(
            "Starting in {:?} mode, writing to {}",
            mode,
            channel.destination_folder().display()
        );

        Self {
            mode,
            menus: menu_template(platform),
            session: UiSession::new(platform),
            form: MainForm::from_settings(&settings),
            settings,
            channel,
            in_flight: Vec::new(),
            history: Vec::new(),
            status_message: None,
            awaiting_reactivation: false,
            allow_close: false,
        }
    }

    fn pick_image(&mut self, ctx: &egui::Context) {
        let Some(path) = FileDialog::new()
            .add_filter("Images", SUPPORTED_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        if !is_supported_image(&path) {
            self.status_message = Some((
                format!(
                    "Please select an image ({}).",
                    SUPPORTED_EXTENSIONS.join(", ")
                ),
                MessageType::Error,
            ));
            return;
        }

        if let Some(previous) = self.form.image_path.take() {
            ctx.forget_image(&image_uri(&previous));
        }

        self.form.source_dimensions = match image::image_dimensions(&path) {
            Ok((w, h)) => {
                self.form.width = w.to_string();
                self.form.height = h.to_string();
                Some((w, h))
            }
            Err(e) => {
                log::warn!("Could not read dimensions of {}: {}", path.display(), e);
                None
            }
        };
        log::debug!("Selected {}", path.display());
        self.form.image_path = Some(path);
        self.status_message = None;
    }

    fn start_resize(&mut self) {
        let Some(path) = self.form.image_path.clone() else {
            self.status_message =
                Some(("Please select an image first.".to_string(), MessageType::Error));
            return;
        };

        let submitted = ResizeRequest::from_input(&path, &self.form.width, &self.form.height)
            .and_then(|request| self.channel.submit(request));

        match submitted {
            Ok(id) => {
                self.in_flight.push(id);
                self.settings.last_width = self.form.width.trim().to_string();
                self.settings.last_height = self.form.height.trim().to_string();
                self.status_message = Some((
                    format!("Resizing {}...", file_label(&path)),
                    MessageType::Info,
                ));
            }
            Err(e) => {
                log::warn!("Resize request refused: {}", e);
                self.status_message = Some((e.to_string(), MessageType::Error));
            }
        }
    }

    fn poll_replies(&mut self) {
        while let Some(reply) = self.channel.try_recv() {
            log::debug!("Reply for {} (done: {})", reply.id, reply.is_done());
            self.in_flight.retain(|id| *id != reply.id);
            self.handle_reply(reply);
        }
    }

    fn handle_reply(&mut self, reply: ResizeReply) {
        let (message, success) = match &reply.outcome {
            Ok(outcome) => {
                if self.settings.open_folder_after_resize {
                    let folder = self.channel.destination_folder();
                    if let Err(e) = open::that(folder) {
                        log::warn!("Failed to open {}: {}", folder.display(), e);
                    }
                }
                (
                    format!(
                        "Saved {}x{} ({}) to {}",
                        outcome.width,
                        outcome.height,
                        format_size(outcome.bytes_written as u64),
                        outcome.output_path.display()
                    ),
                    true,
                )
            }
            Err(e) => (e.to_string(), false),
        };

        self.status_message = Some((
            message.clone(),
            if success {
                MessageType::Success
            } else {
                MessageType::Error
            },
        ));
        self.history.insert(
            0,
            HistoryEntry {
                at: Local::now(),
                image_path: reply.image_path,
                message,
                success,
            },
        );
        self.history.truncate(MAX_HISTORY);
    }

    fn handle_menu_action(&mut self, ctx: &egui::Context, action: MenuAction) {
        match action {
            MenuAction::About => self.session.open_about(),
            MenuAction::CloseWindow => self.close_main(ctx),
            MenuAction::Quit => {
                self.allow_close = true;
                ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Close);
            }
        }
    }

    fn close_main(&mut self, ctx: &egui::Context) {
        match self.session.close_main() {
            LifecycleAction::Quit => {
                self.allow_close = true;
                ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Close);
            }
            LifecycleAction::KeepRunning => self.hide_main(ctx),
        }
    }

    fn hide_main(&mut self, ctx: &egui::Context) {
        // Stay in the dock on macOS, otherwise just get out of the way
        let hide = if Platform::current().keeps_running_without_windows() {
            egui::ViewportCommand::Minimized(true)
        } else {
            egui::ViewportCommand::Visible(false)
        };
        ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, hide);
        self.awaiting_reactivation = false;
    }

    fn handle_main_close_request(&mut self, ctx: &egui::Context) {
        if !ctx.input(|i| i.viewport().close_requested()) || self.allow_close {
            return;
        }
        ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
        if self.session.main_open() {
            self.close_main(ctx);
        } else {
            self.hide_main(ctx);
        }
    }

    /// Treat the hidden main window regaining focus as reactivation
    fn check_reactivation(&mut self, ctx: &egui::Context) {
        if self.session.main_open() {
            return;
        }
        let (focused, minimized) = ctx.input(|i| (i.viewport().focused, i.viewport().minimized));
        match focused {
            Some(false) => self.awaiting_reactivation = true,
            Some(true) if self.awaiting_reactivation && minimized != Some(true) => {
                if self.session.activate() {
                    self.recreate_main(ctx);
                } else {
                    // Restored while About is still open: same window, same form
                    self.session.reopen_main();
                    self.awaiting_reactivation = false;
                }
            }
            _ => {}
        }
    }

    fn recreate_main(&mut self, ctx: &egui::Context) {
        if let Some(previous) = self.form.image_path.take() {
            ctx.forget_image(&image_uri(&previous));
        }
        self.form = MainForm::from_settings(&self.settings);
        self.status_message = None;
        self.awaiting_reactivation = false;
        ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
        ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(false));
        ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
    }

    fn render_form(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.vertical_centered(|ui| {
            ui.heading(APP_NAME);
            ui.label("Choose an image to resize");
        });
        ui.separator();

        ui.horizontal(|ui| {
            if ui.button("Select Image").clicked() {
                self.pick_image(ctx);
            }
            match &self.form.image_path {
                Some(path) => {
                    ui.label(file_label(path)).on_hover_text(path.display().to_string());
                }
                None => {
                    ui.label(egui::RichText::new("No image selected").italics());
                }
            }
        });

        if let Some(path) = &self.form.image_path {
            ui.add(
                egui::Image::new(image_uri(path))
                    .max_height(PREVIEW_MAX_HEIGHT)
                    .maintain_aspect_ratio(true),
            );
            if let Some((w, h)) = self.form.source_dimensions {
                ui.label(egui::RichText::new(format!("Original: {}x{}", w, h)).small());
            }
        }

        ui.add_space(8.0);

        egui::Grid::new("dimensions")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                ui.label("Width");
                ui.add(egui::TextEdit::singleline(&mut self.form.width).desired_width(120.0));
                ui.end_row();
                ui.label("Height");
                ui.add(egui::TextEdit::singleline(&mut self.form.height).desired_width(120.0));
                ui.end_row();
            });

        ui.checkbox(
            &mut self.settings.open_folder_after_resize,
            "Open output folder when done",
        );

        ui.horizontal(|ui| {
            let can_resize = self.form.image_path.is_some();
            if ui
                .add_enabled(can_resize, egui::Button::new("Resize"))
                .clicked()
            {
                self.start_resize();
            }
            if !self.in_flight.is_empty() {
                ui.spinner();
            }
        });

        ui.label(
            egui::RichText::new(format!(
                "Output: {}",
                self.channel.destination_folder().display()
            ))
            .small(),
        );
    }

    fn render_history(&mut self, ui: &mut egui::Ui) {
        if self.history.is_empty() {
            return;
        }
        ui.separator();
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("History").strong());
            if ui.small_button("Clear").clicked() {
                self.history.clear();
            }
        });

        egui::ScrollArea::vertical()
            .id_salt("history")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for entry in &self.history {
                    ui.horizontal(|ui| {
                        let (mark, color) = if entry.success {
                            ("✔", egui::Color32::from_rgb(100, 255, 100))
                        } else {
                            ("✖", egui::Color32::RED)
                        };
                        ui.label(egui::RichText::new(mark).color(color));
                        ui.label(entry.at.format("%H:%M:%S").to_string());
                        ui.label(file_label(&entry.image_path))
                            .on_hover_text(&entry.message);
                    });
                }
            });
    }

    fn render_status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if let Some((msg, msg_type)) = &self.status_message {
                let color = match msg_type {
                    MessageType::Info => egui::Color32::GRAY,
                    MessageType::Success => egui::Color32::from_rgb(100, 255, 100),
                    MessageType::Error => egui::Color32::RED,
                };
                ui.label(egui::RichText::new(msg).color(color));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let pending = self.channel.pending_count();
                if pending > 0 {
                    ui.label(format!("Pending: {}", pending));
                }
            });
        });
    }

    fn render_about(&mut self, ctx: &egui::Context) {
        if !self.session.about_open() {
            return;
        }

        let closed = ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("about"),
            egui::ViewportBuilder::default()
                .with_title(ABOUT_TITLE)
                .with_inner_size([300.0, 300.0])
                .with_resizable(false),
            |ctx, _class| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(24.0);
                        ui.heading(APP_NAME);
                        ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                        ui.add_space(12.0);
                        ui.label(env!("CARGO_PKG_DESCRIPTION"));
                    });
                });
                ctx.input(|i| i.viewport().close_requested())
            },
        );

        if closed && self.session.close_about() == LifecycleAction::Quit {
            self.allow_close = true;
            ctx.send_viewport_cmd_to(egui::ViewportId::ROOT, egui::ViewportCommand::Close);
        }
    }
}

impl eframe::App for ImageResizerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_replies();
        self.handle_main_close_request(ctx);
        self.check_reactivation(ctx);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            if let Some(action) = show_menu_bar(ui, &self.menus) {
                self.handle_menu_action(ctx, action);
            }
        });

        // Bottom panel for status bar - always anchored at bottom
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(28.0)
            .show(ctx, |ui| {
                self.render_status_bar(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            // New id salt per recreated window so text edits start fresh
            ui.push_id(self.session.main_generation(), |ui| {
                self.render_form(ui, ctx);
                self.render_history(ui);
            });
        });

        self.render_about(ctx);

        if self.mode.is_development() {
            egui::Window::new("Inspection")
                .default_open(false)
                .show(ctx, |ui| ctx.inspection_ui(ui));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.settings.save(storage);
    }
}

fn image_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format bytes into human-readable size
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
