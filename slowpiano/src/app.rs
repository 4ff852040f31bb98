//! slowPiano app: keyboard, note bus and piano roll wired together

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use egui::{Align2, Context, Vec2};
use slowcore::repaint::RepaintController;
use slowcore::theme::{consume_special_keys, menu_bar, SlowColors, SlowTheme};
use slowcore::widgets::{status_bar, window_control_buttons, WindowAction};
use slowpiano::canvas::{EguiCanvas, PixmapCanvas, RollCanvas};
use slowpiano::keyboard::{note_name, PianoKeyboard};
use slowpiano::{NoteBus, PianoRoll, RollConfig};

/// Where snapshots go: ~/Pictures if there is one, else the home folder.
fn snapshot_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|d| {
            d.picture_dir()
                .map(|p| p.to_path_buf())
                .or_else(|| Some(d.home_dir().to_path_buf()))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

pub struct SlowPianoApp {
    bus: NoteBus,
    keyboard: PianoKeyboard,
    roll: PianoRoll,
    repaint: RepaintController,
    /// Roll unmounted on request
    paused: bool,
    /// Roll could not get a drawing surface; don't retry every frame
    mount_failed: bool,
    /// One-line message for the status bar
    message: Option<String>,
    show_about: bool,
}

impl SlowPianoApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: RollConfig) -> Self {
        let roll = PianoRoll::new(config).unwrap_or_else(|e| {
            log::error!("bad roll config ({}), using defaults", e);
            PianoRoll::default()
        });
        Self {
            bus: NoteBus::new(),
            keyboard: PianoKeyboard::new(roll.range()),
            roll,
            repaint: RepaintController::with_fast_interval(),
            paused: false,
            mount_failed: false,
            message: None,
            show_about: false,
        }
    }

    fn toggle_pause(&mut self) {
        if self.paused {
            self.paused = false;
            self.message = None;
        } else {
            self.roll.unmount();
            self.paused = true;
            self.message = Some("roll paused".into());
        }
    }

    fn save_snapshot(&mut self, width: f32) {
        let size = Vec2::new(width, self.roll.config().canvas_height);
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = snapshot_dir().join(format!("slowpiano-{}.png", stamp));
        let result = PixmapCanvas::with_size(size).and_then(|mut canvas| {
            self.roll.paint(&mut canvas);
            canvas.save_png(&path)
        });
        self.message = Some(match result {
            Ok(()) => format!("saved {}", path.display()),
            Err(e) => {
                log::warn!("snapshot failed: {}", e);
                format!("snapshot failed: {}", e)
            }
        });
    }

    fn shut_down(&mut self) {
        self.keyboard.release_all(&self.bus);
        self.roll.unmount();
    }

    fn status_text(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        let held = self.keyboard.held_notes();
        let held = if held.is_empty() {
            "-".to_string()
        } else {
            held.iter().map(|n| note_name(*n)).collect::<Vec<_>>().join(" ")
        };
        format!(
            "held: {}  |  {} spans  |  {:.0} px/s",
            held,
            self.roll.tracker().len(),
            self.roll.clock().rate()
        )
    }

    fn render_roll(&mut self, ui: &mut egui::Ui) {
        if !self.roll.is_mounted() && !self.paused && !self.mount_failed {
            let rect = ui.available_rect_before_wrap();
            let canvas = EguiCanvas::new(ui.painter(), rect);
            if let Err(e) = self.roll.mount(&self.bus, &mut self.repaint, Some(&canvas as &dyn RollCanvas)) {
                self.mount_failed = true;
                self.message = Some(format!("piano roll unavailable: {}", e));
            }
        }

        if self.roll.is_mounted() {
            self.roll.show(ui);
        } else {
            let size = Vec2::new(ui.available_width(), self.roll.config().canvas_height);
            let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
            let mut canvas = EguiCanvas::new(&painter, response.rect);
            self.roll.paint(&mut canvas);
        }
    }

    fn render_about(&mut self, ctx: &Context) {
        let screen = ctx.screen_rect();
        let max_h = (screen.height() - 60.0).max(120.0);
        egui::Window::new("about slowPiano")
            .collapsible(false)
            .resizable(false)
            .default_width(280.0)
            .max_height(max_h)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.heading("slowPiano");
                    ui.label("version 0.2.2");
                    ui.add_space(8.0);
                    ui.label("virtual piano for slowOS");
                });
                ui.add_space(8.0);
                ui.separator();
                ui.label("play with the mouse or the home row:");
                ui.label("  a w s e d f t g y h u j k o l p ;");
                ui.add_space(4.0);
                ui.label("notes rise up the roll while held.");
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("ok").clicked() {
                        self.show_about = false;
                    }
                });
            });
    }
}

impl eframe::App for SlowPianoApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        consume_special_keys(ctx);
        self.keyboard.handle_input(ctx, &self.bus);

        let mut snapshot = false;
        let win_action = egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            menu_bar(ui, |ui| {
                let action = window_control_buttons(ui);
                ui.menu_button("piano", |ui| {
                    let pause_text = if self.paused { "resume roll" } else { "pause roll" };
                    if ui.button(pause_text).clicked() {
                        self.toggle_pause();
                        ui.close_menu();
                    }
                    if ui.button("clear roll").clicked() {
                        self.roll.clear();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("save snapshot").clicked() {
                        snapshot = true;
                        ui.close_menu();
                    }
                });
                ui.menu_button("help", |ui| {
                    if ui.button("about").clicked() {
                        self.show_about = true;
                        ui.close_menu();
                    }
                });
                action
            }).inner
        }).inner;

        match win_action {
            WindowAction::Close => {
                self.shut_down();
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            WindowAction::Minimize => {
                self.keyboard.release_all(&self.bus);
                ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(true));
            }
            WindowAction::None => {}
        }

        egui::TopBottomPanel::top("title_bar").show(ctx, |ui| {
            SlowTheme::title_bar_frame().show(ui, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.label("slowPiano");
                });
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            status_bar(ui, &self.status_text());
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(SlowColors::WHITE).inner_margin(egui::Margin::same(8.0)))
            .show(ctx, |ui| {
                if snapshot {
                    self.save_snapshot(ui.available_width());
                }
                self.render_roll(ui);
                ui.add_space(8.0);
                self.keyboard.show(ui, &self.bus);
            });

        if self.show_about {
            self.render_about(ctx);
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.shut_down();
        }

        self.repaint.end_frame(ctx);
    }
}
