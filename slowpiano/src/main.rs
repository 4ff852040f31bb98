//! slowPiano: virtual piano with a piano roll for the Slow Computer

mod app;

use app::SlowPianoApp;
use eframe::NativeOptions;
use env_logger::Env;
use slowpiano::RollConfig;

/// Menu, title and status bars.
const CHROME_HEIGHT: f32 = 90.0;
/// On-screen keyboard plus spacing.
const KEYBOARD_HEIGHT: f32 = 96.0;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = RollConfig::load();
    let height = config.canvas_height + KEYBOARD_HEIGHT + CHROME_HEIGHT;

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size([config.canvas_width.max(200.0), height])
        .with_title("slowPiano");

    if let Some(pos) = slowcore::cascade_position() {
        viewport = viewport.with_position(pos);
    }

    let options = NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "slowPiano",
        options,
        Box::new(move |cc| {
            slowcore::SlowTheme::default().apply(&cc.egui_ctx);
            Box::new(SlowPianoApp::new(cc, config))
        }),
    )
}
