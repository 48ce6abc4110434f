mod app;
mod ui;

use app::CrashPandaApp;
use crash_panda::AppConfig;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::from_env();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Car Crashes Data Analysis",
        options,
        Box::new(move |cc| Ok(Box::new(CrashPandaApp::new(cc, &config)))),
    )
}
