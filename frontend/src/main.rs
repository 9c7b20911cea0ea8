use env_logger::Env;

mod app;

fn main() -> eframe::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Hill climbing path finder")
            .with_inner_size([1000.0, 720.0])
            .with_min_inner_size([400.0, 300.0]),
        ..Default::default()
    };

    eframe::run_native(
        "hillclimb",
        native_options,
        Box::new(|cc| Box::new(app::App::new(cc))),
    )
}
