mod app;
mod config;
mod derive;
mod error;
mod export;
mod geometry;
mod naming;
mod persist;
mod review;
mod session;
mod shortcuts;
mod store;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use eframe::egui;

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open grid image")
        .add_filter("Images", &["png", "jpg", "jpeg"])
        .pick_file()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let Some(image_path) = std::env::args().nth(1).map(PathBuf::from).or_else(pick_image) else {
        eprintln!("Usage: grid-cropper <image.png|jpg>");
        std::process::exit(1);
    };
    if !image_path.exists() {
        bail!("file not found: {}", image_path.display());
    }

    let raw_image = image::open(&image_path)
        .with_context(|| format!("opening {}", image_path.display()))?;
    log::info!(
        "loaded {} ({}x{})",
        image_path.display(),
        raw_image.width(),
        raw_image.height()
    );
    let config = config::Config::load();

    let title = format!(
        "grid-cropper - {}",
        image_path
            .file_name()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("")
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(&title),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| Ok(Box::new(app::CropperApp::new(image_path, raw_image, config)))),
    )
    .map_err(|e| anyhow::anyhow!("running the window: {e}"))
}
