// lockimage - A full-screen image display for Wayland
// Shows one image above every other window and ignores the usual ways of closing it

mod display;
mod error;
mod fit;
mod image_loader;
mod input;
mod resource;
mod wayland;

use anyhow::Result;
use display::FullscreenDisplay;
use log::info;

/// Image displayed on screen, looked up next to the executable
const IMAGE_FILE: &str = "windows.png";

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Everything that can fail must fail before any window exists
    let image_path = resource::resolve(IMAGE_FILE)?;
    info!("Starting lockimage with image: {:?}", image_path);

    let source = image_loader::load_image(&image_path)?;
    info!("Image loaded: {}x{} pixels", source.width(), source.height());

    wayland::run(FullscreenDisplay::new(source))
}
