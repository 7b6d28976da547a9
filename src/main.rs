use anyhow::Result;
use console::{Term, style};
use image_sequence_viewer::component::ViewerSession;
use image_sequence_viewer::component::export_pipeline::FfmpegSinkFactory;
use image_sequence_viewer::config::types::Config;
use image_sequence_viewer::init;
use image_sequence_viewer::menu::show_main_menu;
use image_sequence_viewer::signal::setup_shutdown_signal;
use image_sequence_viewer::tools::ImageCrateDecoder;
use log::{info, warn};
use rust_i18n::t;
use std::sync::Arc;

#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en-US");

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal();

    let mut config = Config::new()?;
    rust_i18n::set_locale(config.settings.language.as_str());

    let mut session = ViewerSession::new(
        config.settings.clone(),
        Arc::new(ImageCrateDecoder),
        Arc::new(FfmpegSinkFactory::new(config.settings.encoder.clone())),
        shutdown_signal,
    );
    session.set_show_progress(true);

    loop {
        match show_main_menu(&term, &mut session, &mut config) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style(t!("main_menu.goodbye")).green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style(t!("main_menu.error_prefix")).red().bold(), e);
                break;
            }
        }
    }

    Ok(())
}
