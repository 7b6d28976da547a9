use crate::component::ViewerSession;
use crate::component::export_pipeline::{ExportReport, load_presets};
use crate::config::Config;
use crate::config::save::{add_recent_path, save_settings};
use crate::error::PipelineError;
use crate::pause;
use crate::tools::{create_progress_bar, format_bytes, validate_directory_exists};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use log::warn;
use rust_i18n::t;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

const DEFAULT_OUTPUT: &str = "output.mp4";
const DEFAULT_PRESET_FILE: &str = "export_presets.txt";

fn prompt_text(prompt: &str, default: Option<&str>) -> Result<String> {
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme).with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.to_string());
    }
    Ok(input.interact_text()?.trim().to_string())
}

fn prompt_directory(config: &Config) -> Result<PathBuf> {
    let recent = config.settings.recent_paths.first().map(String::as_str);
    let path = PathBuf::from(prompt_text(&t!("load.prompt_path"), recent)?);
    validate_directory_exists(&path)?;
    Ok(path)
}

fn print_pipeline_error(e: &PipelineError) {
    let label = if e.is_cancelled() {
        style(t!("common.cancelled")).yellow().bold()
    } else {
        style(t!("common.error")).red().bold()
    };
    eprintln!("{label} {e}");
}

fn remember_path(config: &mut Config, path: &Path) {
    add_recent_path(&mut config.settings, &path.display().to_string());
    if let Err(e) = save_settings(&config.settings) {
        warn!("無法儲存最近使用的路徑: {e:#}");
    }
}

fn print_load_summary(session: &ViewerSession) {
    let store = session.store();
    let preview = store.image_dims();
    let original = store.original_dims();
    println!(
        "{}",
        style(t!(
            "load.loaded",
            frames = store.len(),
            files = store.all_source_paths().len()
        ))
        .green()
    );
    println!(
        "  {}",
        t!(
            "load.dims",
            preview = format!("{}x{}", preview.width, preview.height),
            original = format!("{}x{}", original.width, original.height),
            shrink = store.shrink_factor()
        )
    );
    println!(
        "  {}",
        t!(
            "load.memory",
            bytes = format_bytes(session.preview().resident_bytes() as u64)
        )
    );
    if session.preview().layer_count() > 1 {
        println!(
            "  {}",
            t!("load.layers", count = session.preview().layer_count())
        );
    }
}

pub fn run_load_folder(term: &Term, session: &mut ViewerSession, config: &mut Config) -> Result<()> {
    let directory = prompt_directory(config)?;
    match session.load_folder(&directory) {
        Ok(_) => {
            print_load_summary(session);
            remember_path(config, &directory);
        }
        Err(e) => print_pipeline_error(&e),
    }

    pause(term)?;
    Ok(())
}

pub fn run_load_layered(term: &Term, session: &mut ViewerSession, config: &mut Config) -> Result<()> {
    let root = prompt_directory(config)?;
    match session.load_layered(&root) {
        Ok(_) => {
            print_load_summary(session);
            remember_path(config, &root);
        }
        Err(e) => print_pipeline_error(&e),
    }

    pause(term)?;
    Ok(())
}

pub fn run_reload(term: &Term, session: &mut ViewerSession) -> Result<()> {
    match session.reload() {
        Ok(_) => print_load_summary(session),
        Err(e) => print_pipeline_error(&e),
    }

    pause(term)?;
    Ok(())
}

fn print_export_report(report: &ExportReport) {
    println!();
    println!("{}", style(t!("export.summary_title")).cyan().bold());
    println!("  {}", t!("export.summary_output", path = report.output_path.display()));
    println!(
        "  {}",
        t!("export.summary_frames", written = report.written, total = report.total)
    );
    if report.decode_failures > 0 {
        println!(
            "  {}",
            style(t!("export.summary_failures", count = report.decode_failures)).yellow()
        );
    }
    println!(
        "  {}",
        t!("export.summary_elapsed", seconds = format!("{:.1}", report.elapsed.as_secs_f64()))
    );
}

pub fn run_export(term: &Term, session: &mut ViewerSession) -> Result<()> {
    if session.store().is_empty() {
        println!("{}", style(t!("common.no_sequence")).yellow());
        pause(term)?;
        return Ok(());
    }

    let output = PathBuf::from(prompt_text(&t!("export.prompt_output"), Some(DEFAULT_OUTPUT))?);
    if let Err(e) = session.start_export(&output) {
        print_pipeline_error(&e);
        pause(term)?;
        return Ok(());
    }

    let total = session.export_progress().map_or(0, |p| p.total);
    let progress_bar = create_progress_bar(total as u64, true);
    while session.is_exporting() {
        if let Some(progress) = session.export_progress() {
            progress_bar.set_position(progress.written as u64);
            progress_bar.set_message(progress.state.to_string());
        }
        thread::sleep(Duration::from_millis(100));
    }

    match session.wait_export() {
        Ok(report) => {
            progress_bar.finish_with_message(t!("common.done").to_string());
            print_export_report(&report);
        }
        Err(e) => {
            progress_bar.abandon();
            print_pipeline_error(&e);
        }
    }

    pause(term)?;
    Ok(())
}

pub fn run_save_preset(term: &Term, session: &ViewerSession) -> Result<()> {
    if session.store().is_empty() {
        println!("{}", style(t!("common.no_sequence")).yellow());
        pause(term)?;
        return Ok(());
    }

    let preset_file = PathBuf::from(prompt_text(&t!("preset.prompt_file"), Some(DEFAULT_PRESET_FILE))?);
    let output = PathBuf::from(prompt_text(&t!("export.prompt_output"), Some(DEFAULT_OUTPUT))?);

    match session.save_view_preset(&preset_file, &output) {
        Ok(preset) => println!(
            "{} {}",
            style(t!("preset.saved")).green(),
            preset.to_line()
        ),
        Err(e) => print_pipeline_error(&e),
    }

    pause(term)?;
    Ok(())
}

pub fn run_batch_export(term: &Term, session: &mut ViewerSession) -> Result<()> {
    if session.store().is_empty() {
        println!("{}", style(t!("common.no_sequence")).yellow());
        pause(term)?;
        return Ok(());
    }

    let preset_file = PathBuf::from(prompt_text(&t!("preset.prompt_file"), Some(DEFAULT_PRESET_FILE))?);
    let presets = match load_presets(&preset_file) {
        Ok(presets) => presets,
        Err(e) => {
            print_pipeline_error(&e);
            pause(term)?;
            return Ok(());
        }
    };
    println!("{}", style(t!("preset.loaded", count = presets.len())).dim());

    match session.export_presets(&presets) {
        Ok(results) => {
            for (preset, result) in presets.iter().zip(results) {
                match result {
                    Ok(report) => print_export_report(&report),
                    Err(e) => {
                        eprintln!("{}", preset.output_path.display());
                        print_pipeline_error(&e);
                    }
                }
            }
        }
        Err(e) => print_pipeline_error(&e),
    }

    pause(term)?;
    Ok(())
}
