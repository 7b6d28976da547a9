use crate::component::ViewerSession;
use crate::component::export_pipeline::FfmpegSinkFactory;
use crate::config::save::save_settings;
use crate::config::types::{Config, Language, UserSettings};
use crate::menu::handlers::{
    run_batch_export, run_export, run_load_folder, run_load_layered, run_reload, run_save_preset,
};
use crate::menu::view_menu::show_view_menu;
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use rust_i18n::t;
use std::str::FromStr;
use std::sync::Arc;

pub fn show_main_menu(term: &Term, session: &mut ViewerSession, config: &mut Config) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style(t!("main_menu.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());
    if let Some(folder) = session.current_folder() {
        println!(
            "{}",
            style(t!("main_menu.current", path = folder.display())).dim()
        );
    }

    let options = vec![
        t!("main_menu.opt_open"),
        t!("main_menu.opt_open_layered"),
        t!("main_menu.opt_reload"),
        t!("main_menu.opt_view"),
        t!("main_menu.opt_export"),
        t!("main_menu.opt_save_preset"),
        t!("main_menu.opt_batch_export"),
        t!("main_menu.opt_settings"),
        t!("main_menu.exit"),
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("main_menu.prompt"))
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => run_load_folder(term, session, config)?,
        Some(1) => run_load_layered(term, session, config)?,
        Some(2) => run_reload(term, session)?,
        Some(3) => show_view_menu(term, session)?,
        Some(4) => run_export(term, session)?,
        Some(5) => run_save_preset(term, session)?,
        Some(6) => run_batch_export(term, session)?,
        Some(7) => show_settings_menu(term, session, config)?,
        _ => return Ok(false), // ESC 或離開
    }

    Ok(true)
}

fn prompt_value<T>(prompt: &str, current: T) -> Result<T>
where
    T: Clone + ToString + FromStr,
    <T as FromStr>::Err: ToString,
{
    let value = Input::<T>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(current)
        .interact_text()?;
    Ok(value)
}

/// 設定選單
fn show_settings_menu(term: &Term, session: &mut ViewerSession, config: &mut Config) -> Result<()> {
    loop {
        term.clear_screen()?;

        println!("{}", style(t!("settings.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());

        let options = vec![
            t!("settings.opt_preview"),
            t!("settings.opt_performance"),
            t!("settings.opt_export"),
            t!("settings.opt_language"),
            t!("settings.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("settings.prompt"))
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        let mut settings = config.settings.clone();
        match selection {
            Some(0) => edit_preview_settings(&mut settings)?,
            Some(1) => edit_performance_settings(&mut settings)?,
            Some(2) => edit_export_settings(&mut settings)?,
            Some(3) => show_language_menu(term, &mut settings)?,
            _ => break,
        }

        if settings != config.settings {
            if let Err(e) = session.update_settings(settings.clone()) {
                eprintln!("{} {}", style(t!("common.error")).red().bold(), e);
                crate::pause(term)?;
                continue;
            }
            session.set_sink_factory(Arc::new(FfmpegSinkFactory::new(settings.encoder.clone())));
            config.settings = settings;
            save_settings(&config.settings)?;
            println!("\n{}", style(t!("settings.saved")).green());
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    }

    Ok(())
}

fn edit_preview_settings(settings: &mut UserSettings) -> Result<()> {
    let v = prompt_value(&t!("settings.window_width"), settings.window_width)?;
    settings.window_width = v.max(1);
    let v = prompt_value(&t!("settings.window_height"), settings.window_height)?;
    settings.window_height = v.max(1);
    settings.shrink_factor = prompt_value(&t!("settings.shrink_factor"), settings.shrink_factor)?;
    let v = prompt_value(&t!("settings.nth_frame"), settings.nth_frame)?;
    settings.nth_frame = v.max(1);
    let v = prompt_value(&t!("settings.max_zoom"), settings.max_zoom)?;
    settings.max_zoom = v.max(settings.min_zoom);
    Ok(())
}

fn edit_performance_settings(settings: &mut UserSettings) -> Result<()> {
    settings.thread_count = prompt_value(&t!("settings.thread_count"), settings.thread_count)?;
    let v = prompt_value(&t!("settings.queue_multiplier"), settings.queue_multiplier)?;
    settings.queue_multiplier = v.max(1);
    Ok(())
}

fn edit_export_settings(settings: &mut UserSettings) -> Result<()> {
    let output = settings.output_dims();
    let v = prompt_value(&t!("settings.frame_rate"), settings.frame_rate)?;
    settings.frame_rate = v.max(1);
    let v = prompt_value(&t!("settings.output_width"), output.width)?;
    settings.output_width = (v != settings.window_width).then_some(v.max(1));
    let v = prompt_value(&t!("settings.output_height"), output.height)?;
    settings.output_height = (v != settings.window_height).then_some(v.max(1));
    let v = prompt_value(&t!("settings.crf"), settings.encoder.crf)?;
    settings.encoder.crf = v.min(51);
    settings.encoder.preset = prompt_value(&t!("settings.preset"), settings.encoder.preset.clone())?;
    Ok(())
}

/// 語言設定選單
fn show_language_menu(term: &Term, settings: &mut UserSettings) -> Result<()> {
    term.clear_screen()?;

    println!("{}", style(t!("settings.language.title")).cyan().bold());
    println!("{}", style(t!("common.esc_hint")).dim());

    let languages = [Language::English, Language::TraditionalChinese];
    let items: Vec<&str> = languages.iter().map(Language::display_name).collect();

    let default_index = languages
        .iter()
        .position(|&l| l == settings.language)
        .unwrap_or(0);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(t!("settings.language.prompt"))
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC 不儲存
    let Some(selection) = selection else {
        return Ok(());
    };

    let selected_lang = languages[selection];
    if selected_lang != settings.language {
        settings.language = selected_lang;
        rust_i18n::set_locale(selected_lang.as_str());
    }

    Ok(())
}
