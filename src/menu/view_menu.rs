use crate::component::ViewerSession;
use anyhow::Result;
use console::{Term, style};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use rust_i18n::t;

const ZOOM_STEP: f64 = 1.25;
/// 每次平移視窗寬高的比例
const PAN_FRACTION: f64 = 0.1;

fn print_status(session: &ViewerSession) {
    let store = session.store();
    let view = session.view();
    let current = store.current().map_or_else(|| "-".to_string(), |f| f.index.to_string());

    println!(
        "{}",
        t!(
            "view.status",
            position = store.current_index() + 1,
            count = store.len(),
            index = current,
            zoom = format!("{:.2}", view.zoom_level),
            pan = format!("({:.1}, {:.1})", view.pan_x, view.pan_y)
        )
    );
    if let Some(label) = session.preview().active_label() {
        println!("{}", t!("view.layer", label = label));
    }
    let playback = if view.is_playing {
        t!("view.playing")
    } else {
        t!("view.paused")
    };
    println!("{}", style(playback).dim());
}

/// 檢視控制：換格、縮放、平移與播放
pub fn show_view_menu(term: &Term, session: &mut ViewerSession) -> Result<()> {
    if session.store().is_empty() {
        println!("{}", style(t!("common.no_sequence")).yellow());
        crate::pause(term)?;
        return Ok(());
    }

    let mut selected = 0;
    loop {
        term.clear_screen()?;
        println!("{}", style(t!("view.title")).cyan().bold());
        println!("{}", style(t!("common.esc_hint")).dim());
        print_status(session);

        let options = vec![
            t!("view.opt_next"),
            t!("view.opt_previous"),
            t!("view.opt_first"),
            t!("view.opt_last"),
            t!("view.opt_zoom_in"),
            t!("view.opt_zoom_out"),
            t!("view.opt_pan_left"),
            t!("view.opt_pan_right"),
            t!("view.opt_pan_up"),
            t!("view.opt_pan_down"),
            t!("view.opt_reset"),
            t!("view.opt_toggle_play"),
            t!("view.opt_step_play"),
            t!("view.opt_reverse"),
            t!("view.opt_next_layer"),
            t!("view.back"),
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(t!("view.prompt"))
            .items(&options)
            .default(selected)
            .interact_on_opt(term)?;

        let Some(choice) = selection else {
            break;
        };
        selected = choice;

        let window = session.settings().window_dims();
        let center = (f64::from(window.width) / 2.0, f64::from(window.height) / 2.0);
        let step_x = f64::from(window.width) * PAN_FRACTION;
        let step_y = f64::from(window.height) * PAN_FRACTION;

        match choice {
            0 => session.next_frame(),
            1 => session.previous_frame(),
            2 => session.first_frame(),
            3 => session.last_frame(),
            4 => session.zoom_at(center, ZOOM_STEP),
            5 => session.zoom_at(center, 1.0 / ZOOM_STEP),
            // 拖曳方向與畫面移動方向相反
            6 => session.drag(center, (center.0 + step_x, center.1)),
            7 => session.drag(center, (center.0 - step_x, center.1)),
            8 => session.drag(center, (center.0, center.1 + step_y)),
            9 => session.drag(center, (center.0, center.1 - step_y)),
            10 => session.reset_view(),
            11 => session.toggle_play(),
            12 => {
                session.advance_playback();
            }
            13 => session.reverse_direction(),
            14 => session.next_layer(),
            _ => break,
        }
    }

    Ok(())
}
