#![cfg_attr(not(feature = "app"), allow(dead_code))]

mod commands;
mod events;
mod ids;
mod logging;
mod models;
mod persistence;
mod projection;
mod render;
mod state;
mod storage;
mod store;
mod theme;

#[cfg(all(feature = "app", not(test)))]
use tauri::Manager;

#[cfg(all(feature = "app", not(test)))]
use crate::commands::*;
#[cfg(all(feature = "app", not(test)))]
use crate::logging::init_logging;
#[cfg(all(feature = "app", not(test)))]
use crate::state::AppState;
#[cfg(all(feature = "app", not(test)))]
use crate::storage::Storage;
#[cfg(all(feature = "app", not(test)))]
use crate::store::TaskStore;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
#[cfg(all(feature = "app", not(test)))]
pub fn run() {
    let result = tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;
            if let Err(err) = init_logging(&app_data_dir) {
                eprintln!("failed to initialize logging: {err}");
            }

            let storage = Storage::new(app_data_dir);
            if let Err(err) = storage.ensure_dirs() {
                log::warn!("failed to prepare app data dir: {err}");
            }
            let settings = storage.load_or_init_settings();
            let theme = theme::load_theme(&storage, &settings.theme_key);

            // Tasks are filled in by `load_state` once the page reports its markup.
            app.manage(AppState::new(TaskStore::new(Vec::new()), settings, theme));
            log::info!("app state ready theme={}", theme.as_str());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            load_state,
            submit_task,
            list_click,
            checkbox_change,
            edit_input,
            commit_edit,
            cancel_edit,
            search_input,
            filter_click,
            load_theme_state,
            toggle_theme,
            debug_add_task,
            debug_remove_task,
            debug_list,
        ])
        .run(tauri::generate_context!());

    if let Err(err) = result {
        log::error!("error while running tauri application: {err}");
        eprintln!("error while running tauri application: {err}");
        std::process::exit(1);
    }
}
