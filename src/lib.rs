pub mod config;
pub mod doc_processor;
pub mod embedding;
pub mod key_store;
pub mod llm;
pub mod session;
pub mod vector_store;

#[cfg(feature = "desktop")]
mod commands;

#[cfg(feature = "desktop")]
use tauri::Manager;

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let app_dir = app.path().app_data_dir()?;
            let config_path = app
                .path()
                .app_config_dir()?
                .join(config::CONFIG_FILE_NAME);
            let config = config::AppConfig::load_or_default(&config_path)?;
            let key_store = key_store::KeyStore::open(&app_dir)?;
            app.manage(commands::AppState::new(config, key_store));
            log::info!("Data directory: {}", app_dir.display());
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::knowledge::upload_files,
            commands::knowledge::upload_file_data,
            commands::knowledge::list_documents,
            commands::knowledge::remove_document,
            commands::chat::send_message,
            commands::chat::get_messages,
            commands::settings::get_api_key,
            commands::settings::set_api_key,
            commands::settings::clear_api_key,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
