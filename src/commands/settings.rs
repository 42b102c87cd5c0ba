use super::AppState;
use tauri::State;

/// The stored key, masked for display.
#[tauri::command]
pub fn get_api_key(state: State<'_, AppState>) -> Result<Option<String>, String> {
    state.key_store.masked_api_key().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn set_api_key(state: State<'_, AppState>, value: String) -> Result<(), String> {
    state.key_store.set_api_key(&value).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn clear_api_key(state: State<'_, AppState>) -> Result<(), String> {
    state.key_store.clear_api_key().map_err(|e| e.to_string())
}
