use super::AppState;
use crate::session::ChatMessage;
use tauri::State;

#[tauri::command]
pub async fn send_message(
    state: State<'_, AppState>,
    content: String,
) -> Result<ChatMessage, String> {
    let mut session = state.session.lock().await;
    let (embedder, provider) = state.clients(session.config())?;
    session
        .send_message(&embedder, &provider, &content)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn get_messages(state: State<'_, AppState>) -> Result<Vec<ChatMessage>, String> {
    let session = state.session.lock().await;
    Ok(session.history().to_vec())
}
