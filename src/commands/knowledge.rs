use super::AppState;
use crate::doc_processor::UploadedFile;
use crate::session::{DocumentEntry, IngestReport};
use serde::Deserialize;
use std::path::PathBuf;
use tauri::State;

/// A file picked in the webview and handed over as bytes.
#[derive(Debug, Deserialize)]
pub struct FilePayload {
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[tauri::command]
pub async fn upload_files(
    state: State<'_, AppState>,
    paths: Vec<PathBuf>,
) -> Result<IngestReport, String> {
    let mut session = state.session.lock().await;
    let (embedder, _) = state.clients(session.config())?;
    Ok(session.ingest_paths(&embedder, &paths).await)
}

#[tauri::command]
pub async fn upload_file_data(
    state: State<'_, AppState>,
    files: Vec<FilePayload>,
) -> Result<IngestReport, String> {
    let files = files
        .into_iter()
        .map(|f| UploadedFile::new(f.name, f.mime_type, f.bytes))
        .collect();
    let mut session = state.session.lock().await;
    let (embedder, _) = state.clients(session.config())?;
    Ok(session.ingest(&embedder, files).await)
}

#[tauri::command]
pub async fn list_documents(state: State<'_, AppState>) -> Result<Vec<DocumentEntry>, String> {
    let session = state.session.lock().await;
    Ok(session.documents().to_vec())
}

#[tauri::command]
pub async fn remove_document(state: State<'_, AppState>, name: String) -> Result<bool, String> {
    let mut session = state.session.lock().await;
    Ok(session.remove_document(&name))
}
