pub mod chat;
pub mod knowledge;
pub mod settings;

use crate::config::AppConfig;
use crate::embedding::OpenAiEmbedder;
use crate::key_store::KeyStore;
use crate::llm::Provider;
use crate::session::ChatSession;
use tokio::sync::Mutex;

pub struct AppState {
    /// Chat operations run one at a time.
    pub session: Mutex<ChatSession>,
    pub key_store: KeyStore,
}

impl AppState {
    pub fn new(config: AppConfig, key_store: KeyStore) -> Self {
        Self {
            session: Mutex::new(ChatSession::new(config)),
            key_store,
        }
    }

    /// Embedding and completion clients built from the stored credential.
    fn clients(&self, config: &AppConfig) -> Result<(OpenAiEmbedder, Provider), String> {
        let api_key = self.key_store.api_key().map_err(|e| e.to_string())?;
        let provider =
            Provider::from_config(config, api_key.as_deref()).map_err(|e| e.to_string())?;
        let embedder = OpenAiEmbedder::new(provider.config().clone(), &config.embedding_model);
        Ok((embedder, provider))
    }
}
