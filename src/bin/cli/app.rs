use anyhow::Context;
use doc_chat_lib::config::AppConfig;
use doc_chat_lib::doc_processor::UploadedFile;
use doc_chat_lib::embedding::OpenAiEmbedder;
use doc_chat_lib::key_store::KeyStore;
use doc_chat_lib::llm::Provider;
use std::path::{Path, PathBuf};

/// Everything a subcommand needs: configuration, the credential store and
/// any key passed on the command line.
pub struct App {
    pub config: AppConfig,
    pub key_store: KeyStore,
    api_key_override: Option<String>,
}

impl App {
    pub fn new(
        config_path: Option<&Path>,
        data_dir: Option<&Path>,
        api_key_override: Option<String>,
    ) -> anyhow::Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load(path)?,
            None => match AppConfig::default_path() {
                Some(path) => AppConfig::load_or_default(&path)?,
                None => AppConfig::default(),
            },
        };

        let data_dir = data_dir.map(Path::to_path_buf).unwrap_or_else(default_data_dir);
        let key_store = KeyStore::open(&data_dir)
            .with_context(|| format!("opening key store in {}", data_dir.display()))?;

        Ok(Self {
            config,
            key_store,
            api_key_override: api_key_override.filter(|k| !k.trim().is_empty()),
        })
    }

    /// `--api-key` / `OPENAI_API_KEY` first, then the stored key.
    pub fn api_key(&self) -> anyhow::Result<Option<String>> {
        if let Some(key) = &self.api_key_override {
            return Ok(Some(key.clone()));
        }
        Ok(self.key_store.api_key()?)
    }

    pub fn clients(&self) -> anyhow::Result<(OpenAiEmbedder, Provider)> {
        let api_key = self.api_key()?;
        let provider = Provider::from_config(&self.config, api_key.as_deref())
            .context("run `doc-chat key set <KEY>` or pass --api-key")?;
        let embedder = OpenAiEmbedder::new(provider.config().clone(), &self.config.embedding_model);
        Ok((embedder, provider))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("doc-chat")
}

pub fn read_files(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadedFile>> {
    paths
        .iter()
        .map(|p| UploadedFile::from_path(p).with_context(|| format!("reading {}", p.display())))
        .collect()
}
