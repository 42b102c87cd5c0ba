//! Chat orchestration: ingest files into the index, answer questions
//! against it, keep the conversation.

pub mod models;

use crate::config::AppConfig;
use crate::doc_processor::{chunk_document, extract_all, UploadedFile};
use crate::embedding::{embed_in_batches, Embedder};
use crate::llm::{ChatRequest, CompletionModel, LlmError, PromptMessage};
use crate::vector_store::{ChunkMatch, IndexError, VectorStore};
use std::path::PathBuf;

pub use models::{ChatMessage, DocumentEntry, IngestReport, Role};

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("failed to embed query: {0}")]
    Embedding(#[source] LlmError),
    #[error("completion request failed: {0}")]
    Completion(#[source] LlmError),
    #[error("retrieval failed: {0}")]
    Index(#[from] IndexError),
}

pub struct ChatSession {
    config: AppConfig,
    index: VectorStore,
    documents: Vec<DocumentEntry>,
    history: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            index: VectorStore::new(),
            documents: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn documents(&self) -> &[DocumentEntry] {
        &self.documents
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    /// Extract, chunk, embed and index `files`.
    ///
    /// A file whose name is already indexed replaces the earlier one once the
    /// new chunks are embedded and indexed; until then the old copy stays.
    /// Files that fail to embed or index are skipped and named in the report.
    pub async fn ingest(&mut self, embedder: &dyn Embedder, files: Vec<UploadedFile>) -> IngestReport {
        let infos: Vec<_> = files.iter().map(UploadedFile::info).collect();
        let docs = extract_all(files).await;
        let mut report = IngestReport::default();

        for (info, doc) in infos.into_iter().zip(docs) {
            if doc.degraded {
                report.degraded.push(doc.name.clone());
            }

            let chunks = chunk_document(&doc, self.config.chunk_size, self.config.chunk_overlap);
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors =
                match embed_in_batches(embedder, &texts, self.config.embedding_batch_size).await {
                    Ok(vectors) => vectors,
                    Err(e) => {
                        log::error!("Embedding failed for {}: {}", doc.name, e);
                        report.failed.push(doc.name.clone());
                        continue;
                    }
                };

            let added = match self.index.replace_source(&doc.name, chunks.into_iter().zip(vectors)) {
                Ok(added) => added,
                Err(e) => {
                    log::error!("Indexing failed for {}: {}", doc.name, e);
                    report.failed.push(doc.name.clone());
                    continue;
                }
            };

            let before = self.documents.len();
            self.documents.retain(|d| d.file.name != doc.name);
            if self.documents.len() != before {
                log::info!("Replaced previously indexed {}", doc.name);
            }

            log::info!("Indexed {} ({} chunks)", doc.name, added);
            self.documents.push(DocumentEntry {
                file: info,
                chunk_count: added,
                degraded: doc.degraded,
            });
            report.indexed.push(doc.name);
            report.chunks_added += added;
        }

        report
    }

    /// Read `paths` from disk and ingest them. Paths that cannot be read are
    /// logged and listed as failed; the rest are still indexed.
    pub async fn ingest_paths(&mut self, embedder: &dyn Embedder, paths: &[PathBuf]) -> IngestReport {
        let mut files = Vec::with_capacity(paths.len());
        let mut unreadable = Vec::new();
        for path in paths {
            match UploadedFile::from_path(path) {
                Ok(file) => files.push(file),
                Err(e) => {
                    log::warn!("Could not read {}: {}", path.display(), e);
                    unreadable.push(path.display().to_string());
                }
            }
        }

        let mut report = self.ingest(embedder, files).await;
        report.failed.extend(unreadable);
        report
    }

    /// Forget a document and its chunks. Returns whether it was present.
    pub fn remove_document(&mut self, name: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.file.name != name);
        self.index.remove_source(name);
        before != self.documents.len()
    }

    /// The `top_k` chunks most similar to `query`.
    pub async fn retrieve(&self, embedder: &dyn Embedder, query: &str) -> Result<Vec<ChunkMatch>, ChatError> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = embedder
            .embed(&[query.to_string()])
            .await
            .map_err(ChatError::Embedding)?;
        let query_vector = vectors.into_iter().next().ok_or_else(|| {
            ChatError::Embedding(LlmError::Parse("no embedding returned for query".into()))
        })?;
        Ok(self.index.search(&query_vector, self.config.top_k)?)
    }

    /// Run the retrieval pipeline for one question without touching history.
    pub async fn ask(
        &self,
        embedder: &dyn Embedder,
        model: &dyn CompletionModel,
        question: &str,
    ) -> Result<String, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let matches = self.retrieve(embedder, question).await?;
        log::info!("Retrieved {} chunks for question", matches.len());

        let request = ChatRequest {
            messages: compose_prompt(&self.config.system_prompt, question, &matches),
            model: self.config.chat_model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let response = model.complete(&request).await.map_err(ChatError::Completion)?;
        Ok(response.content)
    }

    /// Append the user's message and the assistant's reply to the history.
    ///
    /// Pipeline failures do not surface as errors: they are logged and the
    /// reply becomes a fallback message. Only blank input is rejected.
    pub async fn send_message(
        &mut self,
        embedder: &dyn Embedder,
        model: &dyn CompletionModel,
        text: &str,
    ) -> Result<ChatMessage, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.history.push(ChatMessage::new(Role::User, text));

        let reply = match self.ask(embedder, model, text).await {
            Ok(answer) => ChatMessage::new(Role::Assistant, answer),
            Err(e) => {
                log::error!("Answering failed: {}", e);
                ChatMessage::new(Role::Assistant, fallback_reply(&e))
            }
        };
        self.history.push(reply.clone());
        Ok(reply)
    }
}

pub fn fallback_reply(err: &ChatError) -> String {
    format!("Sorry, something went wrong while answering: {}", err)
}

/// Build the system + user messages for one question.
pub fn compose_prompt(system_prompt: &str, question: &str, matches: &[ChunkMatch]) -> Vec<PromptMessage> {
    let mut user = String::new();
    if matches.is_empty() {
        user.push_str("No document context is available for this question.\n\n");
    } else {
        user.push_str("Context from the uploaded documents:\n\n");
        for (n, m) in matches.iter().enumerate() {
            user.push_str(&format!(
                "[{}] {} (chunk {}/{})\n{}\n\n",
                n + 1,
                m.chunk.source,
                m.chunk.index + 1,
                m.chunk.total,
                m.chunk.text
            ));
        }
    }
    user.push_str("Question: ");
    user.push_str(question);

    vec![PromptMessage::system(system_prompt), PromptMessage::user(user)]
}
