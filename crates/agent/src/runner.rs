//! The agent runner: turn generation against the shared message log.

use crate::history;
use parlance_core::message::{Message, ToolCall};
use parlance_core::provider::{Provider, ProviderRequest};
use parlance_core::{Error, Result, ToolRegistry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, info, warn};

/// The outcome of a completed (non-streaming) turn.
#[derive(Debug, Clone)]
pub struct TurnOutput {
    pub content: String,
    /// Tool calls the model requested during the turn, if any.
    pub tool_calls: Vec<ToolCall>,
}

/// A single stateful conversational session.
///
/// The message log holds user/assistant/tool messages only; the system prompt
/// lives outside the log and is prepended per request, so `clear` always
/// leaves an empty visible history.
///
/// Overlapping turns are serialized by the turn gate. `clear` and
/// `load_history` take the same gate, so the log never changes under a
/// mid-flight turn.
pub struct Agent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
    tools: Arc<ToolRegistry>,
    log: Arc<RwLock<Vec<Message>>>,
    turn_gate: Arc<Mutex<()>>,
    history_dir: PathBuf,
    turn_timeout: Duration,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            system_prompt: None,
            tools,
            log: Arc::new(RwLock::new(Vec::new())),
            turn_gate: Arc::new(Mutex::new(())),
            history_dir: PathBuf::from("./conversations"),
            turn_timeout: Duration::from_secs(300),
        }
    }

    /// Set the maximum tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the system prompt sent ahead of the log on every request.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if !prompt.trim().is_empty() {
            self.system_prompt = Some(prompt);
        }
        self
    }

    /// Set the directory history snapshots are written to.
    pub fn with_history_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.history_dir = dir.into();
        self
    }

    /// Bound the wall-clock duration of a single turn.
    pub fn with_turn_timeout(mut self, timeout: Duration) -> Self {
        self.turn_timeout = timeout;
        self
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    fn request_from_log(&self, log: &[Message]) -> ProviderRequest {
        let mut messages = Vec::with_capacity(log.len() + 1);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.as_str()));
        }
        messages.extend_from_slice(log);

        ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: self.tools.provider_definitions(),
        }
    }

    /// Run one non-streaming turn.
    ///
    /// The user message is appended to the log up front; the assistant message
    /// is appended only when generation completes cleanly. A fault anywhere
    /// aborts the whole turn with no partial output.
    pub async fn chat(&self, message: impl Into<String>) -> Result<TurnOutput> {
        let _gate = self.turn_gate.lock().await;

        let request = {
            let mut log = self.log.write().await;
            log.push(Message::user(message));
            self.request_from_log(&log)
        };

        debug!(model = %self.model, "Running completion turn");
        let response = tokio::time::timeout(self.turn_timeout, self.provider.complete(request))
            .await
            .map_err(|_| Error::Timeout(self.turn_timeout.as_secs()))?
            .map_err(Error::from)?;

        let content = response.message.content.clone();
        let tool_calls = response.message.tool_calls.clone().unwrap_or_default();
        self.log.write().await.push(response.message);

        Ok(TurnOutput {
            content,
            tool_calls,
        })
    }

    /// Run one streaming turn.
    ///
    /// Returns a channel of content deltas; the channel closing without an
    /// `Err` item means the turn finished cleanly. The turn gate is held by
    /// the generation task for the full turn, so a caller that drops the
    /// receiver stops generation promptly and releases the gate.
    pub async fn chat_stream(
        &self,
        message: impl Into<String>,
    ) -> Result<mpsc::Receiver<Result<String>>> {
        let gate = Arc::clone(&self.turn_gate).lock_owned().await;

        let request = {
            let mut log = self.log.write().await;
            log.push(Message::user(message));
            self.request_from_log(&log)
        };

        debug!(model = %self.model, "Running streaming turn");
        let mut chunks = self.provider.stream(request).await.map_err(Error::from)?;

        let (tx, rx) = mpsc::channel(32);
        let log = Arc::clone(&self.log);
        let deadline = tokio::time::Instant::now() + self.turn_timeout;
        let timeout_secs = self.turn_timeout.as_secs();

        tokio::spawn(async move {
            let _gate = gate;
            let mut content = String::new();
            let mut tool_calls: Vec<ToolCall> = Vec::new();

            loop {
                let next = match tokio::time::timeout_at(deadline, chunks.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(timeout_secs, "Turn timed out mid-stream");
                        let _ = tx.send(Err(Error::Timeout(timeout_secs))).await;
                        return;
                    }
                };

                match next {
                    Some(Ok(chunk)) => {
                        tool_calls.extend(chunk.tool_calls);
                        if let Some(text) = chunk.content {
                            content.push_str(&text);
                            if tx.send(Ok(text)).await.is_err() {
                                debug!("Caller disconnected mid-stream, abandoning turn");
                                return;
                            }
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(Err(Error::Provider(e))).await;
                        return;
                    }
                    None => break,
                }
            }

            log.write()
                .await
                .push(Message::assistant(content).with_tool_calls(tool_calls));
        });

        Ok(rx)
    }

    /// The message log, most recent last. `limit` keeps only the most recent
    /// messages while preserving order.
    pub async fn messages(&self, limit: Option<usize>) -> Vec<Message> {
        let log = self.log.read().await;
        match limit {
            Some(n) if n < log.len() => log[log.len() - n..].to_vec(),
            _ => log.clone(),
        }
    }

    /// Empty the message log. Waits for any mid-flight turn.
    pub async fn clear(&self) {
        let _gate = self.turn_gate.lock().await;
        self.log.write().await.clear();
        info!("Conversation log cleared");
    }

    /// Write the current log to a new snapshot file. Returns the path.
    pub async fn save_history(&self) -> Result<PathBuf> {
        let log = self.log.read().await.clone();
        let path = history::write_snapshot(&self.history_dir, &log).await?;
        info!(path = %path.display(), messages = log.len(), "Saved conversation history");
        Ok(path)
    }

    /// Replace the log with a snapshot's contents. Returns the message count.
    ///
    /// A missing or unreadable file leaves the current log untouched.
    pub async fn load_history(&self, path: &Path) -> Result<usize> {
        let loaded = history::read_snapshot(path).await?;
        let count = loaded.len();

        let _gate = self.turn_gate.lock().await;
        *self.log.write().await = loaded;
        info!(path = %path.display(), messages = count, "Loaded conversation history");
        Ok(count)
    }
}
