//! Scripted provider — a deterministic in-process backend for tests.
//!
//! Plays back a fixed sequence of content deltas, optionally injecting a
//! fault mid-stream or pausing between deltas to make turn-serialization
//! races observable.

use async_trait::async_trait;
use parlance_core::error::ProviderError;
use parlance_core::message::{Message, ToolCall};
use parlance_core::provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk};
use std::time::Duration;

pub struct ScriptedProvider {
    chunks: Vec<String>,
    tool_calls: Vec<ToolCall>,
    /// Emit a stream fault after this many deltas instead of finishing.
    error_after: Option<(usize, String)>,
    /// Pause between deltas; lets tests overlap two in-flight turns.
    chunk_delay: Duration,
}

impl ScriptedProvider {
    /// A provider that streams the given deltas and completes normally.
    pub fn say<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            tool_calls: Vec::new(),
            error_after: None,
            chunk_delay: Duration::ZERO,
        }
    }

    /// Attach tool calls to the final chunk.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// Fail after `n` deltas with the given message.
    pub fn failing_after(mut self, n: usize, message: impl Into<String>) -> Self {
        self.error_after = Some((n, message.into()));
        self
    }

    /// Sleep between deltas.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        if let Some((_, ref message)) = self.error_after {
            return Err(ProviderError::StreamInterrupted(message.clone()));
        }
        let content: String = self.chunks.concat();
        Ok(ProviderResponse {
            message: Message::assistant(content).with_tool_calls(self.tool_calls.clone()),
            model: "scripted".into(),
        })
    }

    async fn stream(
        &self,
        _request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let chunks = self.chunks.clone();
        let tool_calls = self.tool_calls.clone();
        let error_after = self.error_after.clone();
        let delay = self.chunk_delay;

        let (tx, rx) = tokio::sync::mpsc::channel(8);
        tokio::spawn(async move {
            for (i, chunk) in chunks.into_iter().enumerate() {
                if let Some((n, ref message)) = error_after {
                    if i == n {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(message.clone())))
                            .await;
                        return;
                    }
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx
                    .send(Ok(StreamChunk {
                        content: Some(chunk),
                        tool_calls: Vec::new(),
                        done: false,
                    }))
                    .await
                    .is_err()
                {
                    return; // receiver dropped
                }
            }

            // A fault positioned at or past the end of the script fires
            // instead of the final chunk.
            if let Some((_, ref message)) = error_after {
                let _ = tx
                    .send(Err(ProviderError::StreamInterrupted(message.clone())))
                    .await;
                return;
            }

            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    tool_calls,
                    done: true,
                }))
                .await;
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "scripted".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.0,
            max_tokens: None,
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn streams_deltas_then_done() {
        let provider = ScriptedProvider::say(["a", "b", "c"]);
        let mut rx = provider.stream(request()).await.unwrap();

        let mut contents = Vec::new();
        let mut saw_done = false;
        while let Some(item) = rx.recv().await {
            let chunk = item.unwrap();
            if chunk.done {
                saw_done = true;
            } else {
                contents.push(chunk.content.unwrap());
            }
        }
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert!(saw_done);
    }

    #[tokio::test]
    async fn fault_stops_the_stream() {
        let provider = ScriptedProvider::say(["a", "b", "c"]).failing_after(1, "boom");
        let mut rx = provider.stream(request()).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap().unwrap().content.as_deref(),
            Some("a")
        );
        assert!(rx.recv().await.unwrap().is_err());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn complete_concatenates_script() {
        let provider = ScriptedProvider::say(["Hello", ", ", "world"]);
        let response = provider.complete(request()).await.unwrap();
        assert_eq!(response.message.content, "Hello, world");
    }

    #[tokio::test]
    async fn complete_propagates_fault() {
        let provider = ScriptedProvider::say(["x"]).failing_after(0, "boom");
        assert!(provider.complete(request()).await.is_err());
    }
}
