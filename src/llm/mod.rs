//! The text-generation capability consumed by the generator.
//!
//! Providers are injected as `Arc<dyn LlmProvider>`. Two implementations ship
//! with the crate: [`CommandProvider`] drives an external agent CLI and
//! [`ScriptedProvider`] replays canned responses.

pub mod command;
pub mod scripted;

pub use command::{CommandProvider, CommandProviderConfig};
pub use scripted::ScriptedProvider;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

/// One model invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }
}

/// Incremental output from a streamed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmChunk {
    Delta(String),
    Done,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Full-text generation.
    async fn generate(&self, request: &LlmRequest) -> Result<String>;

    /// Streamed generation. The default wraps [`LlmProvider::generate`] into a
    /// single delta followed by `Done`.
    fn generate_stream<'a>(&'a self, request: &'a LlmRequest) -> BoxStream<'a, Result<LlmChunk>> {
        stream::once(self.generate(request))
            .flat_map(|result| {
                let chunks = match result {
                    Ok(text) => vec![Ok(LlmChunk::Delta(text)), Ok(LlmChunk::Done)],
                    Err(e) => vec![Err(e)],
                };
                stream::iter(chunks)
            })
            .boxed()
    }
}

/// Drain a chunk stream into the full text, stopping at `Done` or the first error.
pub async fn collect_text(mut chunks: BoxStream<'_, Result<LlmChunk>>) -> Result<String> {
    let mut text = String::new();
    while let Some(chunk) = chunks.next().await {
        match chunk? {
            LlmChunk::Delta(delta) => text.push_str(&delta),
            LlmChunk::Done => break,
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: &LlmRequest) -> Result<String> {
            if request.prompt.is_empty() {
                anyhow::bail!("empty prompt");
            }
            Ok(request.prompt.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_default_stream_wraps_full_text() {
        let provider = EchoProvider;
        let request = LlmRequest::new("hello");
        let chunks: Vec<_> = provider.generate_stream(&request).collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_ref().unwrap(), &LlmChunk::Delta("HELLO".into()));
        assert_eq!(chunks[1].as_ref().unwrap(), &LlmChunk::Done);
    }

    #[tokio::test]
    async fn test_default_stream_propagates_error() {
        let provider = EchoProvider;
        let request = LlmRequest::new("");
        let err = collect_text(provider.generate_stream(&request))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("empty prompt"));
    }
}
