//! Provider that replays queued responses, for offline runs and tests.

use super::{LlmChunk, LlmProvider, LlmRequest};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug)]
enum Scripted {
    Text(String),
    Failure(String),
}

/// Answers each request with the next queued response. An exhausted queue is
/// an error, so a test that triggers an unexpected call fails loudly.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<LlmRequest>>,
    chunk_delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| Scripted::Text(r.into()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Stream responses line by line, sleeping `delay` before each line.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub async fn push_response(&self, text: impl Into<String>) {
        self.queue.lock().await.push_back(Scripted::Text(text.into()));
    }

    pub async fn push_failure(&self, message: impl Into<String>) {
        self.queue
            .lock()
            .await
            .push_back(Scripted::Failure(message.into()));
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.queue.lock().await.len()
    }

    async fn next_response(&self, request: &LlmRequest) -> Result<String> {
        self.requests.lock().await.push(request.clone());
        match self.queue.lock().await.pop_front() {
            Some(Scripted::Text(text)) => Ok(text),
            Some(Scripted::Failure(message)) => Err(anyhow::anyhow!(message)),
            None => anyhow::bail!("scripted provider has no response queued"),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        self.next_response(request).await
    }

    fn generate_stream<'a>(&'a self, request: &'a LlmRequest) -> BoxStream<'a, Result<LlmChunk>> {
        let delay = self.chunk_delay;
        stream::once(self.next_response(request))
            .flat_map(move |result| match result {
                Ok(text) => {
                    let mut chunks: Vec<Result<LlmChunk>> = text
                        .split_inclusive('\n')
                        .map(|line| Ok(LlmChunk::Delta(line.to_string())))
                        .collect();
                    chunks.push(Ok(LlmChunk::Done));
                    stream::iter(chunks)
                        .then(move |chunk| async move {
                            if let Some(delay) = delay {
                                tokio::time::sleep(delay).await;
                            }
                            chunk
                        })
                        .boxed()
                }
                Err(e) => stream::once(async move { Err(e) }).boxed(),
            })
            .boxed()
    }
}
