//! Final message sink
//!
//! Fire-and-forget delivery of the finished answer to the chat session.

use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str);
}

/// Collects sent messages (HTTP responses, tests)
#[derive(Debug, Default)]
pub struct BufferedSink {
    messages: Mutex<Vec<String>>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<String> {
        self.messages.lock().await.clone()
    }

    pub async fn last(&self) -> Option<String> {
        self.messages.lock().await.last().cloned()
    }
}

#[async_trait]
impl MessageSink for BufferedSink {
    async fn send(&self, text: &str) {
        self.messages.lock().await.push(text.to_string());
    }
}

/// Prints each message to stdout (CLI)
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[async_trait]
impl MessageSink for StdoutSink {
    async fn send(&self, text: &str) {
        println!("{}\n", text);
    }
}
