use async_trait::async_trait;
use anyhow::Result;
use std::fmt::Debug;

pub mod gemini;
pub mod prompts;

/// A single "generate content from prompt text" call. No retries, no streaming.
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String>;
}
