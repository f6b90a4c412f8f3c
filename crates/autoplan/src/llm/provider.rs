use async_trait::async_trait;

use super::error::LlmError;
use super::stream::LlmStream;

/// Text-completion oracle.
///
/// Implementations return a stream of text chunks for one system/user
/// prompt pair. Callers decide how much of the stream to consume.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<LlmStream, LlmError>;

    fn name(&self) -> &str {
        "llm"
    }
}
