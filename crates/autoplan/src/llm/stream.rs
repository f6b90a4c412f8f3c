use std::pin::Pin;

use futures_util::{stream, Stream, StreamExt};

use super::error::LlmError;

pub type LlmStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Stream that yields the given chunks in order.
pub fn text_stream<I, S>(chunks: I) -> LlmStream
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let chunks: Vec<Result<String, LlmError>> =
        chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
    Box::pin(stream::iter(chunks))
}

/// Drain `stream` into one string, stopping once `max_chars` characters have
/// been collected. The rest of the stream is dropped unread.
pub async fn collect_text(mut stream: LlmStream, max_chars: usize) -> Result<String, LlmError> {
    let mut text = String::new();
    let mut count = 0usize;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let room = max_chars.saturating_sub(count);
        let chunk_chars = chunk.chars().count();
        if chunk_chars >= room {
            text.extend(chunk.chars().take(room));
            if chunk_chars > room {
                tracing::warn!("model output truncated at {} characters", max_chars);
            }
            break;
        }
        count += chunk_chars;
        text.push_str(&chunk);
    }
    Ok(text)
}
