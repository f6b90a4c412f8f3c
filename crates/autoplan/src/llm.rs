//! Language-model oracle used for planning and joining.

mod error;
mod openai;
mod provider;
mod settings;
mod stream;

pub use error::LlmError;
pub use openai::OpenAiCompatibleProvider;
pub use provider::LlmProvider;
pub use settings::LlmSettings;
pub use stream::{collect_text, text_stream, LlmStream};
