//! Model-backed disambiguation.

pub mod openai;
pub mod prompt;

pub use openai::OpenAiDisambiguator;
