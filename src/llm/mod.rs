//! LLM client functions: completions, embeddings, and tool-augmented chat.
//! All calls go through the shared `reqwest::Client` and support two
//! providers: Ollama and OpenAI-compatible APIs.

pub mod completion;
pub mod embeddings;
pub mod tool_chat;
