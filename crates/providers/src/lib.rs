//! Completion service implementations for Onager.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatService;
