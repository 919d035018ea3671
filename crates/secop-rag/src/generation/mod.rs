//! Context assembly and answer generation

pub mod answer;
pub mod context;

pub use answer::{AnswerGenerator, ExtractiveAnswerer, NO_CONTEXT_ANSWER};
pub use context::ContextBundle;
