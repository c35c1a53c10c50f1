//! Filter parameter producers.
//!
//! Remote producers talk to an OpenAI-compatible chat completion endpoint and
//! hand the reply to [`photo_filter::validate`]. The quiz fallback maps answers
//! to parameters locally and never fails.

mod generator;
mod prompt;
pub mod quiz;
mod request;
mod response;

pub use generator::{FilterGenerator, generate_or_fallback};
pub use quiz::{QuizAnswer, QuizOption, QuizQuestion, default_questions, fallback_params};
pub use request::{APIConfig, DEFAULT_MODEL, DEFAULT_VISION_MODEL, OPENROUTER_BASE_URL};
pub use response::{parse_params, strip_code_fences};

pub type Result<T> = std::result::Result<T, GenerateError>;

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("Request Error {0}")]
    Request(#[from] reqwest::Error),

    #[error("API Error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Empty response")]
    EmptyResponse,

    #[error("Invalid JSON {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Quiz has no answers")]
    NoAnswers,

    #[error("Empty refine instruction")]
    EmptyInstruction,
}
