pub mod gemini;
pub mod parser;
pub mod prompts;
pub mod provider;
pub mod runner;

pub use gemini::GeminiProvider;
pub use prompts::ClassificationRequest;
pub use provider::ClassifierProvider;
pub use runner::{ClassifySummary, Classifier};
