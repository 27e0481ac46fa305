pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod prepare;
pub mod report;
pub mod taxonomy;

pub use classify::{Classifier, ClassifierProvider, GeminiProvider};
pub use config::{ClassifierConfig, Config, RunnerOptions};
pub use error::{Error, Result};
pub use taxonomy::{Category, CategorySet};
