pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod llm;
pub mod models;

pub use config::EncoreConfig;
pub use directory::{DirectoryClient, DirectoryClientConfig, DirectoryError, EventsDirectory};
pub use error::EncoreError;
pub use llm::{ChatClient, ChatClientConfig, LanguageModel, LlmError};
