pub mod config;
pub mod coordinator;
pub mod error;
pub mod intent;
pub mod llm;
pub mod prompts;
pub mod session;
pub mod store;
pub mod types;

pub use types::*;
