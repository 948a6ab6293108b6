pub mod config;
pub mod generation;
pub mod lifecycle;
pub mod llm;
pub mod progress;
pub mod store;
pub mod terminal;
