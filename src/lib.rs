// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod error;
pub mod llm;
pub mod protocol;
pub mod scoring;
pub mod state;
pub mod technique;
pub mod types;
pub mod view;
pub mod watcher;
pub mod ws;
