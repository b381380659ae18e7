mod client;

pub use client::{BackendConfig, OpenAiBackend};
