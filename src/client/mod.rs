#[allow(clippy::module_inception)]
pub mod client;
pub mod types;

pub use client::OpenAIClient;
