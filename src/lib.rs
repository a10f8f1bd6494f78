pub mod assistant;
pub mod chunk;
pub mod client;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod qa;
pub mod retrieval;

pub use error::{Error, Result};
