//! Compiled-in defaults. Every value can be overridden from the command line.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const EMBED_MODEL: &str = "text-embedding-3-large";
pub const GEN_MODEL: &str = "gpt-4o-mini";

pub const FILE_PATHS: &[&str] = &["~/Downloads/rossmoornews_20250903_RossmoorNews.pdf"];

pub const CHUNK_SIZE: usize = 1200;
pub const CHUNK_OVERLAP: usize = 150;
pub const TOP_K: usize = 6;

pub const DOWNLOAD_DIR: &str = "./assistant_outputs";
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Number of most recent thread messages inspected after a run completes.
pub const MESSAGE_LIMIT: u32 = 3;

/// Expands a leading `~` to the current user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn default_file_paths() -> Vec<PathBuf> {
    FILE_PATHS.iter().map(|p| expand_home(p)).collect()
}
