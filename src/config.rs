//! Index selection for the binary

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::env;
use std::path::PathBuf;

use ampdesk_core::DEFAULT_EMBEDDING_BATCH_SIZE;

pub const DEFAULT_FLAT_PATH: &str = "data/index/embeddings.json";
pub const DEFAULT_SQLITE_PATH: &str = "data/knowledge.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexBackend {
    /// JSON file scanned in memory
    Flat,
    /// SQLite database
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub path: PathBuf,
    pub batch_size: usize,
}

impl IndexConfig {
    /// Resolve the index location, reading `EMBEDDING_BATCH_SIZE` from the environment
    pub fn resolve(backend: IndexBackend, path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(|| {
            PathBuf::from(match backend {
                IndexBackend::Flat => DEFAULT_FLAT_PATH,
                IndexBackend::Sqlite => DEFAULT_SQLITE_PATH,
            })
        });

        let batch_size = match env::var("EMBEDDING_BATCH_SIZE") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("EMBEDDING_BATCH_SIZE is not a number: {}", value))?,
            Err(_) => DEFAULT_EMBEDDING_BATCH_SIZE,
        };

        Ok(Self {
            backend,
            path,
            batch_size,
        })
    }
}
