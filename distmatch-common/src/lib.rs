pub mod config;
pub use config::{CacheConfig, Config, MatcherConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DistMatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Solver error: {0}")]
    Solver(String),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DistMatchError>;
