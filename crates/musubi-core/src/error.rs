//! Error type for the fallible edges of the crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MusubiError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
