use std::io::Read;
use std::path::Path;

use musubi_core::{CatalogEntry, TargetDescription};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CliError;

/// A resolve request as read from a file or stdin.
///
/// Candidate ids are kept as raw JSON so any catalog's id scheme works.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub target: TargetDescription,
    #[serde(default)]
    pub candidates: Vec<CatalogEntry<Value>>,
    #[serde(default)]
    pub exclude: Vec<Value>,
}

impl Request {
    /// Read from `path`, or stdin when `path` is `None` or `-`.
    pub fn read(path: Option<&Path>) -> Result<Self, CliError> {
        let text = match path {
            Some(p) if p != Path::new("-") => std::fs::read_to_string(p)?,
            _ => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(text)?)
    }
}
