mod schema;

pub use schema::*;

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Where the host's global storage dump comes from
#[derive(Debug, Clone)]
pub enum StorageSource {
    File(PathBuf),
    Stdin,
}

impl StorageSource {
    /// Parse from command line argument
    pub fn from_arg(arg: &str) -> Self {
        match arg {
            "-" => Self::Stdin,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Load global storage from a YAML or JSON dump
pub fn load(source: &StorageSource) -> Result<GlobalStorage> {
    match source {
        StorageSource::File(path) => load_from_file(path),
        StorageSource::Stdin => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read global storage from stdin")?;
            parse_auto(&content)
        }
    }
}

fn load_from_file(path: &Path) -> Result<GlobalStorage> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read global storage: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "yaml" | "yml" => parse_yaml(&content),
        "json" => parse_json(&content),
        _ => parse_auto(&content),
    }
}

pub fn parse_yaml(content: &str) -> Result<GlobalStorage> {
    serde_yaml::from_str(content).context("Failed to parse global storage YAML")
}

pub fn parse_json(content: &str) -> Result<GlobalStorage> {
    serde_json::from_str(content).context("Failed to parse global storage JSON")
}

/// Auto-detect format and parse
pub fn parse_auto(content: &str) -> Result<GlobalStorage> {
    let trimmed = content.trim();

    if trimmed.starts_with('{') {
        parse_json(content)
    } else {
        parse_yaml(content)
    }
}
