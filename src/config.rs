use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Site-level settings for the job, read from an optional TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Directory holding `defaultConfigs/` and `customConfigs/`
    pub module_root: PathBuf,

    /// Program used to run commands with elevated privileges
    pub privilege_command: String,

    /// systemd's kbd-model-map used to derive a console keymap
    pub keymap_table: PathBuf,

    /// Formatter run over the written configuration.nix, if any
    pub formatter: Option<String>,

    /// Extra groups granted to the created user
    pub user_groups: Vec<String>,

    /// Hostname used when the host did not collect one
    pub default_hostname: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            module_root: PathBuf::from(paths::MODULE_ROOT),
            privilege_command: "pkexec".into(),
            keymap_table: PathBuf::from(paths::KBD_MODEL_MAP),
            formatter: Some("nixfmt".into()),
            user_groups: vec!["networkmanager".into(), "wheel".into()],
            default_hostname: "nixos".into(),
        }
    }
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read job config: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse job config TOML")
    }

    /// `[privilege_command, args...]`
    pub fn privileged<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        std::iter::once(self.privilege_command.clone())
            .chain(args.into_iter().map(|s| s.as_ref().to_string()))
            .collect()
    }
}
