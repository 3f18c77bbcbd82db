//! The installation job: assemble the configuration, then drive the NixOS
//! tooling against the target root.

use std::fs;
use std::path::Path;

use crate::assemble::Assembler;
use crate::cmd::{argv, CommandError, Runner};
use crate::config::JobConfig;
use crate::error::{JobFailure, JobResult};
use crate::host::{Host, Reporter};
use crate::paths;
use crate::storage::GlobalStorage;
use crate::unfree;

const PROXY_VARS: [&str; 4] = ["http_proxy", "https_proxy", "HTTP_PROXY", "HTTPS_PROXY"];

pub fn pretty_name() -> &'static str {
    "Installing NixOS."
}

/// `env NAME=value...` prefix carrying the set proxy variables, or nothing
pub fn proxy_env(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    let vars: Vec<String> = PROXY_VARS
        .iter()
        .filter_map(|name| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", name, v))
        })
        .collect();

    if vars.is_empty() {
        return vars;
    }
    std::iter::once("env".to_string()).chain(vars).collect()
}

pub struct Job<'a> {
    gs: &'a GlobalStorage,
    config: &'a JobConfig,
    runner: &'a dyn Runner,
    host: &'a dyn Host,
    proxy: Vec<String>,
    reporter: Reporter<'a>,
}

impl<'a> Job<'a> {
    pub fn new(
        gs: &'a GlobalStorage,
        config: &'a JobConfig,
        runner: &'a dyn Runner,
        host: &'a dyn Host,
    ) -> Self {
        Self {
            gs,
            config,
            runner,
            host,
            proxy: Vec::new(),
            reporter: Reporter::new(host).with_status(pretty_name()),
        }
    }

    /// Pass proxy settings through to `nixos-install`
    pub fn with_proxy(mut self, proxy: Vec<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn status(&self) -> &str {
        self.reporter.status()
    }

    pub fn run(&mut self) -> JobResult {
        let root = self.gs.root_mount_point.clone();

        self.reporter.stage("Configuring NixOS", 0.1);
        let assembly = Assembler::new(self.gs, self.config, self.runner, self.host)
            .assemble(&mut self.reporter)?;
        let text = assembly.template.finalize(self.host);

        self.reporter.stage("Generating NixOS configuration", 0.25);
        self.generate_config(&root)?;

        if assembly.free_only {
            self.strip_unfree_modules(&root)?;
        }

        let config_path = Path::new(&root).join(paths::CONFIGURATION_NIX);
        let config_path = config_path.to_string_lossy();
        self.write_file(&config_path, &text).map_err(|e| {
            self.host
                .error(&format!("Failed to write {}: {}", config_path, e.details()));
            JobFailure::new("Failed to write configuration.nix", e.details())
        })?;

        self.format(&config_path);
        self.copy_modules(&root)?;

        self.reporter.stage("Installing NixOS", 0.3);
        self.install(&root)
    }

    fn generate_config(&self, root: &str) -> JobResult {
        let cmd = self
            .config
            .privileged(["nixos-generate-config", "--root", root]);

        self.runner.run(&cmd, None).map(drop).map_err(|e| {
            let output = e.details();
            self.host.error(&format!("nixos-generate-config: {}", output));
            JobFailure::new("nixos-generate-config failed", output)
        })
    }

    fn strip_unfree_modules(&self, root: &str) -> JobResult {
        let path = Path::new(root).join(paths::HARDWARE_CONFIGURATION_NIX);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                self.host
                    .error(&format!("Failed to read {}: {}", path.display(), e));
                return Ok(());
            }
        };

        let Some(stripped) =
            unfree::strip_unfree(&text, |attr| unfree::query_unfree(attr, self.runner, self.host))
        else {
            return Ok(());
        };

        let path = path.to_string_lossy();
        self.write_file(&path, &stripped).map_err(|e| {
            self.host
                .error(&format!("Failed to write {}: {}", path, e.details()));
            JobFailure::new("Failed to write hardware-configuration.nix", e.details())
        })
    }

    /// Write through a process so the target root's ownership applies
    fn write_file(&self, path: &str, text: &str) -> Result<(), CommandError> {
        self.runner
            .run(&argv(["cp", "/dev/stdin", path]), Some(text.as_bytes()))
            .map(drop)
    }

    fn format(&self, path: &str) {
        let Some(formatter) = self.config.formatter.as_deref().filter(|f| !f.is_empty()) else {
            return;
        };

        if let Err(e) = self.runner.run(&argv([formatter, path]), None) {
            self.host
                .warning(&format!("Failed to format {} with {}: {}", path, formatter, e));
        }
    }

    fn copy_modules(&self, root: &str) -> JobResult {
        let dest = Path::new(root).join(paths::MODULES_DIR);
        let dest = dest.to_string_lossy().into_owned();

        for configs in [paths::DEFAULT_CONFIGS, paths::CUSTOM_CONFIGS] {
            let src = self.config.module_root.join(configs).join("modules");

            let has_entries = fs::read_dir(&src)
                .map(|mut entries| entries.next().is_some())
                .unwrap_or(false);
            if !has_entries {
                self.host.debug(&format!(
                    "Skipping non-existing module directory {}",
                    src.display()
                ));
                continue;
            }

            let src = format!("{}/.", src.display());
            let mkdir = argv(["mkdir", "-p", dest.as_str()]);
            let copy = argv(["cp", "-r", src.as_str(), dest.as_str()]);
            let copied = self
                .runner
                .run(&mkdir, None)
                .and_then(|_| self.runner.run(&copy, None));

            if let Err(e) = copied {
                self.host
                    .error(&format!("Failed to copy {} to {}: {}", src, dest, e.details()));
                return Err(JobFailure::new("Failed to copy NixOS modules", e.details()));
            }
        }

        Ok(())
    }

    fn install(&self, root: &str) -> JobResult {
        let mut args = self.proxy.clone();
        args.extend(argv(["nixos-install", "--no-root-passwd", "--root", root]));
        let cmd = self.config.privileged(args);

        let mut output = String::new();
        let status = self.runner.stream(&cmd, &mut |line: &str| {
            self.host.debug(&format!("nixos-install: {}", line));
            output.push_str(line);
            output.push('\n');
        });

        match status {
            Ok(0) => Ok(()),
            Ok(code) => {
                self.host
                    .error(&format!("nixos-install exited with code {}", code));
                Err(JobFailure::new("nixos-install failed", output))
            }
            Err(e) => {
                self.host.error(&format!("nixos-install: {}", e));
                Err(JobFailure::new(
                    "nixos-install failed",
                    "Installation failed to complete",
                ))
            }
        }
    }
}
