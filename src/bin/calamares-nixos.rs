use anyhow::{bail, Result};
use std::env;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use calamares_nixos::cmd::SystemRunner;
use calamares_nixos::config::JobConfig;
use calamares_nixos::host::ConsoleHost;
use calamares_nixos::job::{self, Job};
use calamares_nixos::storage::{self, StorageSource};

const USAGE: &str = "Usage: calamares-nixos <globalstorage.{yaml,json}|-> [--config <job.toml>]";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let mut storage_arg = None;
    let mut config_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => bail!("--config needs a path. {}", USAGE),
            },
            "-h" | "--help" => {
                println!("{}", USAGE);
                return Ok(());
            }
            _ if storage_arg.is_none() => storage_arg = Some(arg),
            _ => bail!("unexpected argument {}. {}", arg, USAGE),
        }
    }

    let Some(storage_arg) = storage_arg else {
        bail!("calamares-nixos requires a global storage dump. {}", USAGE);
    };

    let gs = storage::load(&StorageSource::from_arg(&storage_arg))?;
    let mut config = match config_path {
        Some(path) => JobConfig::load(&path)?,
        None => JobConfig::default(),
    };

    if let Some(formatter) = config.formatter.clone() {
        if which::which(&formatter).is_err() {
            tracing::warn!("{} not found, configuration.nix will not be formatted", formatter);
            config.formatter = None;
        }
    }

    let host = ConsoleHost::new(io::stdout());
    let runner = SystemRunner;
    let proxy = job::proxy_env(|name| env::var(name).ok());

    tracing::info!("{}", job::pretty_name());
    let result = Job::new(&gs, &config, &runner, &host)
        .with_proxy(proxy)
        .run();

    if let Err(failure) = result {
        let (title, details) = failure.into_pair();
        eprintln!("{}\n{}", title, details);
        std::process::exit(1);
    }

    Ok(())
}
