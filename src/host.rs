//! Capabilities the installer host lends to the job

use std::io::Write;
use std::sync::Mutex;

use tracing::Level;

/// Progress and logging sink provided by the host
pub trait Host {
    /// Show a human-readable description of the current stage
    fn set_status(&self, _status: &str) {}

    /// Report overall job progress in `0.0..=1.0`
    fn set_progress(&self, fraction: f64);

    /// Emit a diagnostic message
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn warning(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Run-scoped status and progress, forwarded to the host on every change
pub struct Reporter<'a> {
    host: &'a dyn Host,
    status: String,
}

impl<'a> Reporter<'a> {
    pub fn new(host: &'a dyn Host) -> Self {
        Self {
            host,
            status: String::new(),
        }
    }

    /// Status shown before the first stage
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    /// Enter a new stage of the job
    pub fn stage(&mut self, status: &str, fraction: f64) {
        self.status = status.to_string();
        self.host.set_status(status);
        self.host.set_progress(fraction);
        tracing::info!("{} ({:.0}%)", status, fraction * 100.0);
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

/// Host used by the command-line entry point.
///
/// Progress goes to stdout as `progress <fraction> <status>` so a wrapping
/// process job can parse it; everything else is forwarded to `tracing`.
pub struct ConsoleHost<W: Write> {
    out: Mutex<W>,
    status: Mutex<String>,
}

impl<W: Write> ConsoleHost<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            status: Mutex::new(String::new()),
        }
    }
}

impl<W: Write> Host for ConsoleHost<W> {
    fn set_status(&self, status: &str) {
        if let Ok(mut current) = self.status.lock() {
            *current = status.to_string();
        }
    }

    fn set_progress(&self, fraction: f64) {
        let status = self.status.lock().map(|s| s.clone()).unwrap_or_default();
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "progress {:.2} {}", fraction, status);
            let _ = out.flush();
        }
    }

    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => tracing::error!("{}", message),
            Level::WARN => tracing::warn!("{}", message),
            Level::INFO => tracing::info!("{}", message),
            Level::DEBUG => tracing::debug!("{}", message),
            Level::TRACE => tracing::trace!("{}", message),
        }
    }
}
