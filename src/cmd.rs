use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with exit code {code:?}")]
    Failed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("I/O error talking to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl CommandError {
    /// Captured stdout/stderr of a command that ran but failed
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// What the command said about the failure, else the error itself
    pub fn details(&self) -> String {
        match self.output().map(str::trim) {
            Some(output) if !output.is_empty() => output.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Runs external programs on behalf of the job.
///
/// Every command the job issues goes through this trait so tests can record
/// the exact argument vectors without touching the host.
pub trait Runner {
    /// Run `argv` to completion, optionally feeding `stdin`.
    ///
    /// Returns stdout. A non-zero exit is an error carrying stdout followed
    /// by stderr.
    fn run(&self, argv: &[String], stdin: Option<&[u8]>) -> Result<String, CommandError>;

    /// Run `argv`, handing each line of combined output to `on_line`.
    ///
    /// Returns the exit code; -1 when the process was killed by a signal.
    fn stream(&self, argv: &[String], on_line: &mut dyn FnMut(&str))
        -> Result<i32, CommandError>;
}

/// Build an owned argument vector from string slices
pub fn argv<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().map(|s| s.as_ref().to_string()).collect()
}

/// [`Runner`] backed by real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

fn split(argv: &[String]) -> Result<(&String, &[String]), CommandError> {
    argv.split_first().ok_or(CommandError::Empty)
}

impl Runner for SystemRunner {
    fn run(&self, argv: &[String], stdin: Option<&[u8]>) -> Result<String, CommandError> {
        let (program, args) = split(argv)?;
        tracing::debug!("> {}", argv.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let io_err = |source| CommandError::Io {
            program: program.clone(),
            source,
        };

        // A child that exits before reading all of stdin closes the pipe;
        // its exit status and stderr still decide the outcome.
        let writer = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.to_vec();
                Some(thread::spawn(move || match pipe.write_all(&input) {
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }))
            }
            _ => None,
        };

        let output = child.wait_with_output().map_err(io_err)?;
        let written = writer
            .map(|w| w.join().unwrap_or(Ok(())))
            .unwrap_or(Ok(()));

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(CommandError::Failed {
                program: program.clone(),
                code: output.status.code(),
                output: format!("{}{}", stdout, stderr),
            });
        }
        written.map_err(io_err)?;

        if !stderr.trim().is_empty() {
            tracing::debug!("{}: {}", program, stderr.trim_end());
        }

        Ok(stdout)
    }

    fn stream(
        &self,
        argv: &[String],
        on_line: &mut dyn FnMut(&str),
    ) -> Result<i32, CommandError> {
        let (program, args) = split(argv)?;
        tracing::debug!("> {}", argv.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        // Ends once both pipes are closed
        for line in rx {
            on_line(&line);
        }
        for reader in readers {
            let _ = reader.join();
        }

        let status = child.wait().map_err(|source| CommandError::Io {
            program: program.clone(),
            source,
        })?;

        Ok(status.code().unwrap_or(-1))
    }
}

fn forward_lines<R>(pipe: R, tx: mpsc::Sender<String>) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(pipe).lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}
