use anyhow::Result;
use clap::Parser;
use gmail_cleaner::cli::{self, Cli};
use gmail_cleaner::error::{CleanupError, ErrorKind};
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::str::FromStr;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Tracing writer that hands complete log lines to `MultiProgress::println`
///
/// Partial lines stay buffered until their newline arrives or the writer is
/// dropped, so a log line is never split around a redrawn spinner.
struct ProgressLogWriter {
    multi: Arc<MultiProgress>,
    pending: Vec<u8>,
}

impl ProgressLogWriter {
    fn emit(&self, lines: Vec<String>) {
        for line in lines {
            let _ = self.multi.println(line);
        }
    }
}

/// Remove every newline-terminated line from `pending`
fn take_complete_lines(pending: &mut Vec<u8>) -> Vec<String> {
    let Some(last_newline) = pending.iter().rposition(|&b| b == b'\n') else {
        return Vec::new();
    };
    let complete: Vec<u8> = pending.drain(..=last_newline).collect();
    String::from_utf8_lossy(&complete)
        .lines()
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl Write for ProgressLogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let lines = take_complete_lines(&mut self.pending);
        self.emit(lines);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut lines = take_complete_lines(&mut self.pending);
        if !self.pending.is_empty() {
            lines.push(String::from_utf8_lossy(&self.pending).into_owned());
            self.pending.clear();
        }
        self.emit(lines);
        Ok(())
    }
}

impl Drop for ProgressLogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// One writer per tracing event, all sharing the run's MultiProgress
struct ProgressLogMakeWriter(Arc<MultiProgress>);

impl<'a> MakeWriter<'a> for ProgressLogMakeWriter {
    type Writer = ProgressLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressLogWriter {
            multi: Arc::clone(&self.0),
            pending: Vec::new(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

/// Build the log filter; `RUST_LOG` wins over `--log-level`
fn log_filter(level: &str) -> std::result::Result<EnvFilter, CleanupError> {
    let level = LevelFilter::from_str(level)
        .map_err(|_| CleanupError::ConfigError(format!("Unknown log level '{}'", level)))?;

    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gmail_cleaner={},warn", level))))
}

async fn run() -> Result<()> {
    // Both aws-lc-rs and ring may be linked in; pick one explicitly
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    // Logs print above progress bars
    let multi_progress = Arc::new(MultiProgress::new());
    let make_writer = ProgressLogMakeWriter(Arc::clone(&multi_progress));

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&cli.log_level)?)
        .with_writer(make_writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::debug!("gmail-cleaner {} starting", env!("CARGO_PKG_VERSION"));

    cli::run_command(&cli, (*multi_progress).clone()).await?;
    Ok(())
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(cleanup_err) = error.downcast_ref::<CleanupError>() {
        match cleanup_err.kind() {
            ErrorKind::Auth => {
                eprintln!("\nHint: Make sure the OAuth client file in app.credentials_path is valid.");
                eprintln!("      You can download it from Google Cloud Console.");
                eprintln!("      Try running: gmail-cleaner auth --force");
            }
            ErrorKind::TransientRemote => {
                eprintln!("\nHint: Gmail kept failing after several retries.");
                eprintln!("      Wait a few minutes and run the command again.");
            }
            ErrorKind::FatalRemote => {
                eprintln!("\nHint: Check the rule queries and that the token has the right scope.");
                eprintln!("      Rules using DELETE need full mailbox access; re-run auth --force.");
            }
            ErrorKind::Config => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: gmail-cleaner init-config --output <path>");
            }
            ErrorKind::Local => {}
        }
    }
}
