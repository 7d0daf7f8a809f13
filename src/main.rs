//! Hemoguard: Hybrid anemia-risk assessment
//!
//! Main entry point for the command-line application.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hemoguard::adapters::sanitize::SanitizingMakeWriter;
use hemoguard::adapters::SqliteCaseRepository;
use hemoguard::cli::{self, Command};
use hemoguard::PolicyConfig;

fn main() -> Result<()> {
    // Initialize logging.
    //
    // Command output goes to stdout, so logs never share it:
    // - file: append to HEMOGUARD_LOG_FILE
    // - stderr: write to stderr
    // - auto: file when HEMOGUARD_LOG_FILE is set, stderr otherwise
    let log_mode = std::env::var("HEMOGUARD_LOG_MODE").unwrap_or_else(|_| "auto".to_string());
    let log_file = std::env::var("HEMOGUARD_LOG_FILE").ok();

    let use_file = match log_mode.as_str() {
        "file" => true,
        "stderr" => false,
        // auto
        _ => log_file.is_some(),
    };

    let (writer, _guard) = if use_file {
        let log_file = log_file.unwrap_or_else(|| "hemoguard.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort: a missing directory surfaces when the file is opened.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    let command = cli::parse_args(std::env::args().skip(1))?;

    let mut stdout = std::io::stdout().lock();
    if command == Command::Help {
        writeln!(stdout, "{}", cli::usage())?;
        return Ok(());
    }

    let policy = Arc::new(PolicyConfig::load().context("loading policy")?);
    let repository = Arc::new(SqliteCaseRepository::from_env().context("opening case database")?);

    tracing::debug!("Starting Hemoguard...");
    cli::run(command, policy, repository, &mut stdout)?;
    stdout.flush()?;

    Ok(())
}
