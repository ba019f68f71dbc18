use anyhow::Context;
use clap::Parser;
use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    fs::File,
    io::{self, Write},
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

mod app;
mod cli;
mod config;
mod error;
mod forecast;
mod owm;
mod units;
mod weather;

use crate::app::{print_summary, run_app, Dashboard};
use crate::config::Settings;
use crate::error::DashboardError;

/// The TUI owns the terminal, so logs go to `--log-file`, or to stderr in summary mode only.
fn init_logging(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Some(ref path) = settings.log_file {
        let file = File::create(path)
            .with_context(|| format!("failed to create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if settings.summary {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }
    Ok(())
}

/// Holds raw mode and the alternate screen; dropping it restores the terminal
/// on every exit path, including a failed setup step.
struct TerminalGuard<W: Write> {
    out: W,
}

impl<W: Write> TerminalGuard<W> {
    fn enter(out: W) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self { out };
        execute!(guard.out, EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        if let Err(err) = disable_raw_mode() {
            tracing::warn!(%err, "failed to leave raw mode");
        }
        if let Err(err) = execute!(self.out, LeaveAlternateScreen, Show) {
            tracing::warn!(%err, "failed to leave alternate screen");
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let settings = Settings::from_args(&args)?;
    init_logging(&settings)?;

    let mut dashboard =
        Dashboard::load(&settings).context("failed to load weather payloads")?;

    if settings.summary {
        print_summary(&dashboard, &mut io::stdout().lock())?;
        return Ok(());
    }

    let mut guard = TerminalGuard::enter(io::stdout()).map_err(DashboardError::Terminal)?;
    let res = Terminal::new(CrosstermBackend::new(&mut guard.out))
        .and_then(|mut terminal| run_app(&mut terminal, &mut dashboard));
    // restore terminal before reporting
    drop(guard);

    res.map_err(DashboardError::Terminal)?;
    tracing::info!("dashboard closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    fn setup_then_fail(out: &mut Vec<u8>) -> io::Result<()> {
        let mut guard = TerminalGuard { out };
        execute!(BrokenPipe, EnterAlternateScreen)?;
        execute!(guard.out, EnterAlternateScreen)
    }

    #[test]
    fn test_guard_restores_on_drop() {
        let mut out = Vec::new();
        drop(TerminalGuard { out: &mut out });
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\x1b[?1049l"));
        assert!(text.contains("\x1b[?25h"));
    }

    #[test]
    fn test_guard_restores_when_setup_fails() {
        let mut out = Vec::new();
        assert!(setup_then_fail(&mut out).is_err());
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("\x1b[?1049h"));
        assert!(text.contains("\x1b[?1049l"));
    }

    #[test]
    fn test_guard_ignores_restore_errors() {
        drop(TerminalGuard { out: BrokenPipe });
    }
}
