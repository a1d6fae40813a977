//! Terminal output helpers: spinners, confirmations, interrupt handling.

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Set while a fuzzy finder owns the terminal.
static SELECTING: AtomicBool = AtomicBool::new(false);

/// Install the Ctrl+C handler.
///
/// SIGINT reaches the whole foreground process group. While a finder is
/// running it handles the interrupt itself and exits with its cancel code,
/// so sesh must survive it. Outside of a selection we exit like the default
/// handler would.
pub fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        if SELECTING.load(Ordering::SeqCst) {
            tracing::debug!("Interrupt during selection, leaving it to the finder");
        } else {
            std::process::exit(130);
        }
    })
    .context("failed to set Ctrl+C handler")
}

/// Run `f` with interrupts deferred to the finder.
pub fn while_selecting<T>(f: impl FnOnce() -> T) -> T {
    SELECTING.store(true, Ordering::SeqCst);
    let result = f();
    SELECTING.store(false, Ordering::SeqCst);
    result
}

/// Spinner on stderr; hidden automatically when stderr is not a terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}

/// Ask a yes/no question on stderr. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    confirm_with(question, &mut stdin.lock(), &mut io::stderr())
}

fn confirm_with(question: &str, input: &mut impl BufRead, out: &mut impl Write) -> Result<bool> {
    write!(out, "{question} [y/N] ")?;
    out.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

pub fn success(message: impl std::fmt::Display) {
    println!("{} {message}", "✓".green());
}

pub fn failure(message: impl std::fmt::Display) {
    eprintln!("{} {message}", "✗".red());
}

pub fn note(message: impl std::fmt::Display) {
    eprintln!("{}", message.to_string().dark_grey());
}
