//! Interactive selection through fzf or peco
//!
//! Items are written to the finder's stdin by a pump thread so the finder
//! can start drawing before every item is known. Without a finder, a
//! numbered prompt is used when stdin is a terminal.
//!
//! Dismissing the finder is not an error: it yields [`Selection::Cancelled`].
//! An empty item list is rejected with [`Error::NothingToSelect`] before any
//! process is started.

use crate::error::{Error, Result};
use crate::git::BranchStream;
use crate::process::command_available;
use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::process::{Command, Stdio};
use std::thread;

/// Supported fuzzy finders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finder {
    Fzf,
    Peco,
}

impl Finder {
    pub fn program(&self) -> &'static str {
        match self {
            Finder::Fzf => "fzf",
            Finder::Peco => "peco",
        }
    }

    /// `None` for `auto`.
    pub fn parse(key: &str) -> Result<Option<Finder>> {
        match key {
            "auto" => Ok(None),
            "fzf" => Ok(Some(Finder::Fzf)),
            "peco" => Ok(Some(Finder::Peco)),
            other => Err(Error::Config(format!("unknown fuzzy finder: {other}"))),
        }
    }

    /// First installed finder, fzf preferred.
    pub fn detect(installed: impl Fn(&str) -> bool) -> Option<Finder> {
        [Finder::Fzf, Finder::Peco]
            .into_iter()
            .find(|f| installed(f.program()))
    }

    /// Exit codes meaning the user dismissed the finder.
    fn is_cancel_code(&self, code: Option<i32>) -> bool {
        match self {
            // 130: interrupted, 1: no match
            Finder::Fzf => matches!(code, Some(130) | Some(1)),
            Finder::Peco => matches!(code, Some(1)),
        }
    }

    fn args(&self, prompt: &str, preview: Option<&str>, multi: bool) -> Vec<String> {
        let prompt = format!("{} ", prompt.trim_end());
        match self {
            Finder::Fzf => {
                let mut args: Vec<String> = ["--height", "40%", "--reverse", "--border", "--prompt"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                args.push(prompt);
                if multi {
                    args.push("--multi".to_string());
                }
                if let Some(preview) = preview {
                    args.extend([
                        "--preview".to_string(),
                        preview.to_string(),
                        "--preview-window".to_string(),
                        "right:60%".to_string(),
                    ]);
                }
                args
            }
            // peco has no preview pane
            Finder::Peco => vec!["--prompt".to_string(), prompt],
        }
    }
}

/// Outcome of a single-item selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(String),
    Cancelled,
}

impl Selection {
    pub fn into_option(self) -> Option<String> {
        match self {
            Selection::Selected(item) => Some(item),
            Selection::Cancelled => None,
        }
    }
}

/// Runs selections with the configured finder.
#[derive(Debug, Clone)]
pub struct Selector {
    finder: Option<Finder>,
    interactive: bool,
}

impl Selector {
    /// Build from the `fuzzy_finder` config key, probing `PATH`.
    ///
    /// A configured finder that isn't installed falls back to auto-detection.
    pub fn from_config(key: &str) -> Result<Self> {
        let finder = match Finder::parse(key)? {
            Some(f) if command_available(f.program()) => Some(f),
            Some(f) => {
                tracing::warn!(finder = f.program(), "Configured fuzzy finder not installed");
                Finder::detect(command_available)
            }
            None => Finder::detect(command_available),
        };
        Ok(Self::new(finder, io::stdin().is_terminal()))
    }

    pub fn new(finder: Option<Finder>, interactive: bool) -> Self {
        Self {
            finder,
            interactive,
        }
    }

    pub fn finder(&self) -> Option<Finder> {
        self.finder
    }

    /// Pick one item. `preview` is an fzf preview command with `{}` for the item.
    pub fn select(&self, items: &[String], prompt: &str, preview: Option<&str>) -> Result<Selection> {
        if items.is_empty() {
            return Err(Error::NothingToSelect);
        }
        let chosen = match self.finder {
            Some(finder) => run_finder(finder, prompt, preview, false, items.to_vec().into_iter())?,
            None => self.fallback(items, prompt, false)?,
        };
        Ok(first(chosen))
    }

    /// Pick any number of items. An empty result means nothing was chosen.
    pub fn select_many(
        &self,
        items: &[String],
        prompt: &str,
        preview: Option<&str>,
    ) -> Result<Vec<String>> {
        if items.is_empty() {
            return Err(Error::NothingToSelect);
        }
        match self.finder {
            Some(finder) => run_finder(finder, prompt, preview, true, items.to_vec().into_iter()),
            None => self.fallback(items, prompt, true),
        }
    }

    /// Pick a branch while it is still being produced.
    ///
    /// The producer is killed and reaped once the finder exits, whichever
    /// way it exits.
    pub fn select_stream(
        &self,
        stream: BranchStream,
        prompt: &str,
        preview: Option<&str>,
    ) -> Result<Selection> {
        let (lines, producer) = stream.into_parts();
        let mut lines = lines.peekable();
        if lines.peek().is_none() {
            producer.stop();
            return Err(Error::NothingToSelect);
        }

        let Some(finder) = self.finder else {
            // The numbered prompt needs the full list
            let items: Vec<String> = lines.collect();
            producer.stop();
            return Ok(first(self.fallback(&items, prompt, false)?));
        };

        let (result, pump) = spawn_finder(finder, prompt, preview, false, lines)?;
        producer.stop();
        if pump.join().is_err() {
            tracing::warn!("Selector input thread panicked");
        }
        Ok(first(result?))
    }

    fn fallback(&self, items: &[String], prompt: &str, multi: bool) -> Result<Vec<String>> {
        if !self.interactive {
            return Err(Error::Selector(
                "no fuzzy finder available (install fzf or peco)".to_string(),
            ));
        }
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stderr();
        prompt_numbered(items, prompt, multi, &mut input, &mut out)
    }
}

fn first(chosen: Vec<String>) -> Selection {
    chosen
        .into_iter()
        .next()
        .map(Selection::Selected)
        .unwrap_or(Selection::Cancelled)
}

/// Run the finder to completion, feeding it `items`.
fn run_finder(
    finder: Finder,
    prompt: &str,
    preview: Option<&str>,
    multi: bool,
    items: impl Iterator<Item = String> + Send + 'static,
) -> Result<Vec<String>> {
    let (result, pump) = spawn_finder(finder, prompt, preview, multi, items)?;
    if pump.join().is_err() {
        tracing::warn!("Selector input thread panicked");
    }
    result
}

/// Start the finder and its pump thread, then wait for the finder to exit.
///
/// The pump is returned unjoined so the caller can stop an upstream
/// producer first; a pump blocked on a dead finder's stdin errors out once
/// the pipe closes.
fn spawn_finder(
    finder: Finder,
    prompt: &str,
    preview: Option<&str>,
    multi: bool,
    items: impl Iterator<Item = String> + Send + 'static,
) -> Result<(Result<Vec<String>>, thread::JoinHandle<()>)> {
    let args = finder.args(prompt, preview, multi);
    tracing::debug!(finder = finder.program(), "Starting selector");

    let mut child = Command::new(finder.program())
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| Error::Selector(format!("failed to start {}: {e}", finder.program())))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Selector("finder stdin unavailable".to_string()))?;
    let pump = thread::spawn(move || {
        let mut stdin = io::BufWriter::new(stdin);
        for item in items {
            // The finder quit early; stop feeding it
            if writeln!(stdin, "{item}").and_then(|_| stdin.flush()).is_err() {
                return;
            }
        }
    });

    let mut stdout = String::new();
    let read = child
        .stdout
        .take()
        .map(|mut out| out.read_to_string(&mut stdout))
        .transpose();
    let status = child.wait();

    let result = match (read, status) {
        (Err(e), _) | (_, Err(e)) => Err(Error::Selector(format!("{} failed: {e}", finder.program()))),
        (Ok(_), Ok(status)) => interpret(finder, status.code(), &stdout),
    };
    Ok((result, pump))
}

/// Map a finder's exit to selected items. Cancellation yields an empty list.
fn interpret(finder: Finder, code: Option<i32>, stdout: &str) -> Result<Vec<String>> {
    if code == Some(0) {
        return Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect());
    }
    if finder.is_cancel_code(code) {
        tracing::debug!(finder = finder.program(), ?code, "Selection cancelled");
        return Ok(Vec::new());
    }
    Err(Error::Selector(match code {
        Some(code) => format!("{} exited with status {code}", finder.program()),
        None => format!("{} was terminated by a signal", finder.program()),
    }))
}

/// Numbered list on `out`, choice read from `input`.
///
/// Multi-select accepts numbers separated by spaces or commas. Empty input
/// cancels.
fn prompt_numbered(
    items: &[String],
    prompt: &str,
    multi: bool,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<Vec<String>> {
    writeln!(out, "{}", prompt.trim_end())?;
    for (i, item) in items.iter().enumerate() {
        writeln!(out, "{:>3}. {}", i + 1, item)?;
    }
    if multi {
        write!(out, "Enter numbers (1-{}), blank to cancel: ", items.len())?;
    } else {
        write!(out, "Enter number (1-{}), blank to cancel: ", items.len())?;
    }
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let picks: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if picks.is_empty() {
        return Ok(Vec::new());
    }
    if !multi && picks.len() > 1 {
        return Err(Error::Selector("expected a single number".to_string()));
    }

    let mut chosen = Vec::with_capacity(picks.len());
    for pick in picks {
        let index: usize = pick
            .parse()
            .map_err(|_| Error::Selector(format!("invalid selection: {pick}")))?;
        let item = index
            .checked_sub(1)
            .and_then(|i| items.get(i))
            .ok_or_else(|| Error::Selector(format!("selection out of range (1-{})", items.len())))?;
        if !chosen.contains(item) {
            chosen.push(item.clone());
        }
    }
    Ok(chosen)
}
