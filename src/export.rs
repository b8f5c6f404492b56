//! Export and copy the selection set.
//!
//! [`write_export`] renders the selection as CSV or JSON and writes it to a
//! file or stdout. [`SystemClipboard`] and [`StdoutSink`] are the two
//! [`ClipboardSink`]s used by the shell's `copy` command: the system
//! clipboard first, the terminal as the fallback.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use targeting_finder_core::export::{copy_to_clipboard, ClipboardSink, CopyOutcome, ExportFormat};
use targeting_finder_core::models::TaxonomyItem;

/// Render `items` in `format` and write them out.
///
/// If `output` is `Some`, writes to that file path (creating parent
/// directories). Otherwise writes to stdout for piping.
pub fn write_export(
    items: &[TaxonomyItem],
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let text = format.render(items)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} entries to {}", items.len(), path.display());
        }
        None => {
            println!("{}", text);
        }
    }

    Ok(())
}

/// Copy `items` as JSON: system clipboard first, stdout otherwise.
pub fn copy_selection(items: &[TaxonomyItem]) -> Result<CopyOutcome> {
    copy_to_clipboard(items, &SystemClipboard::default(), &StdoutSink)
}

/// Pipes text into the first clipboard utility that accepts it.
pub struct SystemClipboard {
    commands: Vec<Vec<String>>,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        let commands: &[&[&str]] = &[
            &["pbcopy"],
            &["wl-copy"],
            &["xclip", "-selection", "clipboard"],
            &["xsel", "--clipboard", "--input"],
            &["clip.exe"],
        ];
        Self::with_commands(
            commands
                .iter()
                .map(|argv| argv.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }
}

impl SystemClipboard {
    pub fn with_commands(commands: Vec<Vec<String>>) -> Self {
        Self { commands }
    }

    fn pipe_to(argv: &[String], text: &str) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("empty clipboard command"))?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if !status.success() {
            bail!("{} exited with {}", program, status);
        }
        Ok(())
    }
}

impl ClipboardSink for SystemClipboard {
    fn name(&self) -> &str {
        "system clipboard"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        for argv in &self.commands {
            match Self::pipe_to(argv, text) {
                Ok(()) => return Ok(()),
                Err(e) => tracing::debug!(command = ?argv, error = %e, "clipboard command failed"),
            }
        }
        bail!("no clipboard utility available")
    }
}

/// Prints the text to stdout so the user can copy it by hand.
pub struct StdoutSink;

impl ClipboardSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", text)?;
        out.flush()?;
        Ok(())
    }
}
