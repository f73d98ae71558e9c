//! Interactive editing support
//!
//! Note bodies are edited in $EDITOR below a block of `<!-- -->` hint
//! lines. Only that leading block is removed afterwards; comments inside
//! the body are kept.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::process::Command;

const HINT_OPEN: &str = "<!--";
const HINT_CLOSE: &str = "-->";

/// Tried in order when neither $EDITOR nor $VISUAL is set
const FALLBACK_EDITORS: &[&str] = &["nano", "vim", "vi"];

/// Hint header plus the note body, as laid out in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditBuffer {
    pub hints: Vec<String>,
    pub body: String,
}

impl EditBuffer {
    pub fn new(hints: &[&str], body: &str) -> Self {
        Self {
            hints: hints.iter().map(|h| h.to_string()).collect(),
            body: body.to_string(),
        }
    }

    pub fn to_buffer(&self) -> String {
        let mut buffer = String::new();
        for hint in &self.hints {
            buffer.push_str(&format!("{} {} {}\n", HINT_OPEN, hint, HINT_CLOSE));
        }
        buffer.push('\n');
        buffer.push_str(&self.body);
        buffer
    }

    /// Split an edited buffer into its leading hint block and the body
    ///
    /// The body is trimmed. Blank lines between hints belong to the header.
    pub fn from_buffer(buffer: &str) -> Self {
        let mut hints = Vec::new();
        let mut rest = buffer;

        while !rest.is_empty() {
            let (line, tail) = match rest.find('\n') {
                Some(end) => (&rest[..end], &rest[end + 1..]),
                None => (rest, ""),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                rest = tail;
                continue;
            }
            match hint_text(trimmed) {
                Some(hint) => {
                    hints.push(hint.to_string());
                    rest = tail;
                }
                None => break,
            }
        }

        Self {
            hints,
            body: rest.trim().to_string(),
        }
    }
}

/// Text of a single-line `<!-- ... -->` comment
fn hint_text(line: &str) -> Option<&str> {
    line.strip_prefix(HINT_OPEN)?
        .strip_suffix(HINT_CLOSE)
        .map(str::trim)
}

/// Edit `body` below the given hints; returns the trimmed body
pub fn edit_with_hints(hints: &[&str], body: &str) -> Result<String> {
    let edited = edit_text(&EditBuffer::new(hints, body).to_buffer())?;
    Ok(EditBuffer::from_buffer(&edited).body)
}

/// Open `initial` in the user's editor and return what was saved
pub fn edit_text(initial: &str) -> Result<String> {
    let editor = EditorCommand::resolve(|name| env::var(name).ok(), command_exists)?;

    let file = tempfile::Builder::new()
        .prefix("eduverse_edit_")
        .suffix(".md")
        .tempfile()
        .context("Failed to create a scratch file for the editor")?;
    fs::write(file.path(), initial)
        .with_context(|| format!("Failed to write {:?}", file.path()))?;

    let status = Command::new(&editor.program)
        .args(&editor.args)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor.program))?;
    if !status.success() {
        bail!(
            "Editor '{}' exited with {}; the note was not changed",
            editor.program,
            status
        );
    }

    fs::read_to_string(file.path())
        .with_context(|| format!("Failed to read edited file {:?}", file.path()))
}

/// Program and leading arguments, e.g. `code --wait`
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditorCommand {
    program: String,
    args: Vec<String>,
}

impl EditorCommand {
    fn resolve(
        var: impl Fn(&str) -> Option<String>,
        installed: impl Fn(&str) -> bool,
    ) -> Result<Self> {
        let configured = ["EDITOR", "VISUAL"]
            .iter()
            .filter_map(|name| var(name))
            .find_map(|value| Self::parse(&value));
        if let Some(command) = configured {
            return Ok(command);
        }

        FALLBACK_EDITORS
            .iter()
            .find(|name| installed(name))
            .and_then(|name| Self::parse(name))
            .context("No editor found. Set $EDITOR (for example `export EDITOR=nano`) or pass --body")
    }

    fn parse(value: &str) -> Option<Self> {
        let mut parts = value.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Ask a yes/no question; anything but `y` or `yes` is no
///
/// Without a terminal on stdin nothing is asked and the answer is no.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let answer = read_answer(&mut io::stdin().lock())?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Read one line from stdin after printing `prompt` to stderr
///
/// Used for the password when it is not passed as a flag. Input is echoed.
pub fn prompt_line(prompt: &str) -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        eprint!("{}", prompt);
        io::stderr().flush()?;
    }

    let value = read_answer(&mut io::stdin().lock())?;
    if value.is_empty() {
        bail!("No input given");
    }
    Ok(value)
}

fn read_answer(reader: &mut impl BufRead) -> Result<String> {
    let mut input = String::new();
    reader
        .read_line(&mut input)
        .context("Failed to read from stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}
