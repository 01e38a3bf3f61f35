use std::{
    io::{self, Write},
    result::Result as StdResult,
    time::Duration,
};

use crossterm::terminal;
use indicatif::{ProgressBar, ProgressStyle};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use thiserror::Error;

/// Indentation level (in spaces) used for nested output sections.
const INDENT: usize = 4;

/// Width assumed when the terminal size cannot be queried.
const FALLBACK_WIDTH: usize = 80;

/// Narrowest column wrapped text is squeezed into.
const MIN_WIDTH: usize = 20;

/// Interval between spinner frames.
const SPINNER_TICK: Duration = Duration::from_millis(80);

/// Errors produced by [`Output`] implementations.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Underlying I/O error while writing to the terminal.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Convenience alias for output-related fallible operations.
pub type Result<T> = StdResult<T, OutputError>;

/// Abstraction over how user-facing messages are produced.
pub trait Output: Send + Sync {
    /// Print an informational message.
    fn message(&self, msg: &str) -> Result<()>;
    /// Print a success message.
    fn success(&self, msg: &str) -> Result<()>;
    /// Print a warning message.
    fn warn(&self, msg: &str) -> Result<()>;
    /// Print an error/failure message.
    fn fail(&self, msg: &str) -> Result<()>;
    /// Print a `label: value` line with the label emphasized.
    fn item(&self, label: &str, value: &str) -> Result<()>;
    /// Flush any buffered output.
    fn finish(&self) -> Result<()>;
    /// Create a nested output section that indents subsequent messages.
    fn section(&self, header: &str) -> Box<dyn Output>;
    /// Start a spinner for a long-running step.
    fn spinner(&self, msg: &str) -> Spinner;
}

/// Output implementation that suppresses all messages.
pub struct Quiet;

impl Output for Quiet {
    fn message(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn success(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn warn(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn fail(&self, _msg: &str) -> Result<()> {
        Ok(())
    }

    fn item(&self, _label: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        Ok(())
    }

    fn section(&self, _header: &str) -> Box<dyn Output> {
        Box::new(Self)
    }

    fn spinner(&self, _msg: &str) -> Spinner {
        Spinner::hidden()
    }
}

/// Progress indicator for one step; print its outcome with a `finish_*` call.
pub struct Spinner {
    /// Animated bar, absent for quiet output.
    bar: Option<ProgressBar>,
    /// Renderer for the final status line.
    printer: Option<Terminal>,
}

impl Spinner {
    /// A spinner that draws nothing.
    fn hidden() -> Self {
        Self {
            bar: None,
            printer: None,
        }
    }

    /// Stop the animation and remove it from the screen.
    fn stop(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Stop and print `msg` as a failure line.
    pub fn finish_fail(self, msg: &str) {
        self.stop();
        if let Some(printer) = &self.printer {
            let _ = printer.fail(msg);
        }
    }

    /// Stop without printing anything.
    pub fn finish_clear(self) {
        self.stop();
    }
}

/// Color-capable terminal renderer for user messages.
#[derive(Debug, Clone)]
pub struct Terminal {
    /// Whether to emit ANSI color sequences.
    color_choice: ColorChoice,
    /// Current indentation depth in spaces.
    indent: usize,
    /// Fixed wrap width; queried from the terminal when `None`.
    width: Option<usize>,
}

impl Terminal {
    /// Create a new terminal output.
    ///
    /// - `color`: when `true`, always render colored output; when `false`,
    ///   disable ANSI colors.
    pub fn new(color: bool) -> Self {
        let color_choice = if color {
            ColorChoice::Always
        } else {
            ColorChoice::Never
        };
        Self {
            color_choice,
            indent: 0,
            width: None,
        }
    }

    /// Wrap at `width` columns instead of the terminal's width.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }

    /// Columns available to text at the current indentation.
    fn text_width(&self) -> usize {
        let total = self.width.unwrap_or_else(|| {
            terminal::size()
                .map(|(cols, _)| usize::from(cols))
                .unwrap_or(FALLBACK_WIDTH)
        });
        total.saturating_sub(self.indent).max(MIN_WIDTH)
    }

    /// Split `msg` into indented lines that fit the terminal.
    fn lines(&self, msg: &str) -> Vec<String> {
        let pad = " ".repeat(self.indent);
        wrap_lines(msg, self.text_width())
            .into_iter()
            .map(|line| format!("{pad}{line}"))
            .collect()
    }

    /// Indent each line of `msg` without wrapping.
    fn indented(&self, msg: &str) -> Vec<String> {
        let pad = " ".repeat(self.indent);
        msg.lines().map(|line| format!("{pad}{line}")).collect()
    }

    /// Write `msg` using `color` to stdout, or unwrapped to stderr when
    /// `to_stderr`.
    fn write_colored(&self, msg: &str, color: Color, to_stderr: bool) -> Result<()> {
        let (mut stream, lines) = if to_stderr {
            (StandardStream::stderr(self.color_choice), self.indented(msg))
        } else {
            (StandardStream::stdout(self.color_choice), self.lines(msg))
        };
        stream.set_color(ColorSpec::new().set_fg(Some(color)))?;
        for line in lines {
            writeln!(stream, "{line}")?;
        }
        stream.reset()?;
        stream.flush()?;
        Ok(())
    }
}

impl Output for Terminal {
    fn message(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Cyan, false)
    }

    fn success(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Green, false)
    }

    fn warn(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Rgb(255, 165, 0), false) // Orange
    }

    fn fail(&self, msg: &str) -> Result<()> {
        self.write_colored(msg, Color::Red, true)
    }

    fn item(&self, label: &str, value: &str) -> Result<()> {
        let mut stdout = StandardStream::stdout(self.color_choice);
        stdout.set_color(ColorSpec::new().set_bold(true))?;
        write!(stdout, "{}{label}:", " ".repeat(self.indent))?;
        stdout.reset()?;
        writeln!(stdout, " {value}")?;
        stdout.flush()?;
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        io::stdout().flush()?;
        io::stderr().flush()?;
        Ok(())
    }

    fn section(&self, header: &str) -> Box<dyn Output> {
        // A header that fails to print still yields a usable section.
        let _ = self.message(header);
        Box::new(Self {
            indent: self.indent + INDENT,
            ..self.clone()
        })
    }

    fn spinner(&self, msg: &str) -> Spinner {
        let style = ProgressStyle::with_template(&format!(
            "{}{{spinner:.cyan}} {{msg}}",
            " ".repeat(self.indent)
        ))
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner()
            .with_style(style)
            .with_message(msg.to_string());
        bar.enable_steady_tick(SPINNER_TICK);

        Spinner {
            bar: Some(bar),
            printer: Some(self.clone()),
        }
    }
}

/// Wrap `msg` to `width` columns, breaking only at spaces so paths and
/// hyphenated names stay whole. Embedded newlines are kept.
fn wrap_lines(msg: &str, width: usize) -> Vec<String> {
    let options = textwrap::Options::new(width.max(1))
        .break_words(false)
        .word_separator(textwrap::WordSeparator::AsciiSpace)
        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
    textwrap::wrap(msg, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect()
}
