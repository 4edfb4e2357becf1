// Console progress output: run banner, per-case progress lines, isolation summary.
use std::io::{self, Write};

use crate::core::cases::TestCase;
use crate::core::error::Error;

/// ANSI foreground colors used on the console.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AnsiColor {
    Red,
    Yellow,
    Magenta,
}

impl AnsiColor {
    fn code(self) -> &'static str {
        match self {
            AnsiColor::Red => "31",
            AnsiColor::Yellow => "33",
            AnsiColor::Magenta => "35",
        }
    }
}

pub struct Reporter<W: Write> {
    out: W,
    use_color: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, use_color: bool) -> Self {
        Self { out, use_color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn banner(&mut self, solver: &str) -> io::Result<()> {
        let text = paint(&format!("=== Running cases with {solver} ==="), AnsiColor::Magenta, self.use_color);
        writeln!(self.out, "\n{text}")?;
        self.out.flush()
    }

    // Flushed before the submit so callee output lands after its progress line.
    pub fn case_started(&mut self, case: &TestCase) -> io::Result<()> {
        let name = paint(case.name(), AnsiColor::Yellow, self.use_color);
        writeln!(self.out, "\nProcessing: {name}")?;
        self.out.flush()
    }

    pub fn case_faulted(&mut self, case: &TestCase, err: &Error) -> io::Result<()> {
        let label = paint("fault:", AnsiColor::Red, self.use_color);
        let detail = err.message().unwrap_or("boundary fault");
        writeln!(self.out, "{label} {} ({detail})", case.name())?;
        self.out.flush()
    }

    pub fn list_entry(&mut self, case: &TestCase) -> io::Result<()> {
        writeln!(self.out, "{}", case.name())
    }

    pub fn summary(&mut self, submitted: usize, total: usize, faulted: &[String]) -> io::Result<()> {
        writeln!(
            self.out,
            "\nSubmitted {submitted} of {total} cases, {} faulted",
            faulted.len()
        )?;
        for name in faulted {
            let label = paint("fault:", AnsiColor::Red, self.use_color);
            writeln!(self.out, "  {label} {name}")?;
        }
        self.out.flush()
    }
}

/// Wraps `text` in an ANSI color escape when `use_color` is set.
pub fn paint(text: &str, color: AnsiColor, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    format!("\u{1b}[{}m{text}\u{1b}[0m", color.code())
}
