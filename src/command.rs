use crate::state::ShellState;
use anyhow::Result;
use nix::sys::wait::WaitStatus;
use std::fmt;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// What the shell loop should do after a command ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Object-safe trait for anything the shell can dispatch a command to.
///
/// Implemented by the built-ins and by the external program launcher.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// `out` receives the shell's own messages, `err` its diagnostics. An
    /// `Err` return is fatal to the shell; recoverable failures are reported
    /// on `err` and return `Ok`.
    fn execute(
        self: Box<Self>,
        out: &mut dyn Write,
        err: &mut dyn Write,
        state: &mut ShellState,
    ) -> Result<Flow>;
}

/// Factory that tries to create a command from a parsed line.
///
/// Returns `None` when the factory doesn't recognize the command name.
pub trait CommandFactory {
    fn try_create(&self, command: &Command) -> Option<Box<dyn ExecutableCommand>>;
}

/// How a parsed line should be treated by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// A regular command with at least one word.
    Normal,
    /// A blank line. Never dispatched.
    Empty,
    /// A line starting with `#`. Never dispatched.
    Comment,
}

/// One parsed user request.
///
/// Built fresh for every input line by [`crate::parser::Parser`] and consumed
/// once by the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program or built-in name followed by its arguments.
    pub words: Vec<String>,
    /// File named after `<`, if any.
    pub input_path: Option<String>,
    /// File named after `>`, if any.
    pub output_path: Option<String>,
    /// True when the line ended with a standalone `&`.
    pub background: bool,
    pub classification: Classification,
}

impl Command {
    pub(crate) fn normal() -> Self {
        Self {
            words: Vec::new(),
            input_path: None,
            output_path: None,
            background: false,
            classification: Classification::Normal,
        }
    }

    pub fn empty() -> Self {
        Self {
            classification: Classification::Empty,
            ..Self::normal()
        }
    }

    pub fn comment() -> Self {
        Self {
            classification: Classification::Comment,
            ..Self::normal()
        }
    }

    /// Whether the interpreter should act on this command at all.
    pub fn is_dispatchable(&self) -> bool {
        self.classification == Classification::Normal && !self.words.is_empty()
    }

    /// The program or built-in name, `words[0]`.
    pub fn name(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    /// Everything after the program name.
    pub fn args(&self) -> &[String] {
        self.words.get(1..).unwrap_or(&[])
    }
}

/// How a child process ended: exactly one of an exit code or a signal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(ExitCode),
    Signaled(i32),
}

impl Termination {
    /// Decode a wait status. Returns `None` for statuses that do not mean the
    /// process is gone (still alive, stopped, continued).
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Termination::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Termination::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl Default for Termination {
    fn default() -> Self {
        Termination::Exited(0)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Exited(code) => write!(f, "exit value {code}"),
            Termination::Signaled(signal) => write!(f, "terminated by signal {signal}"),
        }
    }
}
