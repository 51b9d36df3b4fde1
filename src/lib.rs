//! A small interactive shell with redirection, background jobs and a
//! foreground-only mode.
//!
//! One line of input is parsed into a [`command::Command`]. The built-ins
//! `exit`, `status` and `cd` run in-process; anything else is forked and
//! exec'd, either waited for or tracked as a background job that is reaped
//! between commands.
//!
//! The main entry point is [`Interpreter`], which owns the [`state::ShellState`]
//! and drives the read/parse/dispatch/reap loop.

mod builtin;
pub mod command;
pub mod config;
pub mod error;
pub mod expand;
mod interpreter;
pub mod jobs;
pub mod launcher;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod redirect;
pub mod signals;
pub mod state;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{DEFAULT_PROMPT, Editor, Interpreter, LineSource, Script};
