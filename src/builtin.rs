use crate::command::{Command, CommandFactory, ExecutableCommand, Flow};
use crate::interpreter::Factory;
use crate::state::ShellState;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use log::info;
use std::env;
use std::io::Write;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process, never in a child. They ignore redirections and the
/// background marker, and never change the last foreground status.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd" or "status".
    fn name() -> &'static str;

    /// Whether arguments are dropped instead of parsed.
    fn ignores_args() -> bool {
        false
    }

    /// Executes the command against the shell state.
    fn execute(self, out: &mut dyn Write, state: &mut ShellState) -> Result<Flow>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        out: &mut dyn Write,
        err: &mut dyn Write,
        state: &mut ShellState,
    ) -> Result<Flow> {
        match T::execute(*self, out, state) {
            Ok(flow) => Ok(flow),
            Err(e) => {
                writeln!(err, "{e:#}")?;
                Ok(Flow::Continue)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        out: &mut dyn Write,
        err: &mut dyn Write,
        _state: &mut ShellState,
    ) -> Result<Flow> {
        let text = self.output.trim_end();
        if self.is_error {
            writeln!(err, "{text}")?;
        } else {
            writeln!(out, "{text}")?;
        }
        Ok(Flow::Continue)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(&self, command: &Command) -> Option<Box<dyn ExecutableCommand>> {
        let name = command.name()?;
        if name != T::name() {
            return None;
        }
        let args: Vec<&str> = if T::ignores_args() {
            Vec::new()
        } else {
            command.args().iter().map(String::as_str).collect()
        };
        Some(match T::from_args(&[name], &args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _out: &mut dyn Write, state: &mut ShellState) -> Result<Flow> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => state
                .home_dir()
                .ok_or_else(|| anyhow::anyhow!("cd: no target and HOME not set"))?,
        };

        env::set_current_dir(&target).with_context(|| format!("cd: {}", target.display()))?;
        info!("working directory is now {}", target.display());
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Print how the last foreground command ended. Arguments are ignored.
pub struct Status {}

impl BuiltinCommand for Status {
    fn name() -> &'static str {
        "status"
    }

    fn ignores_args() -> bool {
        true
    }

    fn execute(self, out: &mut dyn Write, state: &mut ShellState) -> Result<Flow> {
        writeln!(out, "{}", state.last_termination())?;
        Ok(Flow::Continue)
    }
}

#[derive(FromArgs)]
/// Exit the shell, killing every background job first. Arguments are ignored.
pub struct Exit {}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn ignores_args() -> bool {
        true
    }

    fn execute(self, _out: &mut dyn Write, _state: &mut ShellState) -> Result<Flow> {
        Ok(Flow::Exit)
    }
}
