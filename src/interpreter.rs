use crate::command::{CommandFactory, ExecutableCommand, Flow};
use crate::error::InputError;
use crate::parser::{DEFAULT_MAX_WORDS, Parser};
use crate::signals::ToggleWindow;
use crate::state::ShellState;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::collections::VecDeque;
use std::io::{self, Stderr, Stdout, Write};

/// Default prompt printed before each line.
pub const DEFAULT_PROMPT: &str = ": ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: the built-ins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Source of input lines for the shell loop.
pub trait LineSource {
    /// Read one line, showing `prompt` first. `Ok(None)` means end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Interactive input with history.
pub struct Editor {
    inner: DefaultEditor,
    history: bool,
}

impl Editor {
    pub fn new(history: bool) -> Result<Self> {
        let inner = DefaultEditor::new().context("cannot initialise line editor")?;
        Ok(Self { inner, history })
    }
}

impl LineSource for Editor {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.inner.readline(prompt) {
            Ok(line) => {
                if self.history && !line.trim().is_empty() {
                    self.inner.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            Err(err) => read_failure(err),
        }
    }
}

/// Map a failed read to what the loop should do with it.
fn read_failure(err: ReadlineError) -> Result<Option<String>> {
    match err {
        // An interrupt at the prompt only discards the current line.
        ReadlineError::Interrupted => Ok(Some(String::new())),
        ReadlineError::Eof => Ok(None),
        ReadlineError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
            Err(InputError::InvalidEncoding.into())
        }
        err => Err(err).context("cannot read input"),
    }
}

/// Lines supplied up front, for tests and scripted runs.
#[derive(Debug, Default)]
pub struct Script {
    lines: VecDeque<String>,
}

impl Script {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Lines not consumed yet.
    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineSource for Script {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// The shell loop: read a line, parse it, dispatch it, reap background jobs.
///
/// Built-ins are tried first, in registration order; anything else is run as
/// an external program. `out` receives the shell's own messages and `err`
/// its diagnostics.
///
/// Example
/// ```
/// use smallsh::Interpreter;
/// let mut sh = Interpreter::new(Vec::new(), Vec::new());
/// sh.execute_line("status").unwrap();
/// assert_eq!(sh.output(), b"exit value 0\n");
/// ```
pub struct Interpreter<O: Write = Stdout, E: Write = Stderr> {
    state: ShellState,
    parser: Parser,
    prompt: String,
    commands: Vec<Box<dyn CommandFactory>>,
    out: O,
    err: E,
}

impl<O: Write, E: Write> Interpreter<O, E> {
    /// Create an interpreter with the default command set writing to `out`/`err`.
    pub fn new(out: O, err: E) -> Self {
        use crate::builtin::*;
        use crate::launcher::ExternalCommand;
        Self::with_commands(
            vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Status>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<ExternalCommand>::default()),
            ],
            out,
            err,
        )
    }

    /// Create an interpreter with a custom set of command factories.
    pub fn with_commands(commands: Vec<Box<dyn CommandFactory>>, out: O, err: E) -> Self {
        Self {
            state: ShellState::new(),
            parser: Parser::for_current_process(DEFAULT_MAX_WORDS),
            prompt: DEFAULT_PROMPT.to_string(),
            commands,
            out,
            err,
        }
    }

    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_state(mut self, state: ShellState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &ShellState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ShellState {
        &mut self.state
    }

    pub fn output(&self) -> &O {
        &self.out
    }

    pub fn errors(&self) -> &E {
        &self.err
    }

    /// Run the loop until `exit` or end of input.
    ///
    /// The foreground-toggle signal is only deliverable while waiting for a
    /// line. Background jobs are killed before returning, also when a fatal
    /// error ends the loop early.
    pub fn repl(&mut self, input: &mut dyn LineSource) -> Result<()> {
        let result = self.run_loop(input);
        self.shutdown();
        result
    }

    fn run_loop(&mut self, input: &mut dyn LineSource) -> Result<()> {
        loop {
            self.out.flush()?;
            let read = {
                let _window = ToggleWindow::open().context("cannot unblock toggle signal")?;
                input.read_line(&self.prompt)
            };
            let line = match read {
                Ok(line) => line,
                Err(e) if e.downcast_ref::<InputError>().is_some() => {
                    warn!("{}", e);
                    writeln!(self.err, "{e}")?;
                    continue;
                }
                Err(e) => return Err(e),
            };
            let Some(line) = line else {
                info!("end of input");
                return Ok(());
            };
            if self.execute_line(&line)? == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Parse and dispatch one line, then sweep background jobs.
    ///
    /// Returns `Err` only for failures that must end the shell.
    pub fn execute_line(&mut self, line: &str) -> Result<Flow> {
        let flow = match self.parser.parse(line) {
            Ok(command) if command.is_dispatchable() => {
                let cmd = self.commands.iter().find_map(|f| f.try_create(&command));
                match cmd {
                    Some(cmd) => self.dispatch(cmd)?,
                    None => {
                        writeln!(self.err, "{}: command not found", command.words[0])?;
                        Flow::Continue
                    }
                }
            }
            Ok(command) => {
                debug!("skipping {:?} line", command.classification);
                Flow::Continue
            }
            Err(e) => {
                writeln!(self.err, "{e}")?;
                Flow::Continue
            }
        };
        self.report_background()?;
        Ok(flow)
    }

    fn dispatch(&mut self, cmd: Box<dyn ExecutableCommand>) -> Result<Flow> {
        cmd.execute(&mut self.out, &mut self.err, &mut self.state)
    }

    /// Reap finished background jobs and print one line per job.
    fn report_background(&mut self) -> Result<()> {
        for event in self.state.jobs.reap_sweep() {
            writeln!(self.out, "{event}")?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Kill every tracked background job.
    pub fn shutdown(&mut self) {
        if !self.state.jobs.is_empty() {
            info!("terminating {} background job(s)", self.state.jobs.len());
        }
        self.state.jobs.terminate_all();
        let _ = self.out.flush();
    }
}

impl Default for Interpreter {
    /// Interpreter on the process's stdout and stderr.
    fn default() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}
