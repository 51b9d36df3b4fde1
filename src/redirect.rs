//! Standard input/output setup performed in a child before it execs.

use crate::command::Command;
use crate::error::{RedirectError, Stream};
use nix::unistd::{dup2_stdin, dup2_stdout};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;

/// Source/sink used for unredirected background streams.
pub const NULL_DEVICE: &str = "/dev/null";

/// Permission bits for files created by `>`.
const OUTPUT_MODE: u32 = 0o644;

/// Where one standard stream should point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(String),
    Null,
}

impl Target {
    fn path(&self) -> &str {
        match self {
            Target::File(path) => path,
            Target::Null => NULL_DEVICE,
        }
    }
}

/// The redirections a command needs, decided before forking.
///
/// `None` means the stream is inherited from the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPlan {
    pub stdin: Option<Target>,
    pub stdout: Option<Target>,
}

impl RedirectPlan {
    /// Decide the plan for `command` running in `background` mode.
    ///
    /// `background` must be the effective mode, after foreground-only mode has
    /// been applied, not the parsed flag.
    pub fn new(command: &Command, background: bool) -> Self {
        let pick = |path: &Option<String>| match path {
            Some(path) => Some(Target::File(path.clone())),
            None if background => Some(Target::Null),
            None => None,
        };
        Self {
            stdin: pick(&command.input_path),
            stdout: pick(&command.output_path),
        }
    }

    /// Install the plan on the calling process: input first, then output.
    pub fn apply(&self) -> Result<(), RedirectError> {
        if let Some(target) = &self.stdin {
            let file = open_input(target.path())?;
            dup2_stdin(&file).map_err(|source| RedirectError::Dup {
                stream: Stream::Input,
                source,
            })?;
        }
        if let Some(target) = &self.stdout {
            let file = open_output(target.path())?;
            dup2_stdout(&file).map_err(|source| RedirectError::Dup {
                stream: Stream::Output,
                source,
            })?;
        }
        Ok(())
    }
}

/// Open `path` read-only.
pub fn open_input(path: &str) -> Result<File, RedirectError> {
    File::open(path).map_err(|source| RedirectError::Open {
        stream: Stream::Input,
        path: path.to_string(),
        source,
    })
}

/// Open `path` write-only, creating it with mode 0644 or truncating it.
pub fn open_output(path: &str) -> Result<File, RedirectError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(OUTPUT_MODE)
        .open(path)
        .map_err(|source| RedirectError::Open {
            stream: Stream::Output,
            path: path.to_string(),
            source,
        })
}
