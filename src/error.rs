//! Error types shared by the parser, the redirector and the process launcher.

use nix::unistd::Pid;
use std::fmt;
use thiserror::Error;

/// Errors produced while turning a line into a [`crate::command::Command`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The line has more words than the configured limit.
    #[error("too many arguments: at most {limit} words are allowed")]
    ArgumentOverflow { limit: usize },
}

/// A line could not be read, but the shell can keep prompting.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("input is not valid UTF-8, line discarded")]
    InvalidEncoding,
}

/// Which standard stream a redirection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Input,
    Output,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Input => f.write_str("input"),
            Stream::Output => f.write_str("output"),
        }
    }
}

/// A redirection target could not be opened or installed.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("cannot open {path} for {stream}: {source}")]
    Open {
        stream: Stream,
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot redirect {stream}: {source}")]
    Dup {
        stream: Stream,
        #[source]
        source: nix::Error,
    },
}

/// Failures of the spawn/wait protocol as seen by the shell process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Process creation failed. Fatal to the shell.
    #[error("fork failed: {0}")]
    Fork(#[source] nix::Error),
    #[error("waitpid failed for pid {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: nix::Error,
    },
    /// A word cannot be handed to `execvp`.
    #[error("{0:?}: argument contains a NUL byte")]
    InvalidArgument(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    /// Whether the shell must stop after reporting this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LaunchError::Fork(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_operation() {
        let err = RedirectError::Open {
            stream: Stream::Input,
            path: "missing.txt".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot open missing.txt for input"));

        let overflow = ParseError::ArgumentOverflow { limit: 4 };
        assert_eq!(
            overflow.to_string(),
            "too many arguments: at most 4 words are allowed"
        );

        assert_eq!(
            InputError::InvalidEncoding.to_string(),
            "input is not valid UTF-8, line discarded"
        );
    }

    #[test]
    fn only_fork_failures_are_fatal() {
        assert!(LaunchError::Fork(nix::Error::EAGAIN).is_fatal());
        assert!(!LaunchError::InvalidArgument("a\0b".to_string()).is_fatal());
        assert!(
            !LaunchError::Wait {
                pid: Pid::from_raw(1),
                source: nix::Error::ECHILD
            }
            .is_fatal()
        );
    }
}
