use crate::command::Termination;
use crate::jobs::JobRegistry;
use crate::signals::ForegroundMode;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Process-wide shell state, owned by the interpreter loop.
///
/// The state contains:
/// - `vars`: snapshot of the environment the shell was started with.
/// - the result of the last foreground external command.
/// - `jobs`: background children that have not been reaped yet.
/// - `mode`: the foreground-only flag shared with the signal handler.
#[derive(Debug)]
pub struct ShellState {
    pub vars: HashMap<String, String>,
    pub jobs: JobRegistry,
    pub mode: ForegroundMode,
    last: Termination,
}

impl ShellState {
    /// Capture the current process environment.
    pub fn new() -> Self {
        Self::with_vars(stdenv::vars().collect())
    }

    /// State with an explicit variable set, used by tests and embedders.
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self {
            vars,
            jobs: JobRegistry::new(),
            mode: ForegroundMode::new(),
            last: Termination::default(),
        }
    }

    /// Get the value of a variable from the snapshot.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Set or override a variable in the snapshot.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Directory `cd` switches to when given no argument.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }

    /// Whether commands must run in the foreground regardless of `&`.
    pub fn foreground_only(&self) -> bool {
        self.mode.is_enabled()
    }

    /// Result of the most recent foreground external command.
    ///
    /// `exit value 0` until one has run.
    pub fn last_termination(&self) -> Termination {
        self.last
    }

    /// Record a foreground completion, replacing the previous one.
    pub fn record(&mut self, termination: Termination) {
        self.last = termination;
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_set_and_get_var() {
        let mut state = ShellState::with_vars(HashMap::new());
        assert_eq!(state.get_var("SOME_RANDOM_ENV_VAR_12345"), None);
        state.set_var("KEY", "VALUE");
        assert_eq!(state.get_var("KEY"), Some("VALUE"));
    }

    #[test]
    fn test_state_reads_from_process_env() {
        let state = ShellState::new();
        assert!(state.get_var("PATH").is_some());
    }

    #[test]
    fn test_home_dir() {
        let mut state = ShellState::with_vars(HashMap::new());
        assert_eq!(state.home_dir(), None);
        state.set_var("HOME", "");
        assert_eq!(state.home_dir(), None);
        state.set_var("HOME", "/home/user");
        assert_eq!(state.home_dir(), Some(PathBuf::from("/home/user")));
    }

    #[test]
    fn test_last_termination_defaults_to_success() {
        let mut state = ShellState::with_vars(HashMap::new());
        assert_eq!(state.last_termination(), Termination::Exited(0));
        state.record(Termination::Signaled(2));
        assert_eq!(state.last_termination(), Termination::Signaled(2));
        state.record(Termination::Exited(3));
        assert_eq!(state.last_termination(), Termination::Exited(3));
    }
}
