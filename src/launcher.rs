//! Spawning external programs: fork, redirect, exec, then wait or background.

use crate::command::{Command, CommandFactory, ExecutableCommand, Flow, Termination};
use crate::error::LaunchError;
use crate::interpreter::Factory;
use crate::redirect::RedirectPlan;
use crate::signals;
use crate::state::ShellState;
use anyhow::Result;
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::libc::STDERR_FILENO;
use nix::sys::wait::waitpid;
use nix::unistd::{ForkResult, Pid, execvp, fork};
use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::BorrowedFd;

/// Command that is not a builtin.
pub struct ExternalCommand {
    command: Command,
}

impl ExternalCommand {
    pub fn new(command: Command) -> Self {
        Self { command }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(&self, command: &Command) -> Option<Box<dyn ExecutableCommand>> {
        command
            .is_dispatchable()
            .then(|| Box::new(ExternalCommand::new(command.clone())) as Box<dyn ExecutableCommand>)
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        out: &mut dyn Write,
        err: &mut dyn Write,
        state: &mut ShellState,
    ) -> Result<Flow> {
        match spawn(&self.command, state, out) {
            Ok(()) => Ok(Flow::Continue),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!("{}", e);
                writeln!(err, "{e}")?;
                Ok(Flow::Continue)
            }
        }
    }
}

/// Run `command` as a child process.
///
/// Foreground-only mode is read here, once, to settle the effective
/// background mode. Returns after the child finished (foreground) or right
/// after it was registered (background).
pub fn spawn(
    command: &Command,
    state: &mut ShellState,
    out: &mut dyn Write,
) -> Result<(), LaunchError> {
    let background = command.background && !state.foreground_only();
    if command.background && !background {
        info!("foreground-only mode: running {:?} in the foreground", command.words);
    }
    let argv = exec_args(&command.words)?;
    let plan = RedirectPlan::new(command, background);

    out.flush()?;
    io::stdout().flush()?;

    // SAFETY: the child branch only runs `launch_child`, which execs or exits
    // without returning into the caller.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => launch_child(&argv, &plan, background),
        Ok(ForkResult::Parent { child }) => {
            debug!("forked pid {} for {:?} (background: {})", child, command.words, background);
            after_spawn(child, background, state, out)
        }
        Err(e) => Err(LaunchError::Fork(e)),
    }
}

/// Child side of [`spawn`]: signals, redirections, then exec.
///
/// Never returns. Any failure is reported on stderr and ends the child with
/// status 1.
pub fn launch_child(argv: &[CString], plan: &RedirectPlan, background: bool) -> ! {
    if let Err(e) = signals::prepare_child(background) {
        die(&format!("signal setup: {e}"));
    }
    if let Err(e) = plan.apply() {
        die(&e.to_string());
    }
    let Some(program) = argv.first() else {
        die("empty command");
    };
    let error = match execvp(program, argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    die(&format!("{}: {}", program.to_string_lossy(), error))
}

/// Parent side of [`spawn`].
///
/// Background children are announced and registered. Foreground children are
/// waited for and their termination becomes the shell's last status.
pub fn after_spawn(
    pid: Pid,
    background: bool,
    state: &mut ShellState,
    out: &mut dyn Write,
) -> Result<(), LaunchError> {
    if background {
        state.jobs.append(pid);
        writeln!(out, "background pid is {pid}")?;
        return Ok(());
    }

    let termination = wait_foreground(pid)?;
    info!("foreground pid {} finished: {}", pid, termination);
    state.record(termination);
    if let Termination::Signaled(_) = termination {
        writeln!(out, "pid {pid} {termination}")?;
    }
    Ok(())
}

/// Block until `pid`, and only `pid`, terminates.
fn wait_foreground(pid: Pid) -> Result<Termination, LaunchError> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(termination) = Termination::from_wait_status(status) {
                    return Ok(termination);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(source) => return Err(LaunchError::Wait { pid, source }),
        }
    }
}

fn exec_args(words: &[String]) -> Result<Vec<CString>, LaunchError> {
    words
        .iter()
        .map(|word| {
            CString::new(word.as_str()).map_err(|_| LaunchError::InvalidArgument(word.clone()))
        })
        .collect()
}

/// Report `message` on stderr and end the child immediately.
///
/// Writes straight to the descriptor and skips exit handlers: the child is a
/// copy of the shell and must not flush or lock anything the parent owns.
fn die(message: &str) -> ! {
    // SAFETY: stderr stays open for the life of the process.
    let stderr = unsafe { BorrowedFd::borrow_raw(STDERR_FILENO) };
    let _ = nix::unistd::write(stderr, message.as_bytes());
    let _ = nix::unistd::write(stderr, b"\n");
    // SAFETY: _exit(2) is always safe to call; it never returns.
    unsafe { nix::libc::_exit(1) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use std::collections::HashMap;
    use std::fs;

    fn parse(line: &str) -> Command {
        Parser::new(std::process::id(), 64).parse(line).unwrap()
    }

    fn state() -> ShellState {
        ShellState::with_vars(HashMap::new())
    }

    /// Write a shell script and return the `sh <path>` line running it.
    fn script(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        format!("sh {}", path.display())
    }

    #[test]
    fn foreground_exit_code_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state();
        let mut out = Vec::new();
        spawn(&parse(&script(&dir, "three.sh", "exit 3\n")), &mut state, &mut out).unwrap();
        assert_eq!(state.last_termination(), Termination::Exited(3));

        spawn(&parse("true"), &mut state, &mut out).unwrap();
        assert_eq!(state.last_termination(), Termination::Exited(0));
        assert!(out.is_empty());
    }

    #[test]
    fn exec_failure_exits_with_one() {
        let mut state = state();
        let mut out = Vec::new();
        spawn(&parse("definitely-not-a-program-4242"), &mut state, &mut out).unwrap();
        assert_eq!(state.last_termination(), Termination::Exited(1));
    }

    #[test]
    fn bad_input_redirect_fails_the_child_only() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.txt");
        let mut state = state();
        let mut out = Vec::new();
        let line = format!("cat < {}", missing.display());
        spawn(&parse(&line), &mut state, &mut out).unwrap();
        assert_eq!(state.last_termination(), Termination::Exited(1));
    }

    #[test]
    fn redirects_input_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, "b\na\n").unwrap();

        let mut state = state();
        let mut out = Vec::new();
        let line = format!("sort < {} > {}", input.display(), output.display());
        spawn(&parse(&line), &mut state, &mut out).unwrap();

        assert_eq!(state.last_termination(), Termination::Exited(0));
        assert_eq!(fs::read_to_string(&output).unwrap(), "a\nb\n");
    }

    #[test]
    fn signalled_foreground_child_is_announced() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state();
        let mut out = Vec::new();
        let line = script(&dir, "selfkill.sh", "kill -TERM $$\nsleep 5\n");
        spawn(&parse(&line), &mut state, &mut out).unwrap();

        assert_eq!(state.last_termination(), Termination::Signaled(15));
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("pid "), "{}", out);
        assert!(out.ends_with(" terminated by signal 15\n"), "{}", out);
    }

    #[test]
    fn background_child_is_registered_not_waited() {
        let mut state = state();
        let mut out = Vec::new();
        state.record(Termination::Exited(7));
        spawn(&parse("sleep 30 &"), &mut state, &mut out).unwrap();

        assert_eq!(state.jobs.len(), 1);
        let pid = state.jobs.pids().next().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("background pid is {pid}\n"));
        // Backgrounding never touches the foreground status.
        assert_eq!(state.last_termination(), Termination::Exited(7));
        state.jobs.terminate_all();
    }

    #[test]
    fn foreground_only_mode_overrides_ampersand() {
        let mut state = state();
        state.mode.toggle();
        let mut out = Vec::new();
        spawn(&parse("false &"), &mut state, &mut out).unwrap();

        assert!(state.jobs.is_empty());
        assert!(out.is_empty());
        assert_eq!(state.last_termination(), Termination::Exited(1));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn background_job_is_tracked_even_if_announcing_fails() {
        let mut state = state();
        let child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = Pid::from_raw(child.id() as i32);

        let err = after_spawn(pid, true, &mut state, &mut BrokenPipe).unwrap_err();
        assert!(matches!(err, LaunchError::Io(_)));
        assert_eq!(state.jobs.pids().collect::<Vec<_>>(), vec![pid]);

        state.jobs.terminate_all();
        assert!(state.jobs.is_empty());
    }

    #[test]
    fn nul_byte_is_rejected_before_forking() {
        let mut state = state();
        let mut out = Vec::new();
        let command = Command {
            words: vec!["echo".to_string(), "a\0b".to_string()],
            ..parse("echo")
        };
        let err = spawn(&command, &mut state, &mut out).unwrap_err();
        assert!(matches!(err, LaunchError::InvalidArgument(_)));
        assert!(!err.is_fatal());
    }
}
