//! Tracking and reaping of background children.

use crate::command::Termination;
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::Pid;
use std::fmt;

/// A backgrounded child that has not been reaped yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundJob {
    pub pid: Pid,
}

/// Something a reap sweep observed about a tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobEvent {
    /// The job terminated and has been reaped.
    Done { pid: Pid, termination: Termination },
    /// The status check failed; the job is no longer tracked.
    Lost { pid: Pid, error: Errno },
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobEvent::Done { pid, termination } => {
                write!(f, "background pid {pid} is done: {termination}")
            }
            JobEvent::Lost { pid, error } => {
                write!(f, "waitpid: background pid {pid}: {error}")
            }
        }
    }
}

/// Ordered collection of live background jobs.
///
/// Only the shell loop touches the registry: it appends when a job is
/// backgrounded and sweeps between commands.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<BackgroundJob>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `pid`.
    pub fn append(&mut self, pid: Pid) {
        debug!("tracking background pid {}", pid);
        self.jobs.push(BackgroundJob { pid });
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Tracked pids in the order they were backgrounded.
    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.jobs.iter().map(|job| job.pid)
    }

    /// Check every tracked job without blocking.
    ///
    /// Jobs that terminated are removed and reported once. Jobs still running
    /// are left in place, keeping their relative order.
    pub fn reap_sweep(&mut self) -> Vec<JobEvent> {
        let mut events = Vec::new();
        self.jobs.retain(|job| {
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(status) => match Termination::from_wait_status(status) {
                    Some(termination) => {
                        info!("reaped background pid {}: {}", job.pid, termination);
                        events.push(JobEvent::Done {
                            pid: job.pid,
                            termination,
                        });
                        false
                    }
                    None => true,
                },
                Err(Errno::EINTR) => true,
                Err(error) => {
                    warn!("status check for background pid {} failed: {}", job.pid, error);
                    events.push(JobEvent::Lost {
                        pid: job.pid,
                        error,
                    });
                    false
                }
            }
        });
        events
    }

    /// Kill and reap every tracked job. Used when the shell exits.
    pub fn terminate_all(&mut self) {
        for job in self.jobs.drain(..) {
            info!("killing background pid {}", job.pid);
            if let Err(e) = kill(job.pid, Signal::SIGKILL) {
                warn!("kill {} failed: {}", job.pid, e);
                continue;
            }
            loop {
                match waitpid(job.pid, None) {
                    Err(Errno::EINTR) => continue,
                    Err(e) => {
                        warn!("reaping killed pid {} failed: {}", job.pid, e);
                        break;
                    }
                    Ok(status) if Termination::from_wait_status(status).is_some() => break,
                    Ok(_) => continue,
                }
            }
        }
    }
}
