// src/system/process.rs

//! # Process Lifecycle
//!
//! [`spawn`] starts a resolved launch and returns a [`ProcessHandle`].
//!
//! Each handle has exactly one reaper thread. The reaper owns the
//! [`std::process::Child`], so it is structurally the only code that can wait on
//! the pid. When the process ends the reaper records the exit status, wakes
//! every blocked [`ProcessHandle::wait`] and runs the callbacks registered with
//! [`ProcessHandle::on_exit`]. The status write and the callback drain happen
//! under the same lock, so a callback is delivered exactly once whichever side
//! gets there first.

use crate::core::{
    program::{Program, ProgramMode},
    resolver::ResolvedLaunch,
};
use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::{self, Pid},
};
use serde::Serialize;
use std::{
    fmt, io,
    os::unix::process::ExitStatusExt,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    process::{Child, Command, Stdio},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread,
};
use thiserror::Error;

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// Normal exit with a status code.
    Code(i32),
    /// Terminated by a signal.
    Signaled(i32),
    /// The reaper could not observe the exit (e.g. someone else reaped the pid).
    Unknown,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Code(0))
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Code(c) => Some(*c),
            _ => None,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            ExitStatus::Code(code)
        } else if let Some(sig) = status.signal() {
            ExitStatus::Signaled(sig)
        } else {
            ExitStatus::Unknown
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(c) => write!(f, "exit code {}", c),
            ExitStatus::Signaled(s) => match Signal::try_from(*s) {
                Ok(sig) => write!(f, "terminated by {}", sig),
                Err(_) => write!(f, "terminated by signal {}", s),
            },
            ExitStatus::Unknown => f.write_str("unknown exit status"),
        }
    }
}

/// The OS refused to start the process. No handle exists.
#[derive(Error, Debug)]
pub enum SpawnError {
    #[error("Could not start '{binary}': {source}")]
    Os {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Started process {pid} but could not start its reaper: {source}")]
    Reaper {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// A signal or liveness query could not be carried out.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessControlError {
    #[error("Process {0} has already exited.")]
    AlreadyExited(u32),
    #[error("Process {0} no longer exists.")]
    NoSuchProcess(u32),
    #[error("Not permitted to signal process {0}.")]
    PermissionDenied(u32),
    #[error("Process id {0} is out of range for this platform.")]
    InvalidPid(u32),
    #[error("Could not control process {pid}: {errno}")]
    Os { pid: u32, errno: Errno },
}

type ExitCallback = Box<dyn FnOnce(ExitStatus) + Send + 'static>;

struct ExitState {
    status: Option<ExitStatus>,
    callbacks: Vec<ExitCallback>,
}

/// State shared between a handle and its reaper.
struct Shared {
    pid: u32,
    state: Mutex<ExitState>,
    exited: Condvar,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Shared")
            .field("pid", &self.pid)
            .field("status", &state.status)
            .field("pending_callbacks", &state.callbacks.len())
            .finish()
    }
}

impl Shared {
    fn new(pid: u32) -> Self {
        Self {
            pid,
            state: Mutex::new(ExitState {
                status: None,
                callbacks: Vec::new(),
            }),
            exited: Condvar::new(),
        }
    }

    // A panicking callback cannot leave `ExitState` half-written, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, ExitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the exit once; later calls are no-ops.
    fn settle(&self, status: ExitStatus) {
        let drained = {
            let mut state = self.lock();
            if state.status.is_some() {
                return;
            }
            state.status = Some(status);
            std::mem::take(&mut state.callbacks)
        };
        self.exited.notify_all();

        log::debug!("Process {} finished: {}", self.pid, status);
        log::trace!(
            "Delivering exit of {} to {} callback(s).",
            self.pid,
            drained.len()
        );
        for callback in drained {
            deliver(self.pid, callback, status);
        }
    }
}

fn deliver(pid: u32, callback: ExitCallback, status: ExitStatus) {
    if panic::catch_unwind(AssertUnwindSafe(|| callback(status))).is_err() {
        log::error!("An exit callback for process {} panicked.", pid);
    }
}

fn to_pid(pid: u32) -> Result<Pid, ProcessControlError> {
    i32::try_from(pid)
        .map(Pid::from_raw)
        .map_err(|_| ProcessControlError::InvalidPid(pid))
}

/// A spawned process.
#[derive(Debug)]
pub struct ProcessHandle {
    launch: Arc<ResolvedLaunch>,
    shared: Arc<Shared>,
}

/// Starts the program of `launch` with its resolved argv.
///
/// Standard streams are inherited from the current process.
pub fn spawn(launch: ResolvedLaunch) -> Result<ProcessHandle, SpawnError> {
    let binary = launch.program().binary_path().clone();
    let mut command = Command::new(&binary);
    command
        .args(launch.argv())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    log::debug!("Spawning {} {:?}", binary.display(), launch.argv());
    let child = command
        .spawn()
        .map_err(|source| SpawnError::Os { binary, source })?;

    start_reaper(child, launch)
}

fn start_reaper(child: Child, launch: ResolvedLaunch) -> Result<ProcessHandle, SpawnError> {
    let pid = child.id();
    let shared = Arc::new(Shared::new(pid));
    let reaper_shared = Arc::clone(&shared);

    let spawned = thread::Builder::new()
        .name(format!("reaper-{}", pid))
        .spawn(move || reap(child, &reaper_shared));

    if let Err(source) = spawned {
        // The closure (and the Child) is gone; no reaper exists for this pid,
        // so clean it up here rather than leave a zombie.
        log::error!("Could not start reaper for {}: {}", pid, source);
        if let Ok(raw) = to_pid(pid) {
            let _ = signal::kill(raw, Signal::SIGKILL);
            let _ = nix::sys::wait::waitpid(raw, None);
        }
        return Err(SpawnError::Reaper { pid, source });
    }

    Ok(ProcessHandle {
        launch: Arc::new(launch),
        shared,
    })
}

/// Reaper body. The only place that waits on the child.
fn reap(mut child: Child, shared: &Shared) {
    // Whatever happens below, the handle must end up settled.
    let guard = scopeguard::guard((), |_| shared.settle(ExitStatus::Unknown));

    let status = match child.wait() {
        Ok(status) => ExitStatus::from(status),
        Err(e) => {
            log::warn!("Could not observe exit of process {}: {}", shared.pid, e);
            ExitStatus::Unknown
        }
    };
    shared.settle(status);
    scopeguard::ScopeGuard::into_inner(guard);
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.shared.pid
    }

    /// The launch this process was started from. Feed it to a later resolution
    /// whose mode matches this one.
    pub fn launch(&self) -> &ResolvedLaunch {
        &self.launch
    }

    pub fn program(&self) -> &Arc<Program> {
        self.launch.program()
    }

    pub fn mode(&self) -> &Arc<ProgramMode> {
        self.launch.mode()
    }

    /// The recorded exit status, if the reaper has seen the process end.
    pub fn try_status(&self) -> Option<ExitStatus> {
        self.shared.lock().status
    }

    /// Advisory liveness probe. May disagree briefly with the recorded state.
    pub fn is_running(&self) -> Result<bool, ProcessControlError> {
        if self.try_status().is_some() {
            return Ok(false);
        }
        let pid = to_pid(self.pid())?;
        match unistd::getpgid(Some(pid)) {
            Ok(_) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(errno) => Err(ProcessControlError::Os {
                pid: self.pid(),
                errno,
            }),
        }
    }

    /// Sends `sig` to the process. Refuses once the exit has been recorded.
    ///
    /// The reaper collects the pid just before it records the exit, so a
    /// signal sent in that short window can still reach a recycled pid.
    pub fn signal(&self, sig: Signal) -> Result<(), ProcessControlError> {
        let pid = to_pid(self.pid())?;
        let state = self.shared.lock();
        if state.status.is_some() {
            return Err(ProcessControlError::AlreadyExited(self.pid()));
        }
        log::debug!("Sending {} to process {}", sig, self.pid());
        let result = signal::kill(pid, sig);
        drop(state);

        result.map_err(|errno| match errno {
            Errno::ESRCH => ProcessControlError::NoSuchProcess(self.pid()),
            Errno::EPERM => ProcessControlError::PermissionDenied(self.pid()),
            errno => ProcessControlError::Os {
                pid: self.pid(),
                errno,
            },
        })
    }

    /// Runs `callback` with the exit status exactly once: right now if the
    /// process already exited, otherwise from the reaper when it does.
    pub fn on_exit<F>(&self, callback: F)
    where
        F: FnOnce(ExitStatus) + Send + 'static,
    {
        let mut state = self.shared.lock();
        let recorded = state.status;
        match recorded {
            Some(status) => {
                drop(state);
                deliver(self.pid(), Box::new(callback), status);
            }
            None => state.callbacks.push(Box::new(callback)),
        }
    }

    /// Blocks until the reaper records the exit status.
    pub fn wait(&self) -> ExitStatus {
        let state = self.shared.lock();
        let state = self
            .shared
            .exited
            .wait_while(state, |s| s.status.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        state.status.unwrap_or(ExitStatus::Unknown)
    }

    /// Gives up this handle without waiting. The reaper keeps running and
    /// reaps the process when it ends, so nothing is leaked.
    pub fn release(self) -> Option<ExitStatus> {
        let status = self.try_status();
        log::debug!(
            "Released handle for process {} (status: {:?}).",
            self.pid(),
            status
        );
        status
    }
}

// MARK: --- UNIT TESTS ---
