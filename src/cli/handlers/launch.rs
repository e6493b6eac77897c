// src/cli/handlers/launch.rs

//! The `launch` command.
//!
//! Every link of the chain is resolved and started in order, so a later link can
//! be matched against the processes already running. Once all are up the
//! handler supervises them on a small tokio runtime:
//!
//! - each exit is reported as it happens (delivered through `on_exit`),
//! - Ctrl+C forwards `SIGINT` to every live process (a second one sends `SIGKILL`),
//! - `--timeout` sends `--signal` to every live process.
//!
//! If starting any link fails, the processes started before it are stopped.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use nix::sys::signal::Signal;
use std::time::Duration;
use thiserror::Error;
use tokio::{
    signal::unix::{SignalKind, signal},
    sync::mpsc,
};

use crate::{
    cli::{CliContext, args::LaunchArgs, handlers::commons},
    core::{
        candidates::CandidateRegistry,
        resolver::{ArgumentResolver, ResolvedLaunch},
    },
    system::process::{self, ExitStatus, ProcessControlError, ProcessHandle},
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchError {
    #[error("Interrupted.")]
    Interrupted,
    #[error("{failed} of {total} process(es) did not exit successfully.")]
    Unsuccessful { failed: usize, total: usize },
}

pub fn handle(context: &CliContext, args: Vec<String>) -> Result<()> {
    let launch_args = LaunchArgs::try_parse_from(&args)?;
    let links = commons::split_chain(&launch_args.chain)?;
    let catalog = commons::load_catalog(context)?;
    let registry = CandidateRegistry::with_builtins();
    let resolver = ArgumentResolver::new(&registry);

    // Until every link is up, leaving this scope stops what was started.
    let mut started = scopeguard::guard(Vec::<ProcessHandle>::new(), |handles| {
        if !handles.is_empty() {
            eprintln!(
                "{}",
                format!(t!("launch.info.stopping_started"), count = handles.len()).yellow()
            );
        }
        signal_all(&handles, Signal::SIGTERM);
        for handle in handles {
            handle.release();
        }
    });

    for link in &links {
        let (program, mode) = commons::lookup_target(&catalog, &link.target)?;
        let launch = {
            let earlier: Vec<&ResolvedLaunch> = started.iter().map(ProcessHandle::launch).collect();
            let matched = commons::matched_launch(&earlier, &mode);
            commons::resolve_link(
                &resolver,
                &program,
                &mode,
                matched,
                &link.overrides,
                launch_args.options.interactive,
            )?
        };

        let command_line = commons::command_line(program.binary_path(), launch.argv());
        let summary = launch.summary();
        let handle = process::spawn(launch)
            .with_context(|| format!(t!("launch.error.spawn"), target = link.target))?;

        if launch_args.options.json {
            let line = serde_json::json!({ "pid": handle.pid(), "launch": summary });
            println!("{}", serde_json::to_string(&line)?);
        } else {
            eprintln!(
                "{} {} {}",
                "▶".green().bold(),
                format!("[{}]", handle.pid()).dimmed(),
                command_line
            );
        }
        started.push(handle);
    }

    let handles = scopeguard::ScopeGuard::into_inner(started);
    supervise_blocking(&handles, launch_args.timeout, launch_args.signal)
}

fn supervise_blocking(
    handles: &[ProcessHandle],
    timeout: Option<Duration>,
    stop_signal: Signal,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context(t!("launch.error.runtime"))?;
    let outcome = runtime.block_on(supervise(handles, timeout, stop_signal));
    for handle in handles {
        log::trace!("Process {} settled as {:?}", handle.pid(), handle.try_status());
    }
    outcome
}

async fn supervise(
    handles: &[ProcessHandle],
    timeout: Option<Duration>,
    stop_signal: Signal,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, ExitStatus)>();
    for (index, handle) in handles.iter().enumerate() {
        let tx = tx.clone();
        handle.on_exit(move |status| {
            // The receiver only goes away once supervision is over.
            let _ = tx.send((index, status));
        });
    }
    drop(tx);

    let mut interrupts = signal(SignalKind::interrupt()).context(t!("launch.error.signal_handler"))?;
    let deadline = async {
        match timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut remaining = handles.len();
    let mut failed = 0;
    let mut interrupted = 0u8;
    let mut timed_out = false;

    while remaining > 0 {
        tokio::select! {
            Some((index, status)) = rx.recv() => {
                remaining -= 1;
                if !status.success() {
                    failed += 1;
                }
                if let Some(handle) = handles.get(index) {
                    report_exit(handle, status);
                }
            }
            Some(()) = interrupts.recv(), if interrupted < 2 => {
                interrupted += 1;
                let sig = if interrupted == 1 { Signal::SIGINT } else { Signal::SIGKILL };
                log::debug!("Ctrl+C received, forwarding {} to {} process(es).", sig, remaining);
                signal_all(handles, sig);
            }
            () = &mut deadline, if !timed_out => {
                timed_out = true;
                eprintln!(
                    "{}",
                    format!(t!("launch.info.timeout"), signal = stop_signal).yellow()
                );
                signal_all(handles, stop_signal);
            }
            else => break,
        }
    }

    if interrupted > 0 {
        return Err(LaunchError::Interrupted.into());
    }
    if failed > 0 {
        return Err(LaunchError::Unsuccessful {
            failed,
            total: handles.len(),
        }
        .into());
    }
    Ok(())
}

fn report_exit(handle: &ProcessHandle, status: ExitStatus) {
    let name = handle.mode().qualified_name();
    let line = format!(
        t!("launch.info.exited"),
        target = name,
        pid = handle.pid(),
        status = status
    );
    if status.success() {
        eprintln!("{} {}", "■".green(), line);
    } else {
        eprintln!("{} {}", "■".red(), line.red());
    }
}

/// Sends `sig` to every process that is still running.
fn signal_all(handles: &[ProcessHandle], sig: Signal) {
    for handle in handles {
        match handle.signal(sig) {
            Ok(()) => {}
            Err(ProcessControlError::AlreadyExited(_) | ProcessControlError::NoSuchProcess(_)) => {}
            Err(e) => log::warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        parameters::ParameterSpec,
        program::{Catalog, ModeDefinition, ProgramDefinition},
    };
    use std::path::PathBuf;
    use uuid::Uuid;

    fn sh(script: &str) -> ProcessHandle {
        let catalog = Catalog::build(vec![ProgramDefinition {
            name: "sh".to_string(),
            id: Uuid::new_v4(),
            binary_path: PathBuf::from("/bin/sh"),
            modes: vec![ModeDefinition {
                name: "c".to_string(),
                parameters: vec![
                    ParameterSpec::literal("-c"),
                    ParameterSpec::new("script", "shell-script"),
                ],
                matched_mode: None,
            }],
            default_mode: None,
        }])
        .unwrap();
        let (program, mode) = catalog.target("sh").unwrap();
        let registry = CandidateRegistry::new();
        let launch = ArgumentResolver::new(&registry)
            .resolve(&program, &mode, None, &[script.to_string()])
            .unwrap();
        process::spawn(launch).unwrap()
    }

    #[test]
    fn test_supervise_all_successful() {
        let handles = vec![sh("exit 0"), sh("sleep 0.1")];
        supervise_blocking(&handles, None, Signal::SIGTERM).unwrap();
        assert!(handles.iter().all(|h| h.try_status() == Some(ExitStatus::Code(0))));
    }

    #[test]
    fn test_supervise_reports_failures() {
        let handles = vec![sh("exit 0"), sh("exit 2")];
        let err = supervise_blocking(&handles, None, Signal::SIGTERM).unwrap_err();
        assert_eq!(
            err.downcast_ref::<LaunchError>(),
            Some(&LaunchError::Unsuccessful { failed: 1, total: 2 })
        );
    }

    #[test]
    fn test_timeout_signals_live_processes() {
        let handles = vec![sh("sleep 30")];
        let err = supervise_blocking(
            &handles,
            Some(Duration::from_millis(200)),
            Signal::SIGTERM,
        )
        .unwrap_err();
        assert!(err.downcast_ref::<LaunchError>().is_some());
        assert_eq!(
            handles.first().and_then(ProcessHandle::try_status),
            Some(ExitStatus::Signaled(Signal::SIGTERM as i32))
        );
    }
}
