// src/cli/args.rs
use clap::{Args, Parser};
use nix::sys::signal::Signal;
use std::{str::FromStr, time::Duration};

/// Flags shared by `resolve` and `launch`.
#[derive(Args, Debug, Default, Clone)]
pub struct ResolutionOptions {
    /// Print machine-readable JSON instead of a shell command line.
    #[arg(long)]
    pub json: bool,

    /// When a parameter cannot be decided, ask for it instead of failing.
    #[arg(long, short)]
    pub interactive: bool,
}

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Resolves the argument vector of one or more targets without starting anything."
)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub options: ResolutionOptions,

    /// `<program[:mode]> [values...]`, optionally chained with `+`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub chain: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Resolves and starts one or more targets, then waits for all of them."
)]
pub struct LaunchArgs {
    #[command(flatten)]
    pub options: ResolutionOptions,

    /// Stop all processes after this many seconds.
    #[arg(long, value_name = "SECS", value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    /// Signal sent when the timeout elapses (name like `TERM`/`SIGHUP`, or a number).
    #[arg(long, value_name = "SIG", default_value = "SIGTERM", value_parser = parse_signal)]
    pub signal: Signal,

    /// `<program[:mode]> [values...]`, optionally chained with `+`.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub chain: Vec<String>,
}

/// Accepts `SIGTERM`, `term`, `TERM` or `15`.
pub fn parse_signal(raw: &str) -> Result<Signal, String> {
    let trimmed = raw.trim();
    if let Ok(number) = trimmed.parse::<i32>() {
        return Signal::try_from(number).map_err(|e| format!("{}: {}", number, e));
    }
    let upper = trimmed.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };
    Signal::from_str(&name).map_err(|_| format!("unknown signal '{}'", raw))
}

pub fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", raw))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid timeout '{}': {}", raw, e))
}
