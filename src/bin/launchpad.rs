// src/bin/launchpad.rs

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use colored::*;
use launchpad::{
    cli::{
        Cli, CliContext,
        handlers::{self, commons, launch::LaunchError},
    },
    core::resolver::ResolutionFailure,
};

// --- Command Definition and Registry ---

/// A command, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(&CliContext, Vec<String>) -> Result<()>,
}

/// Every command the binary understands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "info",
        aliases: &["show"],
        handler: handlers::info::handle,
    },
    CommandDefinition {
        name: "launch",
        aliases: &["run"],
        handler: handlers::launch::handle,
    },
    CommandDefinition {
        name: "list",
        aliases: &["ls"],
        handler: handlers::list::handle,
    },
    CommandDefinition {
        name: "resolve",
        aliases: &["args"],
        handler: handlers::resolve::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, dispatches, and turns errors into exit codes.
fn main() {
    env_logger::init();

    let Err(e) = run_cli(Cli::parse()) else {
        return;
    };

    // --- Centralized Error Handling ---
    if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
        // Help and usage errors from a command's own parser.
        clap_err.exit();
    }
    if let Some(failure) = e.downcast_ref::<ResolutionFailure>() {
        // The diagnostic format is relied on by scripts; print it as is.
        commons::print_failure(failure);
        std::process::exit(1);
    }
    if let Some(LaunchError::Interrupted) = e.downcast_ref::<LaunchError>() {
        std::process::exit(130);
    }

    eprintln!("\n{}: {:#}", "Error".red().bold(), e);
    std::process::exit(1);
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);
    let context = CliContext::from(&cli);

    let Some((name, rest)) = cli.args.split_first() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let command = find_command(name).ok_or_else(|| anyhow!(unknown_command_message(name)))?;
    (command.handler)(&context, rest.to_vec())
}

fn unknown_command_message(name: &str) -> String {
    let known: Vec<&str> = COMMAND_REGISTRY.iter().map(|c| c.name).collect();
    format!(
        launchpad::t!("cli.error.unknown_command"),
        name = name,
        known = known.join(", ")
    )
}
