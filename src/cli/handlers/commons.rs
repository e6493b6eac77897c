// src/cli/handlers/commons.rs

// Helpers shared by the handlers: catalog loading, target chains, prompting
// and output formatting.

use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use std::{io::IsTerminal, path::Path, sync::Arc};

use crate::{
    cli::CliContext,
    constants::CHAIN_SEPARATOR,
    core::{
        candidates::Candidates,
        catalog_loader,
        parameters::ParamValue,
        paths,
        program::{Catalog, Program, ProgramMode},
        resolver::{ArgumentResolver, ResolutionFailure, ResolvedLaunch},
    },
};

/// One link of a `a + b + c` chain: a target and its positional values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub target: String,
    pub overrides: Vec<String>,
}

/// Loads the catalog selected by `--catalog`, `$LAUNCHPAD_CATALOG` or the
/// config directory.
pub fn load_catalog(context: &CliContext) -> Result<Catalog> {
    let path = paths::catalog_path(context.catalog.as_deref())?;
    catalog_loader::load_catalog(&path)
        .with_context(|| format!(t!("catalog.error.load"), path = path.display()))
}

/// Splits the raw command tail on `+` into chain links.
pub fn split_chain(raw: &[String]) -> Result<Vec<ChainLink>> {
    raw.split(|arg| arg == CHAIN_SEPARATOR)
        .map(|group| match group.split_first() {
            Some((target, overrides)) => Ok(ChainLink {
                target: target.clone(),
                overrides: overrides.to_vec(),
            }),
            None => Err(anyhow!(t!("chain.error.empty_link"))),
        })
        .collect()
}

/// Looks up `program` or `program:mode`.
pub fn lookup_target(catalog: &Catalog, target: &str) -> Result<(Arc<Program>, Arc<ProgramMode>)> {
    Ok(catalog.target(target)?)
}

/// Picks the launch a mode's parameters are matched against: the latest
/// earlier launch of the matched mode's name, else the one right before.
pub fn matched_launch<'a>(
    earlier: &[&'a ResolvedLaunch],
    mode: &ProgramMode,
) -> Option<&'a ResolvedLaunch> {
    let wanted = mode.matched_mode()?;
    earlier
        .iter()
        .rev()
        .find(|launch| launch.mode().name() == wanted.name())
        .or_else(|| earlier.last())
        .copied()
}

/// Resolves one chain link. With `interactive`, a failure prompts for the
/// missing value and the resolution is retried with it appended.
pub fn resolve_link(
    resolver: &ArgumentResolver<'_>,
    program: &Arc<Program>,
    mode: &Arc<ProgramMode>,
    matched: Option<&ResolvedLaunch>,
    overrides: &[String],
    interactive: bool,
) -> Result<ResolvedLaunch> {
    if matched.is_none() {
        if let Some(matched_mode) = mode.matched_mode() {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!(
                    t!("resolve.warning.no_matched_launch"),
                    matched = matched_mode.name(),
                    mode = mode.qualified_name()
                )
            );
        }
    }

    let can_prompt = interactive && std::io::stdin().is_terminal();
    let mut overrides = overrides.to_vec();
    loop {
        match resolver.resolve(program, mode, matched, &overrides) {
            Ok(launch) => return Ok(launch),
            Err(failure) if can_prompt => {
                print_failure(&failure);
                match prompt_for_value(&failure)? {
                    Some(value) => overrides.push(value),
                    None => return Err(failure.into()),
                }
            }
            Err(failure) => return Err(failure.into()),
        }
    }
}

/// Asks for the parameter the resolution stopped at. `None` if the prompt
/// was dismissed.
fn prompt_for_value(failure: &ResolutionFailure) -> Result<Option<String>> {
    let Some(param) = failure.failed_parameter() else {
        return Ok(None);
    };
    let theme = ColorfulTheme::default();

    match &param.candidates {
        Some(Candidates::List(values)) => {
            let items: Vec<String> = values.iter().map(ParamValue::to_string).collect();
            let choice = Select::with_theme(&theme)
                .with_prompt(format!(t!("prompt.select"), name = param.name))
                .items(&items)
                .default(0)
                .interact_opt()?;
            Ok(choice.and_then(|i| values.get(i)).map(ParamValue::materialize))
        }
        Some(Candidates::Range(range)) => {
            let value: i64 = Input::with_theme(&theme)
                .with_prompt(format!(
                    t!("prompt.range"),
                    name = param.name,
                    start = range.start(),
                    end = range.end()
                ))
                .validate_with(|v: &i64| -> Result<(), String> {
                    if range.contains(v) {
                        Ok(())
                    } else {
                        Err(format!(
                            t!("prompt.error.out_of_range"),
                            start = range.start(),
                            end = range.end()
                        ))
                    }
                })
                .interact_text()?;
            Ok(Some(value.to_string()))
        }
        None => {
            let value: String = Input::with_theme(&theme)
                .with_prompt(format!(t!("prompt.free"), name = param.name))
                .interact_text()?;
            Ok(Some(value))
        }
    }
}

/// Prints the resolution diagnostic to stderr. Without colors the text is
/// byte-for-byte what [`ResolutionFailure::render`] produces.
pub fn print_failure(failure: &ResolutionFailure) {
    let rendered = failure.render();
    let body = rendered.strip_prefix("error: ").unwrap_or(&rendered);
    eprint!("{} {}", "error:".red().bold(), body);
}

/// The launch as a copy-pasteable shell command line.
pub fn command_line(binary: &Path, argv: &[String]) -> String {
    let binary = binary.to_string_lossy();
    let words = std::iter::once(&*binary).chain(argv.iter().map(String::as_str));
    shlex::try_join(words.clone()).unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "))
}
