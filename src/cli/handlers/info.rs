// src/cli/handlers/info.rs

use crate::{
    cli::{CliContext, handlers::commons},
    core::{
        candidates::{CandidateRegistry, Candidates},
        program::{Program, ProgramMode},
    },
};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;

/// Candidate lists longer than this are shortened in the output.
const MAX_SHOWN_CANDIDATES: usize = 8;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Shows a program's modes, their parameters and current candidates."
)]
struct InfoArgs {
    /// The program to describe.
    program: String,
}

/// The main handler for the `info` command.
pub fn handle(context: &CliContext, args: Vec<String>) -> Result<()> {
    let info_args = InfoArgs::try_parse_from(&args)?;
    let catalog = commons::load_catalog(context)?;
    let program = catalog.find_by_name(&info_args.program).ok_or_else(|| {
        anyhow!(
            t!("info.error.unknown_program"),
            name = info_args.program
        )
    })?;
    let registry = CandidateRegistry::with_builtins();

    print_metadata(program);
    for mode in program.modes() {
        print_mode(mode, &registry);
    }

    println!("\n---------------------------------");
    Ok(())
}

fn print_metadata(program: &Program) {
    println!(
        "\n--- {} '{}' ---",
        t!("info.header"),
        program.name().yellow()
    );
    println!("  {:<15} {}", t!("info.label.id").blue(), program.id());
    println!(
        "  {:<15} {}",
        t!("info.label.binary").blue(),
        program.binary_path().display()
    );
    let default = program
        .default_mode()
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| t!("info.value.none").dimmed().to_string());
    println!("  {:<15} {}", t!("info.label.default_mode").blue(), default);
}

fn print_mode(mode: &ProgramMode, registry: &CandidateRegistry) {
    println!("\n  {} {}", t!("info.label.mode").bold(), mode.name().cyan().bold());
    if let Some(matched) = mode.matched_mode() {
        println!(
            "    {} {} ({})",
            t!("info.label.matches").blue(),
            matched.name().green(),
            matched.parameter_names().join(", ")
        );
    }
    if mode.parameters().is_empty() {
        println!("    {}", t!("info.value.no_parameters").dimmed());
        return;
    }

    for param in mode.parameters() {
        let mut notes = Vec::new();
        if let Some(default) = param.default() {
            notes.push(format!(t!("info.note.default"), value = default));
        }
        if param.is_optional() {
            notes.push(t!("info.note.optional").to_string());
        }
        if mode.is_matched_parameter(param.name()) {
            notes.push(t!("info.note.matched").to_string());
        }

        let candidates = if param.is_literal() {
            String::new()
        } else {
            describe_candidates(param.candidates(registry))
        };

        println!(
            "    {:<18} {:<26} {} {}",
            param.name().bold(),
            param.type_label().dimmed(),
            candidates,
            notes.join(" ").italic()
        );
    }
}

fn describe_candidates(candidates: Option<Candidates>) -> String {
    match candidates {
        None => t!("info.value.no_selector").dimmed().to_string(),
        Some(c) if c.is_empty() => t!("info.value.no_candidates").red().to_string(),
        Some(Candidates::List(values)) if values.len() > MAX_SHOWN_CANDIDATES => {
            let shown: Vec<String> = values
                .iter()
                .take(MAX_SHOWN_CANDIDATES)
                .map(ToString::to_string)
                .collect();
            format!(
                t!("info.value.truncated"),
                values = shown.join(", "),
                more = values.len() - MAX_SHOWN_CANDIDATES
            )
        }
        Some(c) => format!("{{{}}}", c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parameters::ParamValue;

    #[test]
    fn test_describe_candidates() {
        colored::control::set_override(false);
        assert_eq!(
            describe_candidates(Some(Candidates::Range(1000..=65535))),
            "{1000..65535}"
        );
        assert_eq!(
            describe_candidates(Some(Candidates::List(vec![ParamValue::from("a")]))),
            "{a}"
        );
        let many = Candidates::List((0..10).map(ParamValue::Integer).collect());
        assert!(describe_candidates(Some(many)).contains("0, 1, 2"));
        assert_eq!(
            describe_candidates(Some(Candidates::List(vec![]))),
            t!("info.value.no_candidates")
        );
    }
}
