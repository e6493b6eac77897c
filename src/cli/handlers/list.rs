use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::cli::{CliContext, handlers::commons};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Lists the programs in the catalog.")]
struct ListArgs {
    /// Show the id of each program.
    #[arg(long, short)]
    ids: bool,
}

pub fn handle(context: &CliContext, args: Vec<String>) -> Result<()> {
    let list_args = ListArgs::try_parse_from(&args)?;
    let catalog = commons::load_catalog(context)?;

    if catalog.is_empty() {
        println!("{}", t!("list.empty").dimmed());
        return Ok(());
    }

    println!("\n{}", t!("list.header").bold());
    for program in catalog.programs() {
        let default = program.default_mode().map(|m| m.name().to_string());
        let modes: Vec<String> = program
            .modes()
            .map(|mode| {
                if Some(mode.name()) == default.as_deref() {
                    format!("{}*", mode.name()).green().to_string()
                } else {
                    mode.name().to_string()
                }
            })
            .collect();

        if list_args.ids {
            println!(
                "  {:<20} {}  [{}]",
                program.name().cyan(),
                program.id().to_string().dimmed(),
                modes.join(", ")
            );
        } else {
            println!("  {:<20} [{}]", program.name().cyan(), modes.join(", "));
        }
    }
    println!("\n{}", t!("list.legend").dimmed());
    Ok(())
}
