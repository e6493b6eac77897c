use anyhow::Result;
use clap::Parser;

use crate::{
    cli::{CliContext, args::ResolveArgs, handlers::commons},
    core::{
        candidates::CandidateRegistry,
        resolver::{ArgumentResolver, ResolvedLaunch},
    },
};

/// The `resolve` command: prints what `launch` would run, without running it.
///
/// In a chain, later links are matched against the launches resolved before
/// them, exactly as `launch` does.
pub fn handle(context: &CliContext, args: Vec<String>) -> Result<()> {
    let resolve_args = ResolveArgs::try_parse_from(&args)?;
    let links = commons::split_chain(&resolve_args.chain)?;
    let catalog = commons::load_catalog(context)?;
    let registry = CandidateRegistry::with_builtins();
    let resolver = ArgumentResolver::new(&registry);

    let mut resolved: Vec<ResolvedLaunch> = Vec::with_capacity(links.len());
    for link in &links {
        let (program, mode) = commons::lookup_target(&catalog, &link.target)?;
        let launch = {
            let earlier: Vec<&ResolvedLaunch> = resolved.iter().collect();
            let matched = commons::matched_launch(&earlier, &mode);
            commons::resolve_link(
                &resolver,
                &program,
                &mode,
                matched,
                &link.overrides,
                resolve_args.options.interactive,
            )?
        };
        resolved.push(launch);
    }

    if resolve_args.options.json {
        let summaries: Vec<_> = resolved.iter().map(ResolvedLaunch::summary).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for launch in &resolved {
            println!(
                "{}",
                commons::command_line(launch.program().binary_path(), launch.argv())
            );
        }
    }
    Ok(())
}
