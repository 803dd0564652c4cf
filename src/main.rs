mod cli;
mod commands;
mod config;
mod manifest;
mod paths;
mod resource;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub quiet: bool,
    pub manifest: Option<PathBuf>,
    pub state: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        quiet: cli.quiet,
        manifest: cli.manifest,
        state: cli.state,
    };

    match cli.command {
        Command::Plan(args) => commands::apply::plan(&ctx, args.target.as_deref(), args.jobs),
        Command::Apply(args) => commands::apply::apply(
            &ctx,
            args.target.as_deref(),
            args.yes,
            args.dry_run,
            args.jobs,
        ),
        Command::Import { address, id } => commands::apply::import(&ctx, &address, &id),
        Command::Show(args) => commands::show::run(&ctx, args.what, args.json),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "srht-provider", &mut io::stdout());
            Ok(())
        }
    }
}
