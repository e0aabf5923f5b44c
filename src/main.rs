use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use treelens::cli::{Cli, Commands};
use treelens::commands::{self, report::ReportArgs};
use treelens::output::{self, Verbosity};
use treelens::{ProjectContext, default_config_path};

fn main() {
    if let Err(e) = run() {
        output::error(&e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    output::set_verbosity(verbosity);
    init_logging(verbosity);

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut ctx = ProjectContext::new_explicit(cli.root, config_path)?;

    match cli.command {
        Commands::Scan { json } => commands::scan::execute(&ctx, json)?,
        Commands::Report {
            against,
            all,
            contents,
            output,
        } => {
            let args = ReportArgs {
                against,
                all,
                contents,
                output,
            };
            commands::report::execute(&ctx, &args)?;
        }
        Commands::Watch => commands::watch::execute(&ctx)?,
        Commands::Backup { title } => commands::versions::backup(&ctx, &title)?,
        Commands::Versions { json } => commands::versions::list(&ctx, json)?,
        Commands::Restore { id, yes } => commands::versions::restore(&ctx, &id, yes)?,
        Commands::DeleteVersion { id } => commands::versions::delete(&ctx, &id)?,
        Commands::Config { key, value, list } => {
            commands::config::execute(&mut ctx, key.as_deref(), value.as_deref(), list)?;
        }
        Commands::Completion { .. } => {}
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` wins over the verbosity flags.
fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .init();
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
