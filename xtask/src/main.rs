//! xtask for treelens - build automation and tooling
//!
//! This binary provides development tasks like man page generation.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::fs;
use std::path::Path;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for treelens")]
enum Task {
    /// Generate man pages from clap definitions
    GenerateManPages {
        /// Output directory for man pages (default: ./man)
        #[arg(short, long, default_value = "man")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let task = Task::parse();

    match task {
        Task::GenerateManPages { output } => generate_man_pages(&output)?,
    }

    Ok(())
}

fn generate_man_pages(output_dir: &Path) -> Result<()> {
    println!("Generating man pages...");

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let cmd = treelens::cli::Cli::command();

    // tlens(1) covers every subcommand
    render(cmd.clone(), &output_dir.join("tlens.1"))?;

    // Separate pages for the subcommands with the most options
    for name in ["report", "restore", "watch"] {
        if let Some(subcmd) = cmd.find_subcommand(name) {
            let page = subcmd.clone().name(format!("tlens-{name}"));
            render(page, &output_dir.join(format!("tlens-{name}.1")))?;
        }
    }

    println!(
        "\nMan pages successfully generated in: {}",
        output_dir.display()
    );
    println!("\nTo view the man pages:");
    println!("  man {}/tlens.1", output_dir.display());

    Ok(())
}

fn render(cmd: clap::Command, path: &Path) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create man page: {}", path.display()))?;
    clap_mangen::Man::new(cmd)
        .render(&mut std::io::BufWriter::new(file))
        .with_context(|| format!("Failed to render man page: {}", path.display()))?;
    println!("✓ Generated: {}", path.display());
    Ok(())
}
