//! Command-line front end built on `clap::Parser` + `Subcommand`. Only
//! a `Generate` subcommand is exposed — there is no generated lexer or
//! GLR visitor in this generator to drive a debug/run subcommand around.
//! Uses `color-eyre` for top-level error formatting and
//! `tracing-subscriber`, initialized from `-v`/`RUST_LOG`, since
//! `caper-core` emits `tracing` events during compilation.

use std::path::Path;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use caper::{generate, Language};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CommandLine {
    #[arg(short, long, global = true, help = "Enable verbose (debug-level) logging")]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Generate a parser from a grammar file")]
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(required = true, help = "Path to the .caper grammar file")]
    grammar: String,
    #[arg(long, help = "Also write a human-readable dump of the parsing table")]
    table: bool,
    #[arg(short, long, help = "The language to generate code for")]
    language: Language,
    #[arg(long, help = "The target directory to write the generated code to", default_value_t = String::from("./generated/"))]
    target: String,
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = CommandLine::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Generate(cmd) => {
            std::fs::create_dir_all(&cmd.target)?;
            let result = generate(Path::new(&cmd.grammar), Path::new(&cmd.target), cmd.language, cmd.table);
            if let Err(errors) = result {
                for (i, error) in errors.iter().enumerate() {
                    eprintln!("{error}");
                    if i + 1 < errors.len() {
                        eprintln!();
                    }
                }
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
