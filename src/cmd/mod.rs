mod config;
mod generate;
mod input;
mod order;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql-dummy")]
#[command(version)]
#[command(about = "Generate referentially-consistent dummy rows for a SQL schema", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate rows for every table and write them as SQL
    Generate {
        /// Schema file with CREATE TABLE statements
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// YAML file with generator overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rows per table unless the config sets __numrows
        #[arg(short, long, default_value_t = 5)]
        numrows: usize,

        /// Seed for reproducible output (random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Output format: insert, dump
        #[arg(short, long, default_value = "dump")]
        format: String,

        /// Only emit these tables (repeatable); others are still generated
        #[arg(short, long = "table")]
        tables: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Don't print the run summary
        #[arg(long)]
        no_summary: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write the effective generator configuration (defaults plus overrides)
    Config {
        /// Schema file with CREATE TABLE statements
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Existing YAML overrides; also the output path unless --output is given
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (default: the config path, or stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print to stdout even when a config path is given
        #[arg(long)]
        stdout: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the table generation order
    Order {
        /// Schema file with CREATE TABLE statements
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// YAML file with generator overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            schema,
            config,
            numrows,
            seed,
            format,
            tables,
            output,
            no_summary,
            verbose,
        } => generate::run(
            schema, config, numrows, seed, format, tables, output, no_summary, verbose,
        ),
        Commands::Config {
            schema,
            config,
            output,
            stdout,
            verbose,
        } => config::run(schema, config, output, stdout, verbose),
        Commands::Order {
            schema,
            config,
            verbose,
        } => order::run(schema, config, verbose),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "sql-dummy", &mut io::stdout());
            Ok(())
        }
    }
}
