use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "extrato2ofx",
    version,
    about = "Convert Brazilian bank statement PDFs to OFX and categorize transactions"
)]
struct Cli {
    /// Keyword configuration (TOML). Defaults to the bundled Portuguese set.
    #[arg(long, global = true)]
    keywords: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every bank PDF in a directory to OFX
    Convert {
        #[arg(long, default_value = "pdfs")]
        input: PathBuf,

        #[arg(long, default_value = "ofxs_gerados")]
        output: PathBuf,
    },

    /// Categorize every OFX file in a directory and print a category report
    Categorize {
        #[arg(long, default_value = "ofxs_gerados")]
        input: PathBuf,

        #[arg(long, default_value = "ofxs_categorizados")]
        output: PathBuf,
    },

    /// Categorize a single description and amount
    Classify {
        description: String,

        /// Signed amount in reais; negative for expenses
        #[arg(allow_hyphen_values = true)]
        amount: f64,
    },

    /// Run the built-in categorization scenarios and report accuracy
    SelfTest,

    /// List the loaded categories in precedence order
    Categories,

    /// Export transactions that fell back to "Outros" and suggest keywords
    Outros {
        #[arg(long, default_value = "ofxs_gerados")]
        input: PathBuf,

        #[arg(long, default_value = "csv_reports/transacoes_outros.csv")]
        output: PathBuf,

        /// Number of keyword candidates to print
        #[arg(long, default_value_t = 20)]
        top: usize,
    },

    /// Write the bundled keyword configuration to a file for editing
    InitKeywords {
        #[arg(default_value = "keywords.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let keywords = cli.keywords.as_deref();
    let result = match &cli.command {
        Command::Convert { input, output } => commands::convert(input, output),
        Command::Categorize { input, output } => commands::categorize(keywords, input, output),
        Command::Classify {
            description,
            amount,
        } => commands::classify(keywords, description, *amount),
        Command::SelfTest => commands::self_test(keywords),
        Command::Categories => commands::categories(keywords),
        Command::Outros { input, output, top } => commands::outros(keywords, input, output, *top),
        Command::InitKeywords { path, force } => commands::init_keywords(path, *force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
