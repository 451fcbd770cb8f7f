mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Exit code for errors that stop a command.
const EXIT_ERROR: u8 = 2;

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "docweave", about = "Compile symbol graphs and markup into linked documentation")]
struct Cli {
    /// The command to run.
    #[command(subcommand)]
    command: Commands,
    /// Raise log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

/// Subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build every page and write the output directory
    Convert {
        /// Output directory (default: .docweave)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Verify the lockfile still matches the external references
    Check {
        /// Output directory holding docweave.lock (default: .docweave)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Resolve one link and print its identifier and URL
    Resolve {
        /// Treat LINK as the name of a media asset an external bundle serves
        #[arg(long, conflicts_with = "from")]
        asset: bool,
        /// Canonical path of the page the link is written on, e.g. MyKit/MyClass
        #[arg(long)]
        from: Option<String>,
        /// Link text, e.g. ``MyClass/init()`` or doc:GettingStarted
        link: String,
    },
}

/// Install the stderr subscriber. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| return EnvFilter::new(format!("docweave={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Check { output } => commands::check(output),
        Commands::Convert { output } => commands::convert(output),
        Commands::Resolve { asset: true, link, .. } => commands::resolve_asset(&link),
        Commands::Resolve { asset: false, from, link } => commands::resolve(&link, from.as_deref()),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(EXIT_ERROR)
        },
    };
}
