use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use oxrates::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the latest exchange rates
    Rates {
        /// Base currency, defaults to the configured or provider base
        base: Option<String>,
        /// Restrict output to these currencies (repeatable or comma separated)
        #[arg(short, long)]
        symbols: Vec<String>,
    },
    /// Convert an amount using the latest rate
    Convert {
        from: String,
        to: String,
        #[arg(allow_negative_numbers = true)]
        amount: f64,
    },
}

impl From<Commands> for oxrates::AppCommand {
    fn from(cmd: Commands) -> oxrates::AppCommand {
        match cmd {
            Commands::Rates { base, symbols } => oxrates::AppCommand::Rates { base, symbols },
            Commands::Convert { from, to, amount } => {
                oxrates::AppCommand::Convert { from, to, amount }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => oxrates::cli::setup::setup(),
        Some(cmd) => oxrates::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
