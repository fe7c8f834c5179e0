//! Voyage CLI - terminal front end for the Voyage travel booking platform.
//!
//! Provides login, package browsing, booking, dashboards, agent operations
//! and configuration management.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{agent, auth, book, config, dashboard, packages};
use output::OutputFormat;
use voyage_core::VoyageClient;

/// Voyage - travel package booking CLI
#[derive(Parser)]
#[command(
    name = "voyage",
    version,
    about = "Voyage - travel package booking",
    long_about = "Browse and book travel packages, and manage agent and admin dashboards.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Booking API gateway URL
    #[arg(long, global = true, env = "VOYAGE_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in; resumes a booking started while logged out
    Login(auth::LoginArgs),

    /// Log out and forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Browse the package catalogue
    #[command(subcommand)]
    Packages(packages::PackageCommands),

    /// Book a package (asks for login first when needed)
    Book(book::BookArgs),

    /// Show a dashboard
    #[command(subcommand)]
    Dashboard(dashboard::DashboardCommands),

    /// Travel-agent operations
    #[command(subcommand)]
    Agent(agent::AgentCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }
    let result = match cli.command {
        Commands::Config(cmd) => config::execute(cmd, cli.output).await,
        command => match client::connect(cli.api_url, cli.verbose) {
            Ok(voyage) => dispatch(command, &voyage, cli.output).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        output::print_error(&client::describe(&e));
        std::process::exit(1);
    }

    Ok(())
}

async fn dispatch(command: Commands, voyage: &VoyageClient, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Login(args) => auth::login(args, voyage, format).await,
        Commands::Logout => auth::logout(voyage, format).await,
        Commands::Whoami => auth::whoami(voyage, format).await,
        Commands::Packages(cmd) => packages::execute(cmd, voyage, format).await,
        Commands::Book(args) => book::execute(args, voyage, format).await,
        Commands::Dashboard(cmd) => dashboard::execute(cmd, voyage, format).await,
        Commands::Agent(cmd) => agent::execute(cmd, voyage, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    }
}
