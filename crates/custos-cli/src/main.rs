//! Custos CLI: command-line client for a Custos node.
//!
//! Subcommands: profile, issue, compose, verify, verify-presentation, check,
//! store, retrieve, update-status, keygen.

mod commands;

use clap::{Parser, Subcommand};
use commands::NodeClient;

/// Custos: verifiable credential service client.
#[derive(Parser, Debug)]
#[command(name = "custos", version, about, long_about = None)]
struct Cli {
    /// Base URL of the node.
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:8070")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or fetch an issuing profile.
    #[command(subcommand)]
    Profile(commands::profile::ProfileCommand),
    /// Issue a credential under a profile.
    Issue(commands::issue::IssueArgs),
    /// Compose and sign a credential with a DID's key.
    Compose(commands::issue::ComposeArgs),
    /// Verify a credential, including its revocation status.
    Verify(commands::verify::VerifyArgs),
    /// Verify a presentation and every credential in it.
    VerifyPresentation(commands::verify::VerifyPresentationArgs),
    /// Run named checks against a credential.
    Check(commands::verify::CheckArgs),
    /// Store a credential in a profile's vault.
    Store(commands::vault::StoreArgs),
    /// Retrieve a stored credential.
    Retrieve(commands::vault::RetrieveArgs),
    /// Change the status of an issued credential.
    UpdateStatus(commands::status::UpdateStatusArgs),
    /// Generate a key pair in the node's key manager.
    Keygen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = NodeClient::new(&cli.endpoint);

    match &cli.command {
        Commands::Profile(cmd) => commands::profile::run(&client, cmd).await,
        Commands::Issue(args) => commands::issue::run_issue(&client, args).await,
        Commands::Compose(args) => commands::issue::run_compose(&client, args).await,
        Commands::Verify(args) => commands::verify::run_verify(&client, args).await,
        Commands::VerifyPresentation(args) => commands::verify::run_verify_presentation(&client, args).await,
        Commands::Check(args) => commands::verify::run_check(&client, args).await,
        Commands::Store(args) => commands::vault::run_store(&client, args).await,
        Commands::Retrieve(args) => commands::vault::run_retrieve(&client, args).await,
        Commands::UpdateStatus(args) => commands::status::run(&client, args).await,
        Commands::Keygen => commands::keygen::run(&client).await,
    }
}
