//! Main entry point for the GIFTs CLI.

use clap::{command, Args, Parser, Subcommand};

use gifts::{common, db, server};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Ensembl/UniProt mapping curation REST service"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Entity store related commands.
    Db(Db),
    /// Server related commands.
    Server(Server),
}

/// Parsing of "db *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Db {
    /// The sub command to run
    #[command(subcommand)]
    command: DbCommands,
}

/// Enum supporting the parsing of "db *" sub commands.
#[derive(Debug, Subcommand)]
enum DbCommands {
    Init(db::init::Args),
    Import(db::import::Args),
}

/// Parsing of "server *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Server {
    /// The sub command to run
    #[command(subcommand)]
    command: ServerCommands,
}

/// Enum supporting the parsing of "server *" sub commands.
#[derive(Debug, Subcommand)]
enum ServerCommands {
    Run(server::run::Args),
    Schema(server::schema::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(cli.common.tracing_level())
        .compact()
        .finish();

    // Install collector and go into sub commands.
    tracing::subscriber::with_default(collector, || {
        tracing::info!("GIFTs {} startup", common::version());

        match &cli.command {
            Commands::Db(db) => match &db.command {
                DbCommands::Init(args) => db::init::run(&cli.common, args)?,
                DbCommands::Import(args) => db::import::run(&cli.common, args)?,
            },
            Commands::Server(server) => match &server.command {
                ServerCommands::Run(args) => actix_web::rt::System::new()
                    .block_on(server::run::run(&cli.common, args))?,
                ServerCommands::Schema(args) => server::schema::run(&cli.common, args)?,
            },
        }

        tracing::info!("All done. Have a nice day!");

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
