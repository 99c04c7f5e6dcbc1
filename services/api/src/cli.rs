use crate::admin::{
    exit_mock_mode, import_catalog, inspect_schema, mock_mode_status, refresh_schema,
    repair_schema, ExitMockModeArgs, ImportArgs, InspectArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use visa_portal::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Visa Portal",
    about = "Serve and administer the visa application portal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or leave mock mode for catalog resources
    MockMode {
        #[command(subcommand)]
        command: MockModeCommand,
    },
    /// Bulk catalog maintenance
    Catalog {
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// Schema cache maintenance for the hosted database
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },
}

#[derive(Subcommand, Debug)]
enum MockModeCommand {
    /// List resources currently served from the local mock store
    Status,
    /// Drop local mock data and reconnect a resource to the database
    Exit(ExitMockModeArgs),
}

#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Import countries and package pricing from a CSV file
    Import(ImportArgs),
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Show the columns the database reports for a table
    Inspect(InspectArgs),
    /// Ask the database to reload its schema cache
    Refresh,
    /// Recompute package totals and fix duplicate active packages
    Repair,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::MockMode {
            command: MockModeCommand::Status,
        } => mock_mode_status(),
        Command::MockMode {
            command: MockModeCommand::Exit(args),
        } => exit_mock_mode(args),
        Command::Catalog {
            command: CatalogCommand::Import(args),
        } => import_catalog(args).await,
        Command::Schema {
            command: SchemaCommand::Inspect(args),
        } => inspect_schema(args).await,
        Command::Schema {
            command: SchemaCommand::Refresh,
        } => refresh_schema().await,
        Command::Schema {
            command: SchemaCommand::Repair,
        } => repair_schema().await,
    }
}
