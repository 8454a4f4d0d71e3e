mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    actions::ActionsSubcommand, config::ConfigSubcommand, models::ModelsSubcommand,
    records::RecordsSubcommand,
};
use std::path::PathBuf;
use umin_core::permission::Caller;

#[derive(Parser)]
#[command(
    name = "umin",
    about = "Admin for YAML-backed record collections: list, bulk actions, and a web UI",
    version,
    propagate_version = true
)]
struct Cli {
    /// Site root (default: auto-detect from .umin/)
    #[arg(long, global = true, env = "UMIN_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Principal to act as when checking permissions
    #[arg(long, global = true, env = "UMIN_USER", default_value = "anonymous")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a umin site in the current directory
    Init {
        /// Site name (default: directory name)
        #[arg(long)]
        name: Option<String>,
    },

    /// Validate or show the site configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage configured models
    Models {
        #[command(subcommand)]
        subcommand: ModelsSubcommand,
    },

    /// Inspect registered bulk actions
    Actions {
        #[command(subcommand)]
        subcommand: ActionsSubcommand,
    },

    /// List, add, update and delete records
    Records {
        #[command(subcommand)]
        subcommand: RecordsSubcommand,
    },

    /// Run a bulk action against selected records
    Run {
        /// Model name
        model: String,
        /// Action name (e.g. delete_selected, export_csv)
        action: String,
        /// Selected record ids, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
        /// Confirmation token printed by an earlier unconfirmed run
        #[arg(long, conflicts_with = "yes")]
        token: Option<String>,
        /// Confirm immediately without a separate prompt round-trip
        #[arg(long, short = 'y')]
        yes: bool,
        /// Write a downloadable result (e.g. CSV) to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Launch the web admin
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Open a browser once the server is listening
        #[arg(long)]
        open: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let caller = Caller::new(cli.user);

    let result = match cli.command {
        Commands::Init { name } => cmd::init::run(&root, name.as_deref()),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Models { subcommand } => cmd::models::run(&root, subcommand, cli.json),
        Commands::Actions { subcommand } => cmd::actions::run(&root, subcommand, cli.json),
        Commands::Records { subcommand } => {
            cmd::records::run(&root, &caller, subcommand, cli.json)
        }
        Commands::Run {
            model,
            action,
            ids,
            token,
            yes,
            out,
        } => cmd::run::run(
            &root,
            &caller,
            cmd::run::RunArgs {
                model,
                action,
                ids,
                token,
                yes,
                out,
            },
            cli.json,
        ),
        Commands::Serve { port, open } => cmd::serve::run(&root, port, open),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
