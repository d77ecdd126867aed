use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

/// Crates whose log output `--verbose` raises.
const LOG_TARGETS: [&str; 4] = [
    "drafts",
    "drafts_core",
    "drafts_infrastructure",
    "drafts_application",
];

#[derive(Parser)]
#[command(name = "drafts")]
#[command(about = "Inspect and edit the generation session history", long_about = None)]
struct Cli {
    /// History directory (overrides DRAFTS_HISTORY_DIR and the config file)
    #[arg(long, global = true)]
    history_dir: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List leaf sessions, newest first
    List,
    /// Show a session with its lineage stack
    Show {
        /// `partition/local_id` or a bare local id
        session: String,
    },
    /// Create a session
    Create {
        /// Generation parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
        /// Parent session to branch from
        #[arg(long)]
        parent: Option<String>,
    },
    /// Reserve the traces of the first COUNT variants
    BeginVariants { session: String, count: usize },
    /// Append a chunk to a variant's reasoning trace
    AppendThought {
        session: String,
        index: usize,
        chunk: String,
    },
    /// Replace a variant's code (read from stdin without --file)
    SaveCode {
        session: String,
        index: usize,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Set the title of a session
    Rename { session: String, title: String },
    /// Delete a session (its children are kept)
    Delete { session: String },
    /// Print the first variant's trace of the newest session
    LatestThought,
    /// List partitions (creation days)
    Partitions,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in LOG_TARGETS {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let history = commands::bootstrap::open_history(cli.config, cli.history_dir).await?;

    match cli.command {
        Commands::List => commands::sessions::list(&history).await?,
        Commands::Show { session } => commands::sessions::show(&history, &session).await?,
        Commands::Create { params, parent } => {
            commands::sessions::create(&history, params.as_deref(), parent.as_deref()).await?
        }
        Commands::BeginVariants { session, count } => {
            commands::variants::begin(&history, &session, count).await?
        }
        Commands::AppendThought {
            session,
            index,
            chunk,
        } => commands::variants::append_thought(&history, &session, index, &chunk).await?,
        Commands::SaveCode {
            session,
            index,
            file,
        } => commands::variants::save_code(&history, &session, index, file.as_deref()).await?,
        Commands::Rename { session, title } => {
            commands::sessions::rename(&history, &session, &title).await?
        }
        Commands::Delete { session } => commands::sessions::delete(&history, &session).await?,
        Commands::LatestThought => commands::variants::latest_thought(&history).await?,
        Commands::Partitions => commands::sessions::partitions(&history).await?,
    }

    Ok(())
}
