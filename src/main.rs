//! # Document Orchestrator CLI (`docorch`)
//!
//! ## Usage
//!
//! ```bash
//! docorch --config ./config/docorch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docorch init` | Create the SQLite database and run schema migrations |
//! | `docorch validate` | Report configuration issues (exit status 1 if any) |
//! | `docorch list-analyzers` | Show the router and category analyzers from config |
//! | `docorch setup-analyzers` | Create or update all analyzers at the provider |
//! | `docorch show-analyzer <id>` | Print an analyzer definition from the provider |
//! | `docorch delete-analyzer <id>` | Delete one analyzer at the provider |
//! | `docorch teardown-analyzers` | Delete the router and all category analyzers |
//! | `docorch process <file>` | Upload and analyze a local file |
//! | `docorch result <document_id>` | Print a stored analysis result |
//! | `docorch feedback <document_id> --fields '{...}'` | Record reviewer corrections |
//! | `docorch serve` | Start the HTTP API |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `doc_orchestrator=info`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use doc_orchestrator::context::AppContext;
use doc_orchestrator::{analyzers, config, db, documents, migrate, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Document orchestrator: routes documents through a cloud analyzer,
/// stores normalized fields, and collects reviewer feedback.
#[derive(Parser)]
#[command(
    name = "docorch",
    about = "Document classification and field-extraction orchestrator",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docorch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Validate the pipeline configuration.
    Validate,

    /// List the analyzers defined by the configuration.
    ListAnalyzers,

    /// Create or update the category analyzers, then the router.
    SetupAnalyzers,

    /// Fetch an analyzer definition from the provider.
    ShowAnalyzer {
        /// Analyzer id.
        id: String,
    },

    /// Delete an analyzer at the provider. Missing analyzers are ignored.
    DeleteAnalyzer {
        /// Analyzer id.
        id: String,
    },

    /// Delete the router analyzer and every category analyzer.
    TeardownAnalyzers,

    /// Upload a local file and analyze it.
    Process {
        /// Path to the document.
        file: PathBuf,

        /// Content type to store; guessed from the extension when omitted.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Print the stored analysis result for a document.
    Result {
        /// Document id returned by upload.
        document_id: String,
    },

    /// Record corrected field values for a document.
    Feedback {
        /// Document id the corrections apply to.
        document_id: String,

        /// Corrected fields as a JSON object, e.g. `{"total": 120.5}`.
        #[arg(long)]
        fields: String,

        /// Who made the corrections.
        #[arg(long)]
        reviewer: Option<String>,

        /// Free-form note.
        #[arg(long)]
        comment: Option<String>,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("doc_orchestrator=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Validate => {
            if !analyzers::run_validate(&cfg.pipeline()) {
                std::process::exit(1);
            }
        }
        Commands::ListAnalyzers => {
            analyzers::run_list_analyzers(&cfg.pipeline());
        }
        Commands::SetupAnalyzers => {
            let ctx = AppContext::build(&cfg).await?;
            analyzers::run_setup_analyzers(&ctx).await?;
        }
        Commands::ShowAnalyzer { id } => {
            let ctx = AppContext::build(&cfg).await?;
            analyzers::run_show_analyzer(&ctx, &id).await?;
        }
        Commands::DeleteAnalyzer { id } => {
            let ctx = AppContext::build(&cfg).await?;
            analyzers::run_delete_analyzer(&ctx, &id).await?;
        }
        Commands::TeardownAnalyzers => {
            let ctx = AppContext::build(&cfg).await?;
            analyzers::run_teardown_analyzers(&ctx).await?;
        }
        Commands::Process { file, content_type } => {
            let ctx = AppContext::build(&cfg).await?;
            documents::run_process(&ctx, &file, content_type.as_deref()).await?;
        }
        Commands::Result { document_id } => {
            documents::run_result(&cfg, &document_id).await?;
        }
        Commands::Feedback {
            document_id,
            fields,
            reviewer,
            comment,
        } => {
            documents::run_feedback(&cfg, &document_id, &fields, reviewer, comment).await?;
        }
        Commands::Serve => {
            let ctx = Arc::new(AppContext::build(&cfg).await?);
            server::run_server(ctx).await?;
        }
    }

    Ok(())
}
