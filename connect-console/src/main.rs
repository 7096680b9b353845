//! Connect Console: operator CLI for the document store.
//!
//! Usage:
//!   connect-console search <text>          - Query documents (JSON result)
//!   connect-console show <id>              - Print one document
//!   connect-console approve <id> <who>     - Approve the current workflow step
//!   connect-console generate <template>    - Render a template into a document
//!   connect-console ingest <upload.json>   - Run a partner upload through sync
//!
//! Without `--data-dir` the store lives in memory and starts from the seeded
//! dataset on every run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use connect_core::{DocumentCategory, DocumentStatus, DocumentType, SortDirection, SortField};

mod commands;

#[derive(Parser)]
#[command(name = "connect-console")]
#[command(about = "WorldAPI Connect document console")]
#[command(version)]
struct Cli {
    /// RocksDB directory; in-memory when omitted
    #[arg(long, env = "CONNECT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Snapshot key inside the database
    #[arg(long, env = "CONNECT_NAMESPACE", default_value = "documents")]
    namespace: String,

    /// Seed for the synthetic dataset
    #[arg(long, env = "CONNECT_SEED", default_value = "42")]
    seed: u64,

    /// Documents generated for an empty store
    #[arg(long, env = "CONNECT_SEED_DOCUMENTS", default_value = "48")]
    documents: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search, filter, sort and paginate documents
    Search {
        /// Case-insensitive text to match
        query: Option<String>,
        #[arg(short = 't', long = "type")]
        types: Vec<DocumentType>,
        #[arg(short, long = "category")]
        categories: Vec<DocumentCategory>,
        #[arg(short, long = "status")]
        statuses: Vec<DocumentStatus>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// name, uploaded_at, last_modified or size
        #[arg(long)]
        sort: Option<SortField>,
        #[arg(long, default_value = "asc")]
        direction: SortDirection,
        #[arg(long, default_value = "0")]
        offset: usize,
        #[arg(short, long)]
        limit: Option<usize>,
        /// Include facets and suggestions
        #[arg(long)]
        full: bool,
    },

    /// Print one document
    Show { id: String },

    /// Approve the current step of a document's workflow
    Approve {
        id: String,
        approver: String,
        #[arg(short, long)]
        comment: Option<String>,
    },

    /// Reject a document's workflow
    Reject {
        id: String,
        approver: String,
        #[arg(short, long)]
        comment: String,
    },

    /// Attach a named workflow template to a document
    Attach { id: String, workflow: String },

    /// Cancel a document's active workflow
    Cancel { id: String },

    /// Delete documents by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Documents waiting on an approver
    Pending { approver: String },

    /// Render a template into a new document
    Generate {
        template_id: String,
        /// Variable assignment, repeatable
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
        #[arg(long, default_value = "console")]
        created_by: String,
        /// Skip required/validation checks
        #[arg(long)]
        force: bool,
    },

    /// Ingest a partner upload described by a JSON file
    Ingest {
        file: PathBuf,
        /// Seconds before the verification re-query
        #[arg(long, default_value = "1")]
        verify_after: u64,
    },

    /// Collection statistics
    Stats,

    /// List document and workflow templates
    Templates,

    /// List folders
    Folders,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let options = commands::OpenOptions {
        data_dir: cli.data_dir,
        namespace: cli.namespace,
        seed: cli.seed,
        seed_documents: cli.documents,
    };

    if let Err(e) = commands::run(cli.command, options).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
