use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use shelf_core::ConflictSide;

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Track your home library from the command line, online or not")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Book server base URL (default: SHELF_SERVER_URL or http://localhost:3000)
    #[arg(long, global = true, value_name = "URL")]
    pub server: Option<String>,

    /// Bearer token for the book server (default: SHELF_TOKEN)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Optional path to the local cache file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a book to the collection
    #[command(alias = "new")]
    Add {
        /// Title
        name: String,
        /// Author
        author: String,
        /// Page count
        #[arg(long, default_value = "0")]
        pages: u32,
        /// Publish date (YYYY-MM-DD, defaults to today)
        #[arg(long, value_name = "DATE")]
        published: Option<String>,
        /// Mark the book as lent out / unavailable
        #[arg(long)]
        unavailable: bool,
    },
    /// List the collection
    List {
        /// Fetch from the server instead of the local cache
        #[arg(long)]
        refresh: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing book
    Edit {
        /// Book id
        id: String,
        /// New title
        #[arg(long)]
        name: Option<String>,
        /// New author
        #[arg(long)]
        author: Option<String>,
        /// New page count
        #[arg(long)]
        pages: Option<u32>,
        /// New publish date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        published: Option<String>,
        /// New availability
        #[arg(long)]
        available: Option<bool>,
    },
    /// Show writes queued while offline
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay queued writes against the server now
    Sync,
    /// Follow the collection live via the push channel
    Watch,
    /// List version conflicts awaiting a decision
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a version conflict by keeping one side
    Resolve {
        /// Origin book id (unsuffixed)
        id: String,
        /// Which side to keep
        #[arg(long, value_enum)]
        keep: KeepSide,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum KeepSide {
    /// The edit queued on this device
    Local,
    /// The server's current state
    Server,
}

impl From<KeepSide> for ConflictSide {
    fn from(side: KeepSide) -> Self {
        match side {
            KeepSide::Local => Self::Local,
            KeepSide::Server => Self::Server,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
