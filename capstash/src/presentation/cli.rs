use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "capstash: chunked screen-capture store", long_about = None)]
pub struct Cli {
    /// Store directory
    #[arg(long, global = true, default_value = ".capstash")]
    pub dir: PathBuf,

    /// JSON config file; defaults apply to missing keys
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip the retention sweep normally run when the store opens
    #[arg(long, global = true)]
    pub no_sweep: bool,

    /// fsync the journal and frame file after every commit
    #[arg(long, global = true)]
    pub sync: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new recording
    Create { id: String },

    /// Append each file as one fragment, in argument order
    Append {
        id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Read stdin and append it in fixed-size chunks
    Ingest {
        id: String,
        #[arg(long, default_value_t = 64 * 1024)]
        chunk_size: usize,
        /// Create the recording first if it does not exist
        #[arg(long)]
        create: bool,
    },

    /// Reassemble a recording into a seekable file
    Export {
        id: String,
        /// Output file or directory (defaults to the generated name in the cwd)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Fail instead of writing unrepaired bytes when repair fails
        #[arg(long)]
        strict: bool,
    },

    /// List recordings, newest first
    List {
        /// show fragment count and timestamps
        #[arg(long)]
        long: bool,
    },

    /// Delete a recording and its fragments
    Delete { id: String },

    /// Delete recordings finished more than N days ago
    Sweep {
        #[arg(long)]
        days: Option<u32>,
    },

    /// Rewrite the frame file without unreferenced payloads
    Compact,

    /// Print store totals
    Stats,

    /// Repair a standalone capture file
    Repair { input: PathBuf, output: PathBuf },

    /// Print what the container decoder sees in a capture file
    Inspect { file: PathBuf },
}
