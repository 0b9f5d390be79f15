pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use capstash_core::error::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let store = handlers::StoreArgs {
        dir: cli.dir,
        config: cli.config,
        no_sweep: cli.no_sweep,
        sync: cli.sync,
    };
    match cli.command {
        Commands::Create { id } => handlers::handle_create(&store, &id),
        Commands::Append { id, files } => handlers::handle_append(&store, &id, files),
        Commands::Ingest {
            id,
            chunk_size,
            create,
        } => handlers::handle_ingest(&store, &id, chunk_size, create),
        Commands::Export { id, out, strict } => handlers::handle_export(&store, &id, out, strict),
        Commands::List { long } => handlers::handle_list(&store, long),
        Commands::Delete { id } => handlers::handle_delete(&store, &id),
        Commands::Sweep { days } => handlers::handle_sweep(&store, days),
        Commands::Compact => handlers::handle_compact(&store),
        Commands::Stats => handlers::handle_stats(&store),
        Commands::Repair { input, output } => handlers::handle_repair(input, output),
        Commands::Inspect { file } => handlers::handle_inspect(file),
    }
}
