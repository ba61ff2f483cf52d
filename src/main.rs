// main.rs
use clap::Parser;
use tracing_subscriber::EnvFilter;

use reminder::cli::{self, Args, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,reminder=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = args.data_dir;

    let result = match args.command {
        Commands::Add { title, message, in_offset, at } => {
            cli::handle_add(title, message, in_offset, at, data_dir).await
        }
        Commands::List => cli::handle_list(data_dir).await,
        Commands::Remove { id } => cli::handle_remove(id, data_dir).await,
        Commands::Cleanup => cli::handle_cleanup(data_dir).await,
        Commands::Run { background, show_ui } => {
            cli::handle_run(background, show_ui, data_dir).await
        }
    };

    // A pending stdin read blocks runtime shutdown.
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            1
        }
    };
    std::process::exit(code);
}
