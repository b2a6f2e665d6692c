//! session-keeper binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use session_keeper::cli::{self, Args};
use session_keeper::config::Config;
use session_keeper::logging;
use session_keeper::persist::{FileBackend, Persistence};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<String, Box<dyn std::error::Error>> {
    let config = Config::load(&args)?;
    logging::try_init_with(config.log_filter()).ok();

    info!("session-keeper v{}", env!("CARGO_PKG_VERSION"));
    debug!(dir = %config.storage.dir.display(), key = %config.storage.key, "opening session store");

    let backend = Arc::new(FileBackend::new(config.storage.dir.clone()));
    let (store, persistence) = Persistence::open(backend, config.persist_options()).await;

    if let Some(ref command) = args.command {
        cli::apply(command, &store);
    }

    persistence.flush().await?;
    let output = cli::render(&store.snapshot());
    persistence.detach().await;

    Ok(output)
}
