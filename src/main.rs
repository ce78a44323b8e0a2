mod backend;
mod cli;
mod error;
mod logging;
mod model;
mod orchestrator;
mod storage;
#[cfg(test)]
mod testing;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
mod wizard;

use anyhow::Result;
use clap::Parser;
use logging::LogSink;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.json || args.text || !cfg!(feature = "tui");

    let sink = match args.log_file.as_deref() {
        Some(path) => LogSink::File(path),
        None if is_non_tui => LogSink::Stderr,
        None => LogSink::Disabled,
    };
    logging::init_tracing(sink, args.log_json)?;

    match cli::run(args).await {
        Ok(()) => {
            // Stdin reads park a blocking thread; exit instead of waiting on it.
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "docfill failed");
            Err(e)
        }
    }
}
