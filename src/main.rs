use std::process;

use clap::Parser;
use release_notify::{Cli, ReleaseError};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing subscriber with RUST_LOG environment variable support
    // Default to "warn" level if RUST_LOG is not set
    // Write to stderr so stdout only carries the release summary
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = Cli::parse_exit_code(&e);
            if code == 0 {
                e.exit();
            }
            // clap exits with 2, which is the delivery failure code
            let _ = e.print();
            process::exit(code);
        }
    };

    if let Err(e) = cli.execute().await {
        eprintln!("Error: {e}");

        // Print the full error chain if available
        let mut source = e.source();
        while let Some(err) = source {
            eprintln!("  Caused by: {err}");
            source = err.source();
        }

        let code = e
            .downcast_ref::<ReleaseError>()
            .map_or(1, ReleaseError::exit_code);
        process::exit(code);
    }
}
