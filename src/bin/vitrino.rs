use anyhow::Result;
use vitrino::cli::{self, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    // Flush any buffered spans before the process exits.
    telemetry::shutdown_tracer();

    result
}
