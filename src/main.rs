use anyhow::{Context, Result};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabpresence::app::App;
use tabpresence::config::{Config, Settings};

/// How long shutdown waits for blocking work such as an abandoned handshake
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    let command = cli.command();
    let result = runtime.block_on(async move {
        let mut app = App::new(settings);
        app.run(command).await
    });

    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    result
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("tabpresence=debug,tabpresence_core=debug")
    } else {
        EnvFilter::new("tabpresence=info,tabpresence_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
