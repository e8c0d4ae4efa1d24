//! Parley terminal client entry point.

use std::sync::Arc;

use parley_app::config::AppConfig;
use parley_app::context::AppContext;
use parley_app::error::AppError;
use parley_app::shell::Shell;
use parley_app::telemetry;
use parley_app::terminal::{self, PrintingLauncher, TerminalBell};
use parley_navigation::follow_session;
use tokio::io::BufReader;
use tracing::{Instrument, info, info_span};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    info!(backend = %config.backend_url, "starting parley");

    let context = AppContext::new(
        &config,
        Arc::new(PrintingLauncher),
        Arc::new(TerminalBell),
    )?;

    // Subscribe before resolving so the resolution event reaches navigation.
    let driver = follow_session(context.navigator.clone(), context.session.subscribe());
    let session = context.session.clone();
    tokio::spawn(
        async move {
            session.resolve().await;
        }
        .instrument(info_span!("resolve_session")),
    );

    let mut shell = Shell::new(context);
    shell
        .begin(config.skip_intro)
        .map_err(|e| AppError::Config(e.to_string()))?;

    let result = terminal::run(
        &mut shell,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    shell.shutdown();
    driver.abort();
    info!("parley stopped");
    telemetry.shutdown();
    result
}
