use std::process;

use telaio::{
    bootstrap,
    config::{self, Settings},
    error::AppError,
};
use tokio::net::TcpListener;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let (app, teardown) = bootstrap::initialize(settings).await?;

    let addr = app.settings.server.addr;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to bind `{addr}`: {err}")))?;

    info!(target = "telaio::serve", addr = %addr, "listening");

    let result = axum::serve(listener, app.router.clone().into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    let graceful = app.settings.server.graceful_shutdown;
    if tokio::time::timeout(graceful, teardown.run()).await.is_err() {
        warn!(
            target = "telaio::serve",
            timeout_secs = graceful.as_secs(),
            "teardown did not finish within the graceful shutdown window",
        );
    }

    result
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!(target = "telaio::serve", "shutdown signal received");
}
