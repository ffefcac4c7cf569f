//! 1Q AI/ML Quiz - terminal client
//!
//! Talks to the quiz service over a WebSocket and walks the user through
//! topic, subtopic and difficulty selection, one question, and its
//! evaluation.

mod channel;
mod config;
mod console;
mod protocol;
mod runtime;
mod state_machine;

use channel::WebSocketChannel;
use config::{ClientConfig, LogFormat};
use runtime::SessionRuntime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    init_logging(config.log_format);

    // Channel and runtime share one event queue
    let (event_tx, event_rx) = runtime::event_queue();
    let channel = WebSocketChannel::new(config.server_url.clone(), event_tx.clone());
    let mut runtime = SessionRuntime::new(channel, event_tx, event_rx, config.response_timeout);
    let handle = runtime.handle();
    let updates = handle.subscribe();

    if let Err(e) = runtime.connect().await {
        tracing::error!(error = %e, "Could not reach quiz service");
        eprintln!("Could not reach the quiz service ({e}). Please retry later.");
        std::process::exit(1);
    }
    tracing::info!(
        session_id = %runtime.session_id(),
        url = %config.server_url,
        "Quiz session started"
    );

    let initial = runtime.state().clone();
    let shutdown = CancellationToken::new();
    let runtime_task = tokio::spawn(runtime.run(shutdown.clone()));

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            ctrl_c.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let result = console::run(
        stdin,
        tokio::io::stdout(),
        &handle,
        updates,
        initial,
        &shutdown,
    )
    .await;

    shutdown.cancel();
    if let Err(e) = runtime_task.await {
        tracing::error!(error = %e, "Session runtime panicked");
    }

    // The blocking stdin read cannot be cancelled; exit instead of waiting on it
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Console error: {e}");
            1
        }
    };
    std::process::exit(code)
}

fn init_logging(format: LogFormat) {
    let json = (format == LogFormat::Json).then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(std::io::stderr)
    });
    let text = (format == LogFormat::Text)
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quiz_client=info".into()),
        )
        .with(json)
        .with(text)
        .init();
}
