use std::sync::Arc;

use intake_triage::api::{EvaluationApi, EvaluationClient};
use intake_triage::board::routes::board_routes;
use intake_triage::board::service::{self, TriageBoard};
use intake_triage::board::BoardConfig;
use intake_triage::config::TriageConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TriageConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!(
            "  export INTAKE_TRIAGE_API_URL={}",
            TriageConfig::default().api_base_url
        );
        std::process::exit(1);
    });

    eprintln!("🩺 Intake Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_base_url);
    eprintln!("   Board WS: ws://0.0.0.0:{}/ws", config.port);
    eprintln!("   Board API: http://0.0.0.0:{}/api/board", config.port);
    eprintln!("   Refresh: every {}s\n", config.refresh_interval.as_secs());

    // ── Board ───────────────────────────────────────────────────────────
    let api: Arc<dyn EvaluationApi> = Arc::new(EvaluationClient::new(
        config.api_base_url.clone(),
        config.http_timeout,
    ));
    let board = TriageBoard::new(api, BoardConfig::default());

    let initial = board.refresh().await;
    tracing::info!(
        total = initial.total,
        unplaced = initial.unplaced.len(),
        "Initial board loaded"
    );

    let _refresh_handle = service::spawn_refresh_task(Arc::clone(&board), config.refresh_interval);

    // ── Server ──────────────────────────────────────────────────────────
    let app = board_routes(board);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Triage board server started");
    axum::serve(listener, app).await?;

    Ok(())
}
