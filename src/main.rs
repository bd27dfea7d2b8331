//! ScanGuard CV Engine - main entry point

use scanguard_cv::{
    backend_client::{BackendClient, Report, Reporter},
    capture::FfmpegCapture,
    detector::NoopDetector,
    fleet::FleetController,
    state::AppState,
    web_api, Settings,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scanguard_cv=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ScanGuard CV Engine v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::default();
    tracing::info!(
        backend_url = %settings.backend_url,
        frame_skip = settings.frame_skip,
        reconnect_delay_secs = settings.reconnect_delay_secs,
        max_reconnect_attempts = settings.max_reconnect_attempts,
        "Configuration loaded"
    );

    // Outbound reporting: bounded fire-and-forget queue
    let backend = Arc::new(BackendClient::from_settings(&settings));
    let reporter = Reporter::spawn(backend, settings.report_queue_depth);
    tracing::info!("Backend reporter started");

    // Detection model boundary. The engine ships without a bundled model;
    // deployments link their detector here.
    let detector = Arc::new(NoopDetector);
    let capture = Arc::new(FfmpegCapture::new());

    let fleet = Arc::new(FleetController::new(
        settings.clone(),
        detector.clone(),
        capture,
        reporter.clone(),
    ));
    tracing::info!("Fleet controller initialized");

    let state = AppState {
        settings: settings.clone(),
        fleet: fleet.clone(),
        detector,
        started_at: Instant::now(),
    };

    // Heartbeat loop
    let heartbeat_fleet = fleet.clone();
    let heartbeat_reporter = reporter.clone();
    let started_at = state.started_at;
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(settings.heartbeat_interval_secs));
        interval.tick().await; // first tick fires immediately
        loop {
            interval.tick().await;
            let uptime = started_at.elapsed().as_secs_f64();
            let heartbeat = heartbeat_fleet.heartbeat(uptime).await;
            heartbeat_reporter.dispatch(Report::Heartbeat(heartbeat));
        }
    });

    let app = web_api::create_router(state.clone())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", state.settings.host, state.settings.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
