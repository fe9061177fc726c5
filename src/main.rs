use std::sync::Arc;

use dentlog::agents::OpenAiVision;
use dentlog::config::Config;
use dentlog::report::ReportService;
use dentlog::state::AppState;
use dentlog::{routes, storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dentlog=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let vision = OpenAiVision::new(
        config.openai_api_key.clone(),
        config.openai_model.clone(),
        config.openai_base_url.clone(),
        config.max_output_tokens,
        config.model_timeout,
    )?;
    let sink = storage::build_sink(&config)?;

    let reports = ReportService::new(
        Arc::new(vision),
        sink,
        config.model_timeout,
        config.sheets_timeout,
    );
    tracing::info!(
        "Using model {} with {} report sink",
        reports.model_name(),
        reports.sink_backend()
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        reports: Arc::new(reports),
    });

    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("dentlog listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
