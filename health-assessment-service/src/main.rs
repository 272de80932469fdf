use anyhow::Context as _;
use graph_flow::InMemorySessionStorage;
use health_assessment_service::{AppState, GeminiAnalyzer, ServiceConfig, create_app};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "health_assessment_service=debug,graph_flow=debug,tower_http=debug".into()
    });

    match log_format.as_str() {
        "pretty" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServiceConfig::from_env();
    let analyzer = match GeminiAnalyzer::new(&config) {
        Ok(analyzer) => analyzer,
        Err(e) => {
            error!(error = %e, "GEMINI_API_KEY (or API_KEY) not set");
            std::process::exit(1);
        }
    };
    info!(model = %config.model, temperature = config.temperature, "Analysis client ready");

    let state = AppState::new(Arc::new(InMemorySessionStorage::new()), Arc::new(analyzer));
    let app = create_app(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    let addr = listener.local_addr()?;

    info!("HealthAware assessment service running on http://{}", addr);
    info!("API description available at http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
