use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use server::config::{AppConfig, CorsConfig};
use server::database::init_db;
use server::evaluator::HttpEvaluator;
use server::live::SubmissionFeed;
use server::seed::{bootstrap_superadmin, ensure_indexes, ensure_stats_row, seed_role_permissions};
use server::state::AppState;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(config.max_age))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to connect to database")?;
    seed_role_permissions(&db)
        .await
        .context("Failed to seed roles")?;
    ensure_stats_row(&db)
        .await
        .context("Failed to seed daily stats")?;
    if let Some(ref user_id) = config.auth.bootstrap_superadmin {
        bootstrap_superadmin(&db, user_id)
            .await
            .context("Failed to bootstrap superadmin")?;
    }
    ensure_indexes(&db).await?;

    let evaluator = HttpEvaluator::new(config.evaluator.clone())
        .context("Failed to build evaluator client")?;
    info!(base_url = %config.evaluator.base_url, "Evaluator client ready");

    let cors = cors_layer(&config.server.cors);
    let address = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        db,
        config,
        evaluator: Arc::new(evaluator),
        feed: SubmissionFeed::default(),
    };

    let app = server::build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
