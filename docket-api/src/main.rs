//! # Docket API Server
//!
//! Serves the Docket REST API: user accounts with emailed verification
//! codes, owner-scoped clients and projects, and delivery notes that are
//! rendered to PDF and signed once.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/docket \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p docket-api
//! ```
//!
//! See [`docket_api::config`] for every environment variable.

use docket_api::{
    app::{build_router, AppState, Collaborators},
    config::Config,
};
use docket_shared::{
    artifacts::{ArtifactStore, MemoryArtifactStore, PinataArtifactStore, PinataConfig},
    db::{
        migrations::run_migrations,
        pool::{create_pool, DatabaseConfig},
    },
    messaging::{LogMailer, Mailer, SmtpMailer},
    render::PdfRenderer,
    store::Stores,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docket_api=info,docket_shared=info,tower_http=info".into());

    let json = std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn artifact_store(config: &Config) -> anyhow::Result<Arc<dyn ArtifactStore>> {
    match (&config.artifacts.pinata_jwt, &config.artifacts.gateway_url) {
        (Some(jwt), Some(gateway)) => {
            let mut pinata = PinataConfig::new(jwt.clone(), gateway.clone());
            pinata.api_url = config.artifacts.api_url.clone();
            tracing::info!(gateway = %gateway, "Using Pinata artifact store");
            Ok(Arc::new(PinataArtifactStore::new(pinata)?))
        }
        _ => {
            tracing::warn!("PINATA_JWT not set; uploads are kept in memory and lost on restart");
            Ok(Arc::new(MemoryArtifactStore::new()))
        }
    }
}

fn mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.mail.smtp() {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP mailer");
            Ok(Arc::new(SmtpMailer::new(smtp)?))
        }
        None => {
            tracing::warn!("SMTP_HOST not set; notifications are only logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Docket API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let collaborators = Collaborators {
        mailer: mailer(&config)?,
        artifacts: artifact_store(&config)?,
        renderer: Arc::new(PdfRenderer::new()),
    };

    let bind_address = config.bind_address();
    let state = AppState::new(
        config,
        Stores::postgres(pool.clone()),
        Some(pool),
        collaborators,
    );

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
