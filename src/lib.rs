pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod lists;
pub mod middleware;
pub mod server;
pub mod views;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use catalog::{MovieCatalog, OfflineCatalog, TmdbCatalog};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),
    #[error("Catalog error: {0}")]
    Catalog(#[from] catalog::CatalogError),
    #[error("View error: {0}")]
    View(#[from] views::ViewError),
    #[error("Server error: {0}")]
    Server(String),
}

/// Open the database and assemble the application state described by `config`.
pub async fn build_state(config: config::Config) -> Result<server::AppState, ServerError> {
    let db_path = config
        .get_database_path()
        .ok_or_else(|| ServerError::Server("No database path configured".to_string()))?;

    info!("Opening database at {}", db_path);
    let db = Arc::new(db::SqliteRepository::new(&db_path).await?);

    let catalog: Arc<dyn MovieCatalog> = match config.tmdb {
        Some(ref tmdb) => {
            info!("Using TMDB catalog at {}", tmdb.base_url);
            Arc::new(TmdbCatalog::new(tmdb)?)
        }
        None => Arc::new(OfflineCatalog),
    };

    let secret_key = match config.secret_key {
        Some(ref key) if !key.is_empty() => key.clone(),
        _ => {
            warn!("No secret_key configured, sessions will not survive a restart");
            uuid::Uuid::new_v4().simple().to_string()
        }
    };

    let views = views::Views::new()?;

    Ok(server::AppState::new(config, db, catalog, &secret_key, views))
}

pub async fn run(config: config::Config) -> Result<(), ServerError> {
    if config.debug {
        info!("Debug logging enabled");
    }

    let address = config.listen.address.as_deref().unwrap_or("127.0.0.1");
    let addr: SocketAddr = format!("{}:{}", address, config.listen.port)
        .parse()
        .map_err(|e| ServerError::Server(format!("Invalid address: {}", e)))?;

    let tls = match (&config.listen.tlscert, &config.listen.tlskey) {
        (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
        _ => None,
    };

    let state = build_state(config).await?;
    state.db.clone().start_background_tasks();
    let app = server::build_router(state);

    if let Some((cert_path, key_path)) = tls {
        info!("Loading TLS certificate from {}", cert_path);
        info!("Loading TLS key from {}", key_path);

        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&cert_path, &key_path)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to load TLS config: {}", e)))?;

        info!("Serving HTTPS on {}", addr);

        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    } else {
        info!("Serving HTTP on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(format!("Server error: {}", e)))?;
    }

    Ok(())
}
