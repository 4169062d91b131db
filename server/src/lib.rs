//! Session-authenticated proxy in front of the PokeAPI catalog.
//!
//! # Routes
//! - `POST /api/v1/login`, `POST|DELETE /api/v1/logout`
//! - `GET /api/v1/pokemons?offset&limit&search&sort_by` (session required)
//! - `GET /api/v1/pokemons/{id}` (session required)
//! - `GET /health`
//!
//! Query construction and response normalization live in `pokedex-core`;
//! this crate only validates input, runs the upstream round-trip with a
//! bounded timeout and maps outcomes to statuses.
//!
//! # Setup
//!
//! Run against the live PokeAPI.
//! ```sh
//! RUST_LOG=info cargo run -p pokedex-proxy
//! ```
//!
//! Run against the fixture upstream.
//! ```sh
//! cargo run -p mock-upstream &
//! POKEAPI_GRAPHQL_URL=http://127.0.0.1:4000/graphql \
//! POKEAPI_BASE_URL=http://127.0.0.1:4000 \
//!     cargo run -p pokedex-proxy
//! ```

use std::{sync::Arc, time::Duration};

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod upstream;

use config::Config;
use error::ServerError;
use routes::{detail_handler, health_handler, list_handler, login_handler, logout_handler};
use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(state.config.cors_origins.clone()))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(60 * 60));

    let protected = Router::new()
        .route("/pokemons", get(list_handler))
        .route("/pokemons/{id}", get(detail_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_session,
        ));

    let api = Router::new()
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler).delete(logout_handler))
        .merge(protected);

    Router::new()
        .nest("/api/v1", api)
        .route("/health", get(health_handler))
        .layer(CookieManagerLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server() -> Result<(), ServerError> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Loading configuration...");
    let state = AppState::new(Config::load()?)?;

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("Server running on {address}");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
