use std::sync::Arc;

use pokedex_core::CatalogClient;
use tower_cookies::Key;
use tracing::info;

use crate::{config::Config, error::ServerError, upstream::Upstream};

pub struct AppState {
    pub config: Config,
    pub catalog: CatalogClient,
    pub upstream: Upstream,
    pub session_key: Key,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, ServerError> {
        let session_key = match &config.session_secret {
            Some(secret) => Key::try_from(secret.as_slice())
                .map_err(|e| ServerError::SessionKey(e.to_string()))?,
            None => Key::generate(),
        };
        let upstream = Upstream::new(config.upstream_timeout)?;
        let catalog = CatalogClient::new(config.upstream.clone());

        let upstream_config = catalog.config();
        info!(
            graphql = %upstream_config.graphql_url,
            rest = %upstream_config.rest_base_url,
            image_policy = %upstream_config.image_policy,
            timeout = ?config.upstream_timeout,
            "Upstream configured"
        );

        Ok(Arc::new(Self {
            config,
            catalog,
            upstream,
            session_key,
        }))
    }
}
