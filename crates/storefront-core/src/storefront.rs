//! Wiring of the client: one session, one authenticated pipeline, and the
//! product catalogue on top of it.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::{ApiClient, ProductsApi, RequestAuthenticator};
use crate::auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, SessionManager, TokenStore};
use crate::config::{Config, TokenStoreKind};

pub struct Storefront {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub authenticator: Arc<RequestAuthenticator>,
    pub products: ProductsApi,
}

impl Storefront {
    /// Build a client from `config`, choosing the token store it names
    pub fn connect(config: Config) -> Result<Self> {
        let store = Self::token_store(&config)?;
        Self::with_store(config, store)
    }

    /// Build a client around an existing token store
    pub fn with_store(config: Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let client = Arc::new(
            ApiClient::with_timeout(&config.api_base_url, &config.auth_path, config.request_timeout())
                .context("Failed to create HTTP client")?,
        );

        let session = Arc::new(SessionManager::new(
            client.clone(),
            store,
            config.session_config(),
        ));
        let authenticator = Arc::new(RequestAuthenticator::new(
            session.clone(),
            client,
            config.public_endpoints(),
        ));
        let products = ProductsApi::new(authenticator.clone(), &config.products_path);

        info!(base_url = %config.api_base_url, store = ?config.token_store, "Storefront client ready");
        Ok(Self {
            config,
            session,
            authenticator,
            products,
        })
    }

    fn token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
        let store: Arc<dyn TokenStore> = match config.token_store {
            TokenStoreKind::Keyring => Arc::new(KeyringTokenStore::new(&config.origin()?)),
            TokenStoreKind::File => {
                let dir = config.cache_dir()?;
                debug!(dir = %dir.display(), "Using file token store");
                Arc::new(FileTokenStore::new(dir))
            }
            TokenStoreKind::Memory => Arc::new(MemoryTokenStore::new()),
        };
        Ok(store)
    }
}
