//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the payment executor, the in-memory stores, and configuration.

use pay_core::gateway::{DEFAULT_COUNTRY, DEFAULT_GATEWAY_TIMEOUT};
use pay_core::memory::{
    CatalogProductStore, InMemoryInvoiceStore, InMemoryPaymentStore, InMemoryProfileStore,
};
use pay_core::{BoxedGateway, MethodLister, PaymentExecutor, ProductCatalog, Stores};
use pay_eway::{EwayClient, EwayConfig};
use std::sync::Arc;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Public eWAY client-side encryption key
    pub client_key: String,
    /// Time budget for each gateway call
    pub gateway_timeout: Duration,
    /// Country sent when tokenizing new cards
    pub country: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            ..defaults
        }
    }

    /// Builder: take gateway settings from the eWAY config
    pub fn with_eway(mut self, eway: &EwayConfig) -> Self {
        self.client_key = eway.client_key.clone();
        self.gateway_timeout = eway.timeout;
        self.country = eway.country.clone();
        self
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            client_key: String::new(),
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment pipeline
    pub executor: Arc<PaymentExecutor>,
    /// Payment-method listing
    pub methods: Arc<MethodLister>,
    pub payments: Arc<InMemoryPaymentStore>,
    pub invoices: Arc<InMemoryInvoiceStore>,
    pub profiles: Arc<InMemoryProfileStore>,
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState backed by the eWAY Rapid API
    pub fn new() -> anyhow::Result<Self> {
        let eway = EwayConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load eWAY config: {}", e))?;
        let config = AppConfig::from_env().with_eway(&eway);

        // Load product catalog
        let catalog = load_product_catalog()?;

        let client = EwayClient::new(eway)
            .map_err(|e| anyhow::anyhow!("Failed to initialize eWAY: {}", e))?;

        Ok(Self::with_gateway(config, catalog, Arc::new(client)))
    }

    /// Create state around any gateway, with in-memory stores
    pub fn with_gateway(config: AppConfig, catalog: ProductCatalog, gateway: BoxedGateway) -> Self {
        let payments = Arc::new(InMemoryPaymentStore::new());
        let invoices = Arc::new(InMemoryInvoiceStore::new());
        let profiles = Arc::new(InMemoryProfileStore::new());

        let stores = Stores {
            payments: payments.clone(),
            profiles: profiles.clone(),
            invoices: invoices.clone(),
            products: Arc::new(CatalogProductStore::new(catalog.clone())),
        };

        let executor = PaymentExecutor::builder(gateway, stores)
            .with_timeout(config.gateway_timeout)
            .with_country(config.country.clone())
            .build();
        let methods = MethodLister::new(profiles.clone(), config.client_key.clone());

        Self {
            executor: Arc::new(executor),
            methods: Arc::new(methods),
            payments,
            invoices,
            profiles,
            catalog: Arc::new(catalog),
            config,
        }
    }
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    // Try to load from config/products.toml
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    // Return empty catalog if no config found
    tracing::warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.country, "au");
        assert!(!config.is_production());
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ..AppConfig::default()
        };

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_with_eway_settings() {
        let eway = EwayConfig::new("key", "pw")
            .with_client_key("epk-123")
            .with_timeout(Duration::from_secs(10));

        let config = AppConfig::default().with_eway(&eway);
        assert_eq!(config.client_key, "epk-123");
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
    }
}
