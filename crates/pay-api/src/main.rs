//! # eway-checkout
//!
//! Checkout payment service backed by eWAY Rapid.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export EWAY_API_KEY=...
//! export EWAY_PASSWORD=...
//! export EWAY_ENDPOINT=sandbox
//!
//! # Run the server
//! eway-checkout
//! ```

use pay_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!(
        "Gateway: {} (timeout {}s)",
        state.executor.provider_name(),
        state.config.gateway_timeout.as_secs()
    );

    let app = routes::create_router(state);

    info!("eway-checkout starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: POST http://{}/api/v1/checkout", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  eway-checkout
  ━━━━━━━━━━━━━━━━━━━━━━━
  Card payments and subscriptions
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
