//! # Tiffin-Cart
//!
//! Checkout and payment reconciliation service for restaurant orders.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export FRONTEND_URL=http://localhost:5173
//! export DATABASE_URL=postgres://localhost/tiffin   # optional
//!
//! # Run the server
//! tiffin-cart
//! ```

use tiffin_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    print_banner();

    let state = AppState::from_env().await?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Restaurants loaded: {}", state.restaurants.len());
    info!(
        "Pricing: currency={}, scale={}",
        state.checkout.pricing().currency(),
        state.checkout.pricing().scale()
    );

    let app = routes::create_router(state);

    info!("Tiffin-Cart starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: POST http://{}/api/order/checkout/create-checkout-session", addr);
        tiffin_stripe::print_webhook_setup_instructions(&format!(
            "http://{}/api/order/checkout/webhook",
            addr
        ));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// `LOG_FORMAT=json` switches to structured output
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn print_banner() {
    println!(
        r#"
  Tiffin-Cart
  ━━━━━━━━━━━━━━━━━━━━━━━
  Restaurant checkout service
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
