//! # Alipay Checkout RS
//!
//! Demo checkout server for the Alipay open platform.
//!
//! ## Usage
//!
//! ```bash
//! # Either provide config/alipay.toml or set environment variables
//! export ALIPAY_APP_ID=2021...
//! export ALIPAY_PRIVATE_KEY=MIIE...
//! export ALIPAY_PUBLIC_KEY=MIIB...
//! export ALIPAY_NOTIFY_URL=https://example.com/notify
//!
//! # Run the server
//! alipay-checkout
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

    // Keys are parsed here; a bad key aborts startup
    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.strategy.provider_name());
    info!(
        "Default flow: {}, amount: {}",
        state.config.pay_flow, state.config.pay_amount
    );
    info!("Receipts: {}", state.receipts.path().display());

    let app = routes::create_router(state);

    info!("Alipay checkout starting on http://{}", addr);

    if !is_prod {
        info!("Pay (QR code): http://{}/pay/precreate", addr);
        info!("Pay (mobile): http://{}/pay/wap", addr);
        info!("Notify: POST http://{}/notify", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Alipay Checkout RS
  ━━━━━━━━━━━━━━━━━━
  RSA2-signed gateway demo
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
