//! Waitlist Node binary
//!
//! Serves the signup waitlist over HTTP.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waitlist_node::{NodeConfig, WaitlistNode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waitlist_node=info,waitlist_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Waitlist Node");

    let config = NodeConfig::from_env()?;

    // Create and run node
    let node = WaitlistNode::new(config)?;
    node.run().await?;

    Ok(())
}
