//! Waitlist Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for the signup page and the admin dashboard
//! - Unix admin socket for local admin ops (waitlist-admin CLI)

use crate::admin_socket::AdminSocket;
use crate::api;
use crate::config::NodeConfig;
use crate::error::Result;
use crate::notify::LogNotifier;
use crate::storage::Storage;
use std::sync::Arc;
use waitlist_core::{WaitlistService, WaitlistStore};

/// Shared state for the node. Holds no mutable counters; every sequencing
/// decision is made by the store.
pub struct NodeState {
    pub service: WaitlistService,
    pub config: NodeConfig,
}

impl NodeState {
    /// Wire a service around `store` using `config`.
    pub fn new(store: Arc<dyn WaitlistStore>, config: NodeConfig) -> Self {
        let service = WaitlistService::new(store, config.service.clone())
            .with_notifier(Arc::new(LogNotifier::new(config.site_url.clone())));
        Self { service, config }
    }
}

/// A waitlist node instance.
pub struct WaitlistNode {
    state: Arc<NodeState>,
}

impl WaitlistNode {
    /// Create a new node, opening storage under the configured data directory.
    pub fn new(config: NodeConfig) -> Result<Self> {
        // Ensure data directory exists
        std::fs::create_dir_all(&config.data_dir)?;

        let storage = Arc::new(Storage::open(config.db_path())?);
        Ok(Self {
            state: Arc::new(NodeState::new(storage, config)),
        })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<NodeState> {
        Arc::clone(&self.state)
    }

    /// Run the node (starts HTTP server and admin socket).
    pub async fn run(self) -> Result<()> {
        let config = &self.state.config;
        tracing::info!("Waitlist node starting");
        tracing::info!("  API: http://{}", config.api_addr);
        tracing::info!("  Admin: {:?}", config.admin_socket);
        tracing::info!("  Data: {:?}", config.data_dir);
        tracing::info!("  Store: {}", self.state.service.store().backend_name());

        // Start admin socket server in background
        let admin_socket = AdminSocket::new(self.state(), config.admin_socket.clone());
        tokio::spawn(async move {
            if let Err(e) = admin_socket.run().await {
                tracing::error!("Admin socket error: {}", e);
            }
        });

        // Build HTTP API
        let app = api::build_router(self.state());

        // Start HTTP server
        let listener = tokio::net::TcpListener::bind(config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
