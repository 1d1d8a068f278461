//! Waitlist Node - deployable waitlist daemon
//!
//! Serves the waitlist over HTTP and persists it in RocksDB.
//!
//! # Architecture
//!
//! - **Storage**: RocksDB `TransactionDB` implementing [`waitlist_core::WaitlistStore`]
//! - **API**: HTTP endpoints for signup and the ranked listing
//! - **Admin Socket**: Unix socket for local admin commands (waitlist-admin CLI)
//! - **Notifier**: hands successful signups to the welcome-mail collaborator
//!
//! # Example
//!
//! ```no_run
//! use waitlist_node::{NodeConfig, WaitlistNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = WaitlistNode::new(config)?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod admin_socket;
pub mod api;
pub mod config;
pub mod error;
pub mod node;
pub mod notify;
pub mod storage;

pub use config::NodeConfig;
pub use error::{Error, Result};
pub use node::{NodeState, WaitlistNode};
pub use notify::LogNotifier;
pub use storage::Storage;
