//! Unix socket server for admin commands.
//!
//! Provides a local IPC interface for inspecting the waitlist without going
//! through the public HTTP API. One JSON command per line, one JSON response
//! per line.

use crate::error::Result;
use crate::node::NodeState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use waitlist_core::{WaitlistAnalytics, WaitlistEntry};

/// Admin command sent over the socket.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum AdminCommand {
    /// Summary analytics
    Stats,
    /// Ranked entries, best position first
    List { limit: Option<usize> },
    /// Entry by external id
    Lookup { uid: String },
    /// Entry owning a referral code
    LookupCode { code: String },
    /// Ping (health check)
    Ping,
}

/// Response from admin command.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdminResponse {
    Error { error: String },
    List { items: Vec<String> },
    Stats { analytics: WaitlistAnalytics },
    Entry { entry: WaitlistEntry },
    Pong,
}

/// Admin socket server.
pub struct AdminSocket {
    state: Arc<NodeState>,
    socket_path: PathBuf,
}

impl AdminSocket {
    /// Create a new admin socket server.
    pub fn new(state: Arc<NodeState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the admin socket server.
    pub async fn run(&self) -> Result<()> {
        // Remove existing socket file if present
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Admin socket listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state).await {
                            tracing::error!("Admin connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept admin connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, state: Arc<NodeState>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<AdminCommand>(&line) {
            Ok(cmd) => {
                let state = Arc::clone(&state);
                tokio::task::spawn_blocking(move || execute_command(cmd, &state))
                    .await
                    .unwrap_or_else(|e| AdminResponse::Error {
                        error: e.to_string(),
                    })
            }
            Err(e) => AdminResponse::Error {
                error: format!("Invalid command: {}", e),
            },
        };

        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

fn describe(entry: &WaitlistEntry) -> String {
    format!(
        "#{} {} <{}> tier={} code={} referrals={}",
        entry.position,
        entry.display_name,
        entry.contact_email,
        entry.tier,
        entry.referral_code,
        entry.referral_count
    )
}

fn execute_command(cmd: AdminCommand, state: &NodeState) -> AdminResponse {
    let service = &state.service;
    let found = |result: waitlist_core::Result<Option<WaitlistEntry>>, what: String| match result {
        Ok(Some(entry)) => AdminResponse::Entry { entry },
        Ok(None) => AdminResponse::Error {
            error: format!("No entry for {}", what),
        },
        Err(e) => AdminResponse::Error {
            error: e.to_string(),
        },
    };

    match cmd {
        AdminCommand::Stats => match service.list_ranked() {
            Ok(listing) => AdminResponse::Stats {
                analytics: listing.analytics,
            },
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::List { limit } => match service.list_ranked() {
            Ok(listing) => AdminResponse::List {
                items: listing
                    .entries
                    .iter()
                    .take(limit.unwrap_or(usize::MAX))
                    .map(describe)
                    .collect(),
            },
            Err(e) => AdminResponse::Error {
                error: e.to_string(),
            },
        },

        AdminCommand::Lookup { uid } => {
            let result = service.lookup(&uid);
            found(result, format!("uid {}", uid))
        }

        AdminCommand::LookupCode { code } => {
            let result = service.lookup_code(&code);
            found(result, format!("code {}", code))
        }

        AdminCommand::Ping => AdminResponse::Pong,
    }
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    let data_dir =
        std::env::var("WAITLIST_DATA_DIR").unwrap_or_else(|_| "./waitlist-data".to_string());
    PathBuf::from(data_dir).join("admin.sock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use waitlist_core::{MemoryStore, SignupRequest};

    fn state() -> NodeState {
        let state = NodeState::new(
            Arc::new(MemoryStore::new()),
            NodeConfig::from_lookup(|_| None).unwrap(),
        );
        for (uid, tier) in [("a", "starter"), ("b", "platinum"), ("c", "pro")] {
            state
                .service
                .signup(
                    SignupRequest::new(uid, uid.to_uppercase(), format!("{uid}@example.com"))
                        .with_tier(tier),
                )
                .unwrap();
        }
        state
    }

    #[test]
    fn list_is_ranked_and_limited() {
        let state = state();
        match execute_command(AdminCommand::List { limit: Some(2) }, &state) {
            AdminResponse::List { items } => {
                assert_eq!(items.len(), 2);
                assert!(items[0].starts_with("#1 B"));
                assert!(items[1].starts_with("#501 C"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stats_reports_totals() {
        match execute_command(AdminCommand::Stats, &state()) {
            AdminResponse::Stats { analytics } => assert_eq!(analytics.total_users, 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lookup_by_uid_and_code() {
        let state = state();
        let code = match execute_command(AdminCommand::Lookup { uid: "a".into() }, &state) {
            AdminResponse::Entry { entry } => {
                assert_eq!(entry.position, 2001);
                entry.referral_code
            }
            other => panic!("unexpected {other:?}"),
        };
        match execute_command(AdminCommand::LookupCode { code }, &state) {
            AdminResponse::Entry { entry } => assert_eq!(entry.external_id, "a"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            execute_command(AdminCommand::Lookup { uid: "zz".into() }, &state),
            AdminResponse::Error { .. }
        ));
    }

    #[test]
    fn command_wire_format() {
        let cmd: AdminCommand = serde_json::from_str(r#"{"cmd":"lookup_code","code":"AB12CD"}"#).unwrap();
        assert!(matches!(cmd, AdminCommand::LookupCode { ref code } if code == "AB12CD"));
        let cmd: AdminCommand = serde_json::from_str(r#"{"cmd":"list"}"#).unwrap();
        assert!(matches!(cmd, AdminCommand::List { limit: None }));
        assert_eq!(
            serde_json::to_string(&AdminResponse::Pong).unwrap(),
            r#"{"status":"pong"}"#
        );
    }
}
