//! waitlist-admin CLI tool
//!
//! Inspects the waitlist held by a running waitlist-node.
//!
//! Usage:
//!   waitlist-admin stats
//!   waitlist-admin list [limit]
//!   waitlist-admin lookup <uid>
//!   waitlist-admin lookup-code <code>
//!   waitlist-admin ping

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use waitlist_node::admin_socket::{default_socket_path, AdminCommand, AdminResponse};

fn print_usage() {
    eprintln!("waitlist-admin - Inspect a running waitlist node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  waitlist-admin stats               Totals, tier breakdown, top referrers");
    eprintln!("  waitlist-admin list [limit]        Ranked entries, best position first");
    eprintln!("  waitlist-admin lookup <uid>        Show one entry by user id");
    eprintln!("  waitlist-admin lookup-code <code>  Show the owner of a referral code");
    eprintln!("  waitlist-admin ping                Check if daemon is running");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  WAITLIST_SOCKET  Path to admin socket (default: ./waitlist-data/admin.sock)");
}

fn get_socket_path() -> PathBuf {
    std::env::var("WAITLIST_SOCKET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_socket_path())
}

fn send_command(cmd: AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = get_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to waitlist-node at {:?}: {}\n\
             Is the waitlist-node running?",
            socket_path, e
        )
    })?;

    // Send command
    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    // Read response
    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn required_arg(args: &[String], name: &str) -> String {
    match args.get(2) {
        Some(value) => value.clone(),
        None => {
            eprintln!("Error: {} requires a {} argument", args[1], name);
            std::process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "stats" => AdminCommand::Stats,
        "list" => {
            let limit = match args.get(2).map(|s| s.parse::<usize>()) {
                None => None,
                Some(Ok(limit)) => Some(limit),
                Some(Err(_)) => {
                    eprintln!("Error: list limit must be a number");
                    std::process::exit(1);
                }
            };
            AdminCommand::List { limit }
        }
        "lookup" => AdminCommand::Lookup {
            uid: required_arg(&args, "uid"),
        },
        "lookup-code" => AdminCommand::LookupCode {
            code: required_arg(&args, "code"),
        },
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(cmd) {
        Ok(response) => match response {
            AdminResponse::Error { error } => {
                eprintln!("Error: {}", error);
                std::process::exit(1);
            }
            AdminResponse::List { items } => {
                if items.is_empty() {
                    println!("(none)");
                } else {
                    for item in items {
                        println!("{}", item);
                    }
                }
            }
            AdminResponse::Stats { analytics } => {
                println!("Total users:      {}", analytics.total_users);
                println!("Total referrals:  {}", analytics.total_referrals);
                println!("Avg referrals:    {:.1}", analytics.avg_referrals_per_user);
                for (tier, count) in &analytics.tier_breakdown {
                    println!("  {:<9} {}", tier.as_str(), count);
                }
                if !analytics.top_referrers.is_empty() {
                    println!("Top referrers:");
                    for (rank, referrer) in analytics.top_referrers.iter().enumerate() {
                        println!(
                            "  {:>2}. {} <{}> referrals={} position=#{}",
                            rank + 1,
                            referrer.display_name,
                            referrer.contact_email,
                            referrer.referral_count,
                            referrer.position
                        );
                    }
                }
            }
            AdminResponse::Entry { entry } => match serde_json::to_string_pretty(&entry) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            },
            AdminResponse::Pong => {
                println!("pong - waitlist-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
