//! Rich presence demo.
//!
//! Demonstrates:
//! - Building a client and connecting to the running Discord app
//! - Watching connection state changes
//! - Publishing and updating a presence
//!
//! Usage:
//!   cargo run --example presence -- <client-id>
//!   cargo run --example presence -- <client-id> --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rich_presence_ipc::{Activity, ActivityType, Client, Result};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    init_logging(debug);

    let Some(client_id) = args.iter().find_map(|a| a.parse::<u64>().ok()) else {
        eprintln!("usage: presence <client-id> [--debug]");
        std::process::exit(2);
    };

    if let Err(e) = run(client_id).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(client_id: u64) -> Result<()> {
    println!("=== Rich Presence ===\n");

    let client = Client::builder(client_id).build()?;

    let mut states = client.subscribe();
    tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            println!("[state] {state}");
        }
    });

    let result = client.connect().await;
    println!("[connect] {result:?}");

    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    let activity = Activity::builder()
        .kind(ActivityType::Playing)
        .details("Running the demo")
        .state("Step 1 of 2")
        .start_timestamp(started)
        .large_image("rust-logo")
        .button("Crate", "https://crates.io/crates/rich-presence-ipc")
        .build()?;
    client.update(Some(activity.clone()));

    // Sent once the peer is ready, or coalesced if within the interval.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let mut next = activity;
    next.state = Some("Step 2 of 2".to_string());
    client.update(Some(next));

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();

    client.close();
    Ok(())
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "rich_presence_ipc=debug"
    } else {
        "rich_presence_ipc=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
