//! Camera selector demo with in-memory discovery and routing
//!
//! Run with: cargo run --example selector_demo [CONFIG_JSON] [STATE_FILE]
//!
//! Examples:
//!   cargo run --example selector_demo                          # defaults, state in camsel.json
//!   cargo run --example selector_demo config.json state.json
//!
//! Two sources are announced at startup. Slot 0 is bound to the first one,
//! whose PTZ hostname is `localhost`, so VISCA sent to the slot 0 relay port
//! comes back out on localhost:52381.
//!
//! With a VISCA-over-IP controller, point camera 1 at `<this host>:10001`.

use std::sync::Arc;
use std::time::Duration;

use camsel::discovery::{MemoryDiscovery, SourceHandle};
use camsel::persist::JsonFileStore;
use camsel::resolve::DnsResolver;
use camsel::router::MemoryRouting;
use camsel::{CameraSelector, SelectorConfig};

const STAGE: &str = "localhost (Stage)";
const WIDE: &str = "WIDE-CAM (Wide)";

fn print_usage() {
    eprintln!("Usage: selector_demo [CONFIG_JSON] [STATE_FILE]");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);

    let config = match args.next() {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(camsel::Error::from)
            .and_then(|json| SelectorConfig::from_json(&json))
        {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}: {}", path, e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => SelectorConfig::default(),
    };
    let state_file = args.next().unwrap_or_else(|| "camsel.json".into());

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("camsel=debug".parse()?)
                .add_directive("selector_demo=debug".parse()?),
        )
        .init();

    let discovery = MemoryDiscovery::new();
    discovery.announce(SourceHandle::new(STAGE));
    discovery.announce(SourceHandle::new(WIDE));

    let routing = MemoryRouting::new();
    let selector = CameraSelector::start(
        config,
        Arc::new(discovery),
        &routing,
        Arc::new(JsonFileStore::new(&state_file)),
        Arc::new(DnsResolver),
    )
    .await?;

    for slot in 0..selector.config().camera_count {
        if let Some(addr) = selector.relay_addr(slot).await {
            println!("CAM{}: PTZ relay on {}", slot + 1, addr);
        }
    }
    println!();

    // let the first polls populate the cache
    while selector.cache().find(STAGE).await.is_none() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    selector.assign(0, STAGE).await?;

    println!("Sources: {}", selector.sorted_names().await.join(", "));
    for slot in selector.slots().await {
        println!("{} -> {}", slot.name(), slot.source().name());
    }
    println!();
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    println!("\nShutting down...");
    selector.shutdown().await;

    for call in routing.calls() {
        tracing::debug!(router = %call.router, target = ?call.target, "Route call");
    }

    Ok(())
}
