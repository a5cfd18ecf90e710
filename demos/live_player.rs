//! Example: Follow the ESC Radio live feed
//!
//! Connects to the push broker, tunes to the first stream variant, and
//! prints now-playing updates as they arrive.
//!
//! Run with: cargo run --example live_player
//! Or with a config file: cargo run --example live_player -- escradio.yaml

use escradio::{NullSink, RadioSession, SessionConfig};
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load config from a YAML file if one was given
    let config = match env::args().nth(1) {
        Some(path) => SessionConfig::from_yaml_file(&path)?,
        None => SessionConfig::default(),
    };

    let mut session = RadioSession::from_config(&config, Box::new(NullSink))?;

    println!("Connecting to {}...", config.broker.websocket_url());
    session.acquire().await?;

    session.load_streams().await?;
    let Some(stream) = session.selected() else {
        println!("No streams available");
        return Ok(());
    };
    println!(
        "Tuned to {} ({} kbps {})\n",
        stream.name, stream.bitrate, stream.format
    );

    session.play().await;

    // Pump broker messages until interrupted
    loop {
        tokio::select! {
            more = session.process_next() => {
                if !more {
                    println!("Broker connection closed");
                    break;
                }
                if let Some(stream) = session.selected() {
                    println!(
                        "[{}] {} | {} listeners",
                        stream.status,
                        stream.metadata.display(),
                        stream.current_listeners
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down");
                break;
            }
        }
    }

    session.release().await;
    Ok(())
}
