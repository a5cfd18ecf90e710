//! Example: List the ESC Radio stream variants
//!
//! Run with: cargo run --example list_streams
//! Or against another backend: cargo run --example list_streams -- https://radio.example.org

use escradio::EscRadioClient;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Get base URL from command line or use default
    let base_url = env::args()
        .nth(1)
        .unwrap_or_else(|| escradio::config::DEFAULT_API_BASE_URL.to_string());

    println!("Fetching stream variants from {}...\n", base_url);

    let client = EscRadioClient::builder().base_url(&base_url).build()?;
    let streams = client.list_streams().await?;

    println!("Found {} stream variants:", streams.len());
    println!("---");

    for stream in &streams {
        println!("#{} {}", stream.id, stream.name);
        println!("  Format: {} @ {} kbps", stream.format, stream.bitrate);
        println!("  Status: {}", stream.status);
        println!(
            "  Listeners: {} / {}",
            stream.current_listeners, stream.max_listeners
        );
        println!("  URL: {}", stream.url);
        if stream.is_fallback_relay() {
            println!("  (fallback relay, hidden from the quality picker)");
        }
        println!();
    }

    // Fresher detail view of the first variant
    if let Some(first) = streams.first() {
        let fresh = client.stream_detail(first.id).await?;
        println!("Now playing on {}:", fresh.name);
        println!("  {}", fresh.metadata.display());
        if let Some(album) = &fresh.metadata.album {
            println!("  Album: {}", album);
        }
    }

    Ok(())
}
