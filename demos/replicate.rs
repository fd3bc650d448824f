//! Two replicated stores in one process, converging over multicast and
//! fading out together.
//!
//! Run with: `cargo run --example replicate`

use std::time::{Duration, SystemTime};

use fadecast::{Fader, Memory, Multicast, DEFAULT_KEY};

#[tokio::main]
async fn main() -> Result<(), fadecast::Error> {
    tracing_subscriber::fmt().init();

    let lifetime = Duration::from_secs(2);
    let group = "224.0.0.1:1888";

    let one = Multicast::new(Memory::new(lifetime), group, &DEFAULT_KEY, None, None).await?;
    let two = Multicast::new(Memory::new(lifetime), group, &DEFAULT_KEY, None, None).await?;

    one.put(b"greeting", SystemTime::now(), b"hello from one")
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    println!(
        "one holds {} item(s), two holds {} item(s)",
        one.size().await,
        two.size().await
    );
    if let Some((_, value)) = two.get(b"greeting").await {
        println!("two sees: {}", String::from_utf8_lossy(&value));
    }

    tokio::time::sleep(lifetime + Duration::from_millis(100)).await;
    println!(
        "after expiry: one holds {}, two holds {}",
        one.size().await,
        two.size().await
    );

    one.close().await?;
    two.close().await?;
    Ok(())
}
