//! Host and peer exchanging records through the in-process relay.
//!
//! Run:
//! - cargo run -p relaywarp --example loopback
//! - RUST_LOG=debug cargo run -p relaywarp --example loopback

use relaywarp::{
    loopback_broker, random_profile_name, BrokerEvent, Config, LoopbackRelay, TextRecord,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

const ROUNDS: usize = 8;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let relay = LoopbackRelay::default();

    let mut host = loopback_broker(&relay, Config::default());
    host.authenticate(&random_profile_name()).await?;
    let code = host.create_session(0).await?;
    println!("Hosting with join code {}", code);

    let mut peer = loopback_broker(&relay, Config::default());
    peer.authenticate(&random_profile_name()).await?;
    peer.join_session(code.as_str()).await?;

    for round in 0..ROUNDS {
        host.tick();
        peer.tick();

        while let Some(event) = host.recv() {
            match event {
                BrokerEvent::Connected(connection) => {
                    println!("[host] connect {}", connection);
                    host.send(connection, &TextRecord::new("welcome aboard")?)?;
                }
                BrokerEvent::Data { connection, record } => {
                    println!("[host] from={} payload=\"{}\"", connection, record);
                    // Echo back
                    host.broadcast(&record)?;
                }
                BrokerEvent::Disconnected(connection) => {
                    println!("[host] disconnect {}", connection)
                }
                BrokerEvent::SignedIn(participant) => {
                    println!("[host] signed in as {}", participant)
                }
            }
        }

        while let Some(event) = peer.recv() {
            match event {
                BrokerEvent::Connected(connection) => {
                    println!("[peer] connected as {}", connection);
                    peer.send(connection, &TextRecord::truncated("hello from the peer side"))?;
                }
                BrokerEvent::Data { record, .. } => println!("[peer] payload=\"{}\"", record),
                BrokerEvent::Disconnected(_) => println!("[peer] host went away"),
                BrokerEvent::SignedIn(participant) => {
                    println!("[peer] signed in as {}", participant)
                }
            }
        }
        info!("Round {} done", round);
    }

    peer.shutdown().await?;
    host.shutdown().await?;
    println!("Live allocations after shutdown: {}", relay.allocation_count());
    Ok(())
}
