use std::time::Duration;

use clap::Parser;
use log::info;

use server::hub::wall_entity;
use server::network::Server;
use shared::Vec2;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the relay to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent connections
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Seconds of silence before a connection is dropped
    #[arg(short, long, default_value = "5")]
    timeout_secs: u64,
}

/// Static level geometry, owned by the relay (entity ids 0..) and replayed
/// to every joiner: two vertical walls flanking the arena center.
fn level_walls() -> Vec<shared::Entity> {
    vec![
        wall_entity(0, Vec2::new(-4.0, -6.0), Vec2::new(-4.0, 6.0)),
        wall_entity(1, Vec2::new(4.0, -6.0), Vec2::new(4.0, 6.0)),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting relay on {}", address);

    let mut server = Server::new(
        &address,
        args.max_clients,
        Duration::from_secs(args.timeout_secs),
        level_walls(),
    )
    .await?;

    server.run().await
}
