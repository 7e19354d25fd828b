use clap::Parser;
use log::info;
use macroquad::prelude::*;

use client::game::World;
use client::input::InputManager;
use client::network::NetworkClient;
use client::rendering::Renderer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Arena".to_owned(),
        window_width: 800,
        window_height: 800,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Controls: WASD/arrows to move, left mouse to shoot, Space to change colour, Escape to quit");

    let mut net = match NetworkClient::new(&args.server) {
        Ok(net) => net,
        Err(e) => {
            eprintln!("Failed to open socket for {}: {}", args.server, e);
            return;
        }
    };
    net.connect();

    let mut world = World::new();
    let mut input_manager = InputManager::new();
    let renderer = Renderer::new();

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        let dt = get_frame_time();

        for message in net.poll() {
            world.apply(message);
        }

        let mut input = input_manager.sample();
        input.aim = renderer.screen_to_world(input.aim);

        world.tick(dt, &input);

        for message in world.drain_outbox() {
            net.send(&message);
        }
        net.maybe_heartbeat();

        renderer.render(&world);

        next_frame().await;
    }

    net.disconnect();
    info!("Client shut down");
}
