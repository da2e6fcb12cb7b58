mod bot;
mod config;
mod roster;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use bot::Bot;
use config::ClientConfig;

#[derive(Parser)]
#[command(name = "karma-client")]
#[command(about = "Headless KARMA client")]
struct Args {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = karma::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "bot")]
    name: String,

    #[arg(long, default_value_t = karma::net::DEFAULT_CONNECT_TIMEOUT_MS)]
    connect_timeout_ms: u32,

    #[arg(long, default_value_t = 20, help = "Location updates per second")]
    location_rate: u32,

    #[arg(long, help = "Chat line broadcast after the first spawn")]
    chat: Option<String>,

    #[arg(long, help = "Fire one shot after the first spawn")]
    shoot: bool,

    #[arg(short, long, help = "Leave after this many seconds")]
    duration: Option<u64>,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            name: args.name,
            connect_timeout_ms: args.connect_timeout_ms,
            location_rate: args.location_rate,
            chat: args.chat,
            fire_shot: args.shoot,
            duration: args.duration.map(Duration::from_secs),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ClientConfig::from(Args::parse());
    let mut bot = Bot::new(config);
    bot.connect()?;

    let disconnect = bot.run();

    log::info!(
        "Session over as client {:?} ({}), {} other players known, {} alive",
        bot.client_id(),
        if bot.is_alive() { "alive" } else { "dead" },
        bot.roster().len(),
        bot.roster().alive_count()
    );
    match disconnect {
        Some(event) => println!("{}", event.reason),
        None => println!("{}", karma::net::DISCONNECTED_REASON),
    }

    Ok(())
}
