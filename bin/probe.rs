use tracing::info;
use tracing_subscriber;

use clap::{value_t, App, Arg};

use arcade_relay::message::Payload;
use arcade_relay::server::{parse_addr, NullApplication, Server, Settings};
use arcade_relay::{Error, Result};

use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_level(false)
        .with_target(false)
        .without_time()
        .compact()
        .with_max_level(tracing::Level::INFO)
        .init();

    let matches = App::new("relay-probe")
        .version("0.1")
        .about("Asks a relay node to describe itself")
        .arg(
            Arg::with_name("peer-ip")
                .short("p")
                .long("peer-ip")
                .value_name("PEER_IP")
                .required(true)
                .takes_value(true),
        )
        .get_matches();

    let peer_ip = value_t!(matches.value_of("peer-ip"), String).unwrap_or_else(|e| e.exit());
    let peer_ip = parse_addr(&peer_ip)?;

    let settings = Settings { track_on_connect: false, ..Settings::default() };
    let probe = Server::new(settings, Arc::new(NullApplication));
    let connection = probe.dial(peer_ip).await?;
    let peer = connection.id();

    let start = Instant::now();
    let reply = probe.request(&peer, peer, Payload::Hello).await;
    let elapsed = start.elapsed();
    probe.leave(&peer).await?;

    match reply?.payload {
        Payload::LobbyInfo(lobby) => {
            info!("{} answered in {:?}", peer, elapsed);
            info!("{:#?}", lobby);
            Ok(())
        }
        Payload::Error(err) => Err(Error::ConnectionRefused(err.message)),
        other => Err(Error::Handshake(format!("unexpected reply {}", other.kind()))),
    }
}
