use tracing::info;
use tracing_subscriber;

use clap::{values_t, App, Arg};

use arcade_relay::message::{Addressed, Envelope, LobbyInfo, Payload};
use arcade_relay::p2p::Connection;
use arcade_relay::server::{node, Application, Event, Settings};
use arcade_relay::Result;

use std::sync::Arc;

/// Answers `Hello` with a description of this node, so probes have something to talk to.
struct LobbyDirectory {
    name: String,
}

impl Application for LobbyDirectory {
    fn process_message(&self, from: &Connection, envelope: &Envelope) -> Result<Option<Payload>> {
        match envelope.payload {
            Payload::Hello => Ok(Some(Payload::LobbyInfo(LobbyInfo {
                name: self.name.clone(),
                host: envelope.recipient(),
                players: vec![],
                capacity: 0,
                private: false,
            }))),
            _ => {
                info!("{} from {} ignored", envelope.kind(), from.id().short());
                Ok(None)
            }
        }
    }

    fn on_event(&self, event: Event) {
        match event {
            Event::Disconnect(id) => info!("peer {} disconnected", id),
            event => tracing::debug!("{:?}", event),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = App::new("relay-node")
        .version("0.1")
        .about("Runs an arcade relay node")
        .arg(
            Arg::with_name("listener-ip")
                .short("a")
                .long("listener-ip")
                .value_name("LISTENER_IP")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("bootstrap-ip")
                .short("b")
                .long("bootstrap-ip")
                .value_name("BOOTSTRAP_IP")
                .multiple(true),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("CONFIG")
                .takes_value(true),
        )
        .arg(Arg::with_name("debug").long("debug").help("Logs every envelope"))
        .arg(
            Arg::with_name("relay-only")
                .long("relay-only")
                .help("Forwards envelopes but refuses application messages"),
        )
        .get_matches();

    let mut settings = Settings::new(matches.value_of("config"))?;
    if let Some(listener_ip) = matches.value_of("listener-ip") {
        settings.listener_ip = listener_ip.to_string();
    }
    if matches.is_present("bootstrap-ip") {
        settings.bootstrap_peers =
            values_t!(matches.values_of("bootstrap-ip"), String).unwrap_or_else(|e| e.exit());
    }
    settings.debug |= matches.is_present("debug");
    settings.relay_only |= matches.is_present("relay-only");

    let level = if settings.debug { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt()
        .with_level(false)
        .with_target(false)
        .without_time()
        .compact()
        .with_max_level(level)
        .init();

    let application = Arc::new(LobbyDirectory { name: settings.listener_ip.clone() });
    let server = node::run(settings, application).await?;

    let sig = if cfg!(unix) {
        use futures::future::FutureExt;
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        futures::select! {
            _ = sigint.recv().fuse() => "SIGINT",
            _ = sigterm.recv().fuse() => "SIGTERM"
        }
    } else {
        tokio::signal::ctrl_c().await?;
        "Ctrl+C"
    };
    info!(target: "relay", "Got {}, stopping...", sig);

    server.shutdown().await;
    Ok(())
}
