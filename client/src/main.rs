use clap::Parser;
use cli::CliOpts;
use color_eyre::{eyre::WrapErr, Result};
use config::RuntimeConfig;
use libp2p::{multiaddr::Protocol, PeerId};
use peerchat_core::{
	p2p::{self, OutputEvent as P2pEvent},
	shutdown::Controller,
	utils::spawn_in_span,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, trace, Level, Subscriber};
use tracing_subscriber::{fmt::format, EnvFilter, FmtSubscriber};

mod cli;
mod config;
mod session;

pub fn json_subscriber(log_level: Level) -> impl Subscriber + Send + Sync {
	FmtSubscriber::builder()
		.json()
		.with_env_filter(EnvFilter::new(format!(
			"peerchat={log_level},peerchat_core={log_level}"
		)))
		.with_span_events(format::FmtSpan::CLOSE)
		.finish()
}

pub fn default_subscriber(log_level: Level) -> impl Subscriber + Send + Sync {
	FmtSubscriber::builder()
		.with_env_filter(EnvFilter::new(format!(
			"peerchat={log_level},peerchat_core={log_level}"
		)))
		.with_span_events(format::FmtSpan::CLOSE)
		.finish()
}

async fn run(cfg: RuntimeConfig, target: Option<String>, shutdown: Controller<String>) -> Result<()> {
	let version = clap::crate_version!();
	info!(version, "Running {}", clap::crate_name!());
	info!("Using config: {cfg:?}");

	let (id_keys, peer_id) = p2p::keypair(cfg.libp2p.secret_key.as_ref())?;

	let (p2p_client, chat_inbound, p2p_event_loop, p2p_event_receiver) =
		p2p::init(cfg.libp2p.clone(), id_keys, shutdown.clone()).await?;

	spawn_in_span(shutdown.with_cancel(p2p_event_loop.run()));
	spawn_in_span(shutdown.with_cancel(chat_inbound.run()));

	let address = p2p_client
		.start_listening(cfg.libp2p.tcp_multiaddress())
		.await
		.wrap_err("Error starting listener.")?;

	println!("Peer started");
	println!("Peer id: {peer_id}");
	println!(
		"Share this multiaddress: {}",
		address.with(Protocol::P2p(peer_id))
	);

	spawn_in_span(shutdown.with_cancel(handle_events(peer_id, p2p_event_receiver)));

	let mut session = session::Session::new(p2p_client);
	session.select_target(target).await?;
	session.run().await
}

async fn handle_events(peer_id: PeerId, mut p2p_receiver: UnboundedReceiver<P2pEvent>) {
	while let Some(p2p_event) = p2p_receiver.recv().await {
		match p2p_event {
			P2pEvent::NewListenAddr(address) => {
				println!(
					"Share this multiaddress: {}",
					address.with(Protocol::P2p(peer_id))
				);
			},
			P2pEvent::EstablishedConnection { peer } => {
				info!("Connection established with {peer}");
			},
			P2pEvent::IncomingConnection => {
				trace!("Incoming connection");
			},
			P2pEvent::OutgoingConnectionError => {
				trace!("Outgoing connection error");
			},
			P2pEvent::Ping { peer, rtt } => {
				trace!("Ping from {peer}: {} ms", rtt.as_millis());
			},
		}
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	let shutdown = Controller::new();
	let opts = CliOpts::parse();
	let cfg = config::load_runtime_config(&opts)?;

	if cfg.log_format_json {
		tracing::subscriber::set_global_default(json_subscriber(cfg.log_level))?;
	} else {
		tracing::subscriber::set_global_default(default_subscriber(cfg.log_level))?;
	};

	// watch for ctrl-c signals from the user to trigger the shutdown
	spawn_in_span(shutdown.on_user_signal("User signaled shutdown".to_string()));

	if let Err(error) = run(cfg, opts.target.clone(), shutdown.clone()).await {
		error!("{error:#}");
		return Err(error.wrap_err("Starting peerchat failed"));
	};

	// the foreground session is done, but the process stays alive so the
	// inbound chat handlers keep receiving messages
	let reason = shutdown.completed_shutdown().await;
	info!("Shutdown complete: {reason}");
	Ok(())
}
