use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use libp2p::{
	identify,
	identity::{self, Keypair},
	noise, ping,
	swarm::NetworkBehaviour,
	tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder,
};
use libp2p_stream as stream;
use multihash::Hasher;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::info;

pub mod configuration;

mod client;
mod event_loop;

use crate::{chat, shutdown::Controller, types::SecretKey};
use configuration::LibP2PConfig;
pub use client::Client;
pub use event_loop::EventLoop;

#[derive(Clone, Debug)]
pub enum OutputEvent {
	NewListenAddr(Multiaddr),
	IncomingConnection,
	EstablishedConnection { peer: PeerId },
	OutgoingConnectionError,
	Ping { peer: PeerId, rtt: Duration },
}

// Behaviour struct is used to derive delegated Libp2p behaviour implementation
#[derive(NetworkBehaviour)]
pub struct Behaviour {
	chat: stream::Behaviour,
	identify: identify::Behaviour,
	ping: ping::Behaviour,
}

/// Creates the identity keypair for the local node and derives its peer id.
///
/// Without a configured secret key a fresh random Ed25519 keypair is
/// generated; it lives and dies with the process.
pub fn keypair(secret_key: Option<&SecretKey>) -> Result<(Keypair, PeerId)> {
	let keypair = match secret_key {
		None => identity::Keypair::generate_ed25519(),
		// If seed is provided, generate secret key from seed
		Some(SecretKey::Seed { seed }) => {
			let seed_digest = multihash::Sha3_256::digest(seed.as_bytes());
			identity::Keypair::ed25519_from_bytes(seed_digest)
				.wrap_err("error generating secret key from seed")?
		},
		// Import secret key if provided
		Some(SecretKey::Key { key }) => {
			let mut decoded_key = [0u8; 32];
			hex::decode_to_slice(key.clone().into_bytes(), &mut decoded_key)
				.wrap_err("error decoding secret key from config")?;
			identity::Keypair::ed25519_from_bytes(decoded_key)
				.wrap_err("error importing secret key")?
		},
	};
	let peer_id = PeerId::from(keypair.public());
	Ok((keypair, peer_id))
}

/// Builds the swarm, registers the chat protocol and wires the command and
/// event channels. The chat protocol is registered here, before the host can
/// accept any connection.
pub async fn init(
	cfg: LibP2PConfig,
	id_keys: Keypair,
	shutdown: Controller<String>,
) -> Result<(Client, chat::Inbound, EventLoop, UnboundedReceiver<OutputEvent>)> {
	let mut swarm = build_swarm(&cfg, &id_keys).await?;

	let mut control = swarm.behaviour_mut().chat.new_control();
	let incoming = control
		.accept(chat::PROTOCOL)
		.map_err(|error| eyre!("Chat protocol is already registered: {error}"))?;

	// create channels for P2P event loop commands and output events
	let (command_sender, command_receiver) = mpsc::unbounded_channel();
	let (event_sender, event_receiver) = mpsc::unbounded_channel();

	let client = Client::new(command_sender, control);
	let event_loop = EventLoop::new(swarm, command_receiver, event_sender, shutdown);

	Ok((client, chat::Inbound::new(incoming), event_loop, event_receiver))
}

async fn build_swarm(cfg: &LibP2PConfig, id_keys: &Keypair) -> Result<Swarm<Behaviour>> {
	// create Identify Protocol Config
	let identify_cfg =
		identify::Config::new(cfg.identify.protocol_version.clone(), id_keys.public())
			.with_agent_version(cfg.identify.agent_version.clone());

	let behaviour = |_key: &identity::Keypair| {
		Ok(Behaviour {
			chat: stream::Behaviour::new(),
			identify: identify::Behaviour::new(identify_cfg),
			ping: ping::Behaviour::new(ping::Config::new()),
		})
	};

	// build the Swarm, connecting the lower transport logic with the
	// higher layer network behaviour logic
	let swarm = SwarmBuilder::with_existing_identity(id_keys.clone())
		.with_tokio()
		.with_tcp(
			tcp::Config::default().nodelay(false),
			noise::Config::new,
			yamux::Config::default,
		)?
		.with_dns()?
		.with_behaviour(behaviour)?
		.with_swarm_config(|c| c.with_idle_connection_timeout(cfg.connection_idle_timeout))
		.build();

	info!("Local peer id: {}", swarm.local_peer_id());

	Ok(swarm)
}
