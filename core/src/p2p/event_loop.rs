use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use libp2p::{
	core::transport::ListenerId,
	identify,
	multiaddr::Protocol,
	ping,
	swarm::{dial_opts::DialOpts, SwarmEvent},
	Multiaddr, PeerId, Swarm,
};
use std::collections::{hash_map, HashMap};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use super::{client::Command, Behaviour, BehaviourEvent, OutputEvent};
use crate::shutdown::Controller;

pub struct EventLoop {
	swarm: Swarm<Behaviour>,
	command_receiver: mpsc::UnboundedReceiver<Command>,
	event_sender: mpsc::UnboundedSender<OutputEvent>,
	// Tracking listeners awaiting their first bound address
	pending_listeners: HashMap<ListenerId, oneshot::Sender<Result<Multiaddr>>>,
	// Tracking in-flight dials
	pending_dials: HashMap<PeerId, oneshot::Sender<Result<()>>>,
	shutdown: Controller<String>,
}

impl EventLoop {
	pub(crate) fn new(
		swarm: Swarm<Behaviour>,
		command_receiver: mpsc::UnboundedReceiver<Command>,
		event_sender: mpsc::UnboundedSender<OutputEvent>,
		shutdown: Controller<String>,
	) -> Self {
		Self {
			swarm,
			command_receiver,
			event_sender,
			pending_listeners: Default::default(),
			pending_dials: Default::default(),
			shutdown,
		}
	}

	pub async fn run(mut self) {
		// shutdown will wait as long as this token is not dropped
		let _delay_token = self
			.shutdown
			.delay_token()
			.expect("There should not be any shutdowns at the beginning of the P2P Event Loop");

		loop {
			tokio::select! {
				event = self.swarm.next() => self.handle_event(event.expect("Swarm stream should be infinite")),
				command = self.command_receiver.recv() => match command {
					Some(command) => self.handle_command(command),
					None => {
						warn!("Command channel closed, exiting the network event loop");
						break;
					},
				},
				// if the shutdown was triggered,
				// break the loop immediately, proceed to the cleanup phase
				_ = self.shutdown.triggered_shutdown() => {
					info!("Shutdown triggered, exiting the network event loop");
					break;
				}
			}
		}
	}

	fn handle_event(&mut self, event: SwarmEvent<BehaviourEvent>) {
		match event {
			SwarmEvent::NewListenAddr {
				listener_id,
				address,
			} => {
				let local_peer_id = *self.swarm.local_peer_id();
				debug!(
					"Local node is listening on: {:?}",
					address.clone().with(Protocol::P2p(local_peer_id))
				);
				// the first address resolves the pending listen command,
				// later ones for the same listener go out as events
				if let Some(response_sender) = self.pending_listeners.remove(&listener_id) {
					_ = response_sender.send(Ok(address));
				} else {
					_ = self.event_sender.send(OutputEvent::NewListenAddr(address));
				}
			},
			SwarmEvent::ListenerError { listener_id, error } => {
				warn!("Listener error. Listener: {listener_id:?}. Error: {error}.");
				if let Some(response_sender) = self.pending_listeners.remove(&listener_id) {
					_ = response_sender.send(Err(eyre!("Listener failed: {error}")));
				}
			},
			SwarmEvent::IncomingConnection { .. } => {
				trace!("Incoming connection");
				_ = self.event_sender.send(OutputEvent::IncomingConnection);
			},
			SwarmEvent::ConnectionEstablished {
				peer_id, endpoint, ..
			} => {
				trace!(
					"Connection established. Peer: {peer_id}. Address: {:?}.",
					endpoint.get_remote_address()
				);
				if endpoint.is_dialer() {
					if let Some(response_sender) = self.pending_dials.remove(&peer_id) {
						_ = response_sender.send(Ok(()));
					}
				}
				_ = self
					.event_sender
					.send(OutputEvent::EstablishedConnection { peer: peer_id });
			},
			SwarmEvent::OutgoingConnectionError {
				peer_id: Some(peer_id),
				error,
				..
			} => {
				trace!("Outgoing connection error. Peer: {peer_id}. Error: {error}.");
				if let Some(response_sender) = self.pending_dials.remove(&peer_id) {
					_ = response_sender.send(Err(eyre!("Failed to connect to {peer_id}: {error}")));
				}
				_ = self.event_sender.send(OutputEvent::OutgoingConnectionError);
			},
			SwarmEvent::ConnectionClosed {
				peer_id,
				endpoint,
				num_established,
				cause,
				..
			} => {
				trace!("Connection closed. Peer: {peer_id:?}. Address: {:?}. Num established: {num_established:?}. Cause: {cause:?}.", endpoint.get_remote_address());
			},
			SwarmEvent::Behaviour(BehaviourEvent::Identify(identify::Event::Received {
				peer_id,
				info,
				..
			})) => {
				trace!(
					"Identify received from {peer_id}. Agent: {}. Protocol: {}.",
					info.agent_version,
					info.protocol_version
				);
			},
			SwarmEvent::Behaviour(BehaviourEvent::Ping(ping::Event { peer, result, .. })) => {
				if let Ok(rtt) = result {
					_ = self.event_sender.send(OutputEvent::Ping { peer, rtt });
				}
			},
			_ => {},
		}
	}

	fn handle_command(&mut self, command: Command) {
		match command {
			Command::StartListening {
				addr,
				response_sender,
			} => match self.swarm.listen_on(addr) {
				Ok(listener_id) => {
					self.pending_listeners.insert(listener_id, response_sender);
				},
				Err(error) => {
					_ = response_sender.send(Err(eyre!("Failed to start listening: {error}")));
				},
			},
			Command::DialPeer {
				peer_id,
				peer_address,
				response_sender,
			} => {
				if let hash_map::Entry::Vacant(entry) = self.pending_dials.entry(peer_id) {
					let opts = DialOpts::peer_id(peer_id)
						.addresses(vec![peer_address])
						.build();
					match self.swarm.dial(opts) {
						Ok(()) => {
							entry.insert(response_sender);
						},
						Err(error) => {
							_ = response_sender
								.send(Err(eyre!("Failed to dial {peer_id}: {error}")));
						},
					}
				} else {
					_ = response_sender.send(Err(eyre!("Already dialing peer {peer_id}")));
				}
			},
		}
	}
}
