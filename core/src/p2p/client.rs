use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use libp2p::{Multiaddr, PeerId};
use libp2p_stream::Control;
use tokio::sync::{mpsc, oneshot};

use crate::chat;

#[derive(Clone)]
pub struct Client {
	command_sender: mpsc::UnboundedSender<Command>,
	chat_control: Control,
}

impl Client {
	pub(crate) fn new(command_sender: mpsc::UnboundedSender<Command>, chat_control: Control) -> Self {
		Self {
			command_sender,
			chat_control,
		}
	}

	/// Starts listening on the provided multiaddress, resolving with the
	/// first bound address so callers can print a copyable
	/// `<address>/p2p/<peer-id>` string. Further bound addresses are
	/// reported through [`super::OutputEvent::NewListenAddr`].
	pub async fn start_listening(&self, addr: Multiaddr) -> Result<Multiaddr> {
		let (response_sender, response_receiver) = oneshot::channel();
		self.command_sender
			.send(Command::StartListening {
				addr,
				response_sender,
			})
			.map_err(|_| eyre!("Command receiver should not be dropped"))?;
		response_receiver
			.await
			.wrap_err("Sender should not be dropped")?
	}

	/// Dials the peer at the given address, resolving once the connection is
	/// established. Timeout, refusal, unreachability and handshake failures
	/// all surface as the same dial error.
	pub async fn dial_peer(&self, peer_id: PeerId, peer_address: Multiaddr) -> Result<()> {
		let (response_sender, response_receiver) = oneshot::channel();
		self.command_sender
			.send(Command::DialPeer {
				peer_id,
				peer_address,
				response_sender,
			})
			.map_err(|_| eyre!("Command receiver should not be dropped"))?;
		response_receiver
			.await
			.wrap_err("Sender should not be dropped")?
	}

	/// Sends one chat message over a fresh outbound stream.
	pub async fn send_message(&self, peer_id: PeerId, text: &str) -> Result<()> {
		chat::send_line(self.chat_control.clone(), peer_id, text).await
	}
}

pub enum Command {
	StartListening {
		addr: Multiaddr,
		response_sender: oneshot::Sender<Result<Multiaddr>>,
	},
	DialPeer {
		peer_id: PeerId,
		peer_address: Multiaddr,
		response_sender: oneshot::Sender<Result<()>>,
	},
}
