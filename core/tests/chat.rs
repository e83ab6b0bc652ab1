use color_eyre::Result;
use futures::{io::BufReader, AsyncBufReadExt};
use libp2p::{multiaddr::Protocol, Multiaddr, PeerId};
use peerchat_core::{chat, p2p, shutdown::Controller, types::PeerAddress, utils::spawn_in_span};
use std::net::Ipv4Addr;
use tokio::time::{timeout, Duration};

fn loopback_listen_addr() -> Multiaddr {
	Multiaddr::empty()
		.with(Protocol::from(Ipv4Addr::LOCALHOST))
		.with(Protocol::Tcp(0))
}

async fn start_host() -> Result<(p2p::Client, chat::Inbound, PeerId, Multiaddr)> {
	let shutdown = Controller::new();
	let (id_keys, peer_id) = p2p::keypair(None)?;
	let (client, inbound, event_loop, _event_receiver) =
		p2p::init(Default::default(), id_keys, shutdown).await?;
	spawn_in_span(event_loop.run());
	let address = client.start_listening(loopback_listen_addr()).await?;
	Ok((client, inbound, peer_id, address))
}

#[tokio::test]
async fn two_peers_exchange_a_message() -> Result<()> {
	let (client_a, _inbound_a, peer_a, _address_a) = start_host().await?;
	let (_client_b, mut inbound_b, peer_b, address_b) = start_host().await?;

	// host A learns about B the way an operator would, from the shared string
	let target: PeerAddress = format!("{address_b}/p2p/{peer_b}").parse()?;
	client_a
		.dial_peer(target.peer_id, target.address.clone())
		.await?;

	client_a.send_message(peer_b, "hello from A").await?;

	let (from_peer, stream) = timeout(Duration::from_secs(10), inbound_b.next())
		.await?
		.expect("Chat stream should arrive");
	assert_eq!(from_peer, peer_a);

	let mut reader = BufReader::new(stream);
	let mut line = String::new();
	reader.read_line(&mut line).await?;
	assert_eq!(line, "hello from A\n");

	// the sender closes the stream right after the single message
	line.clear();
	let read = reader.read_line(&mut line).await?;
	assert_eq!(read, 0);

	Ok(())
}

#[tokio::test]
async fn dialing_an_unreachable_peer_fails() -> Result<()> {
	let (client, _inbound, _peer_id, _address) = start_host().await?;
	let (_stranger_keys, stranger) = p2p::keypair(None)?;

	// never-advertised peer id behind a port nothing listens on
	let unreachable = Multiaddr::empty()
		.with(Protocol::from(Ipv4Addr::LOCALHOST))
		.with(Protocol::Tcp(1));

	let result = timeout(Duration::from_secs(30), client.dial_peer(stranger, unreachable)).await?;
	assert!(result.is_err());

	Ok(())
}

#[tokio::test]
async fn sending_to_an_unconnected_peer_fails() -> Result<()> {
	let (client, _inbound, _peer_id, _address) = start_host().await?;
	let (_stranger_keys, stranger) = p2p::keypair(None)?;

	let result = timeout(Duration::from_secs(30), client.send_message(stranger, "hello")).await?;
	assert!(result.is_err());

	Ok(())
}
