use color_eyre::{
	eyre::{eyre, WrapErr},
	Report,
};
use libp2p::{multiaddr::Protocol, Multiaddr, PeerId};
use serde::{Deserialize, Serialize};
use std::{
	fmt::{self, Display, Formatter},
	str::FromStr,
};

/// Secret key used to generate the identity keypair.
/// If set to seed, the keypair will be derived from that seed.
/// If set to key, a valid ed25519 private key must be provided, else the client will fail.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum SecretKey {
	Seed { seed: String },
	Key { key: String },
}

/// A chat target: the peer identity together with the multiaddress it is
/// dialable at, parsed from a full multiaddress string whose final segment
/// is `/p2p/<peer-id>`.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(try_from = "String", into = "String")]
pub struct PeerAddress {
	pub peer_id: PeerId,
	pub address: Multiaddr,
}

impl FromStr for PeerAddress {
	type Err = Report;

	fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
		let mut address: Multiaddr = value
			.parse()
			.wrap_err_with(|| format!("Invalid multiaddress: {value}"))?;
		match address.pop() {
			Some(Protocol::P2p(peer_id)) => Ok(PeerAddress { peer_id, address }),
			_ => Err(eyre!(
				"Multiaddress {value} is missing the /p2p/<peer-id> segment"
			)),
		}
	}
}

impl TryFrom<String> for PeerAddress {
	type Error = Report;

	fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<PeerAddress> for String {
	fn from(value: PeerAddress) -> Self {
		value.to_string()
	}
}

impl Display for PeerAddress {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{}/p2p/{}", self.address, self.peer_id)
	}
}

pub mod tracing_level_format {
	use serde::{self, Deserialize, Deserializer, Serializer};
	use std::str::FromStr;
	use tracing::Level;

	pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&level.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		Level::from_str(&value).map_err(serde::de::Error::custom)
	}
}

pub mod duration_seconds_format {
	use serde::{self, Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(duration.as_secs())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = u64::deserialize(deserializer)?;
		Ok(Duration::from_secs(value))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use test_case::test_case;

	const PEER_ID: &str = "12D3KooWStAKPADXqJ7cngPYXd2mSANpdgh1xQ34aouufHA2xShz";

	#[test_case("" ; "empty string")]
	#[test_case("/invalid/multiaddr" ; "unknown protocol")]
	#[test_case("not an address at all" ; "free text")]
	#[test_case("/ip4/127.0.0.1/tcp/notaport" ; "malformed port")]
	fn parse_fails_on_invalid_multiaddress(value: &str) {
		assert!(value.parse::<PeerAddress>().is_err());
	}

	#[test_case("/ip4/127.0.0.1/tcp/1234" ; "tcp without peer id")]
	#[test_case("/ip4/192.168.0.1/tcp/39000/ws" ; "websocket without peer id")]
	fn parse_fails_without_peer_id(value: &str) {
		assert!(value.parse::<PeerAddress>().is_err());
	}

	#[test]
	fn parse_splits_address_and_peer_id() {
		let value = format!("/ip4/192.168.0.1/tcp/39000/p2p/{PEER_ID}");
		let peer_address: PeerAddress = value.parse().unwrap();
		assert_eq!(peer_address.peer_id.to_string(), PEER_ID);
		assert_eq!(peer_address.address.to_string(), "/ip4/192.168.0.1/tcp/39000");
		assert_eq!(peer_address.to_string(), value);
	}

	#[test]
	fn parse_fails_on_misplaced_peer_id() {
		let value = format!("/p2p/{PEER_ID}/ip4/127.0.0.1/tcp/39000");
		assert!(value.parse::<PeerAddress>().is_err());
	}
}
