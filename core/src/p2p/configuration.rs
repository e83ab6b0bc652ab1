use libp2p::{multiaddr::Protocol, Multiaddr};
use serde::{Deserialize, Serialize};
use std::{net::Ipv4Addr, time::Duration};

use crate::types::{duration_seconds_format, SecretKey};

/// Identify configuration for the libp2p identify protocol
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct IdentifyConfig {
	/// Protocol name/version to use for the identify protocol (default: "/peerchat/id/1.0.0")
	pub protocol_version: String,
	/// Agent version string announced to remote peers (default: "peerchat/<crate version>")
	pub agent_version: String,
}

impl Default for IdentifyConfig {
	fn default() -> Self {
		Self {
			protocol_version: "/peerchat/id/1.0.0".to_string(),
			agent_version: format!("peerchat/{}", env!("CARGO_PKG_VERSION")),
		}
	}
}

/// Libp2p configuration (see client `RuntimeConfig` for details)
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct LibP2PConfig {
	/// Sets the listening P2P network service port. 0 lets the OS assign a free one. (default: 0)
	pub port: u16,
	/// Secret key used to generate keypair. Can be either set to `seed` or to `key`. (default: none)
	/// If `secret_key` is not set, a random ephemeral identity is generated on startup.
	pub secret_key: Option<SecretKey>,
	/// Sets the amount of time to keep connections alive when they're idle. (default: 30s)
	#[serde(with = "duration_seconds_format")]
	pub connection_idle_timeout: Duration,
	pub identify: IdentifyConfig,
}

impl Default for LibP2PConfig {
	fn default() -> Self {
		Self {
			port: 0,
			secret_key: None,
			connection_idle_timeout: Duration::from_secs(30),
			identify: Default::default(),
		}
	}
}

impl LibP2PConfig {
	pub fn tcp_multiaddress(&self) -> Multiaddr {
		Multiaddr::empty()
			.with(Protocol::from(Ipv4Addr::UNSPECIFIED))
			.with(Protocol::Tcp(self.port))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tcp_multiaddress_uses_configured_port() {
		let cfg = LibP2PConfig {
			port: 39000,
			..Default::default()
		};
		assert_eq!(cfg.tcp_multiaddress().to_string(), "/ip4/0.0.0.0/tcp/39000");
	}
}
