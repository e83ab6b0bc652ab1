use color_eyre::{eyre::WrapErr, Result};
use peerchat_core::{
	p2p::configuration::LibP2PConfig,
	types::{tracing_level_format, SecretKey},
};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::cli::CliOpts;

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RuntimeConfig {
	/// Log level, default is `INFO`. See `<https://docs.rs/log/0.4.14/log/enum.LevelFilter.html>` for possible log level values. (default: `INFO`)
	#[serde(with = "tracing_level_format")]
	pub log_level: Level,
	/// If set to true, logs are displayed in JSON format, which is used for structured logging. Otherwise, plain text format is used (default: false).
	pub log_format_json: bool,
	#[serde(flatten)]
	pub libp2p: LibP2PConfig,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		RuntimeConfig {
			log_level: Level::INFO,
			log_format_json: false,
			libp2p: Default::default(),
		}
	}
}

pub fn load_runtime_config(opts: &CliOpts) -> Result<RuntimeConfig> {
	let mut cfg: RuntimeConfig = if let Some(cfg_path) = &opts.config {
		confy::load_path(cfg_path)
			.wrap_err(format!("Failed to load configuration from: {cfg_path}"))?
	} else {
		RuntimeConfig::default()
	};

	cfg.log_format_json = opts.logs_json || cfg.log_format_json;
	cfg.log_level = opts.verbosity.unwrap_or(cfg.log_level);

	if let Some(port) = opts.port {
		cfg.libp2p.port = port;
	}

	if let Some(private_key) = &opts.private_key {
		cfg.libp2p.secret_key = Some(SecretKey::Key {
			key: private_key.to_string(),
		});
	}

	if let Some(seed) = &opts.seed {
		cfg.libp2p.secret_key = Some(SecretKey::Seed {
			seed: seed.to_string(),
		})
	}

	Ok(cfg)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_select_an_ephemeral_identity_and_port() {
		let cfg = RuntimeConfig::default();
		assert_eq!(cfg.log_level, Level::INFO);
		assert!(!cfg.log_format_json);
		assert_eq!(cfg.libp2p.port, 0);
		assert!(cfg.libp2p.secret_key.is_none());
	}
}
