use clap::{command, Parser};
use tracing::Level;

#[derive(Parser)]
#[command(version)]
pub struct CliOpts {
	/// Path to the configuration file
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<String>,
	/// P2P port
	#[arg(short, long)]
	pub port: Option<u16>,
	/// Seed string for libp2p keypair generation
	#[arg(long)]
	pub seed: Option<String>,
	/// ed25519 private key for libp2p keypair generation
	#[arg(long)]
	pub private_key: Option<String>,
	/// Full multiaddress (with the /p2p/ peer id segment) of the peer to
	/// chat with, skips the interactive target prompt
	#[arg(long)]
	pub target: Option<String>,
	/// Log level
	#[arg(long)]
	pub verbosity: Option<Level>,
	/// Set logs format to JSON
	#[arg(long)]
	pub logs_json: bool,
}
