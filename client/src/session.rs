use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use peerchat_core::{p2p::Client, types::PeerAddress};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

const EXIT_SENTINEL: &str = "exit";

/// A single line of user input, classified.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
	/// Terminate the chat loop.
	Exit,
	/// Anything else, empty lines included, is a message to send.
	Message(&'a str),
}

impl<'a> Command<'a> {
	pub fn parse(line: &'a str) -> Self {
		if line.trim() == EXIT_SENTINEL {
			Command::Exit
		} else {
			Command::Message(line)
		}
	}
}

/// Interactive chat session: one-time target selection followed by the
/// message loop. The target never changes once selected.
pub struct Session {
	client: Client,
	target: Option<PeerAddress>,
	input: Lines<BufReader<Stdin>>,
}

impl Session {
	pub fn new(client: Client) -> Self {
		Session {
			client,
			target: None,
			input: BufReader::new(tokio::io::stdin()).lines(),
		}
	}

	/// Reads the optional chat target and establishes the initial connection.
	/// An empty line selects passive mode, in which the node only receives.
	/// Runs exactly once, before the chat loop; a malformed address or a
	/// failed dial aborts the whole session.
	pub async fn select_target(&mut self, target: Option<String>) -> Result<()> {
		let line = match target {
			Some(target) => target,
			None => {
				prompt("Enter target peer full multiaddress (leave empty to wait): ")?;
				self.read_line().await?.unwrap_or_default()
			},
		};

		if line.trim().is_empty() {
			info!("No target peer selected, waiting for inbound chat streams");
			return Ok(());
		}

		let target: PeerAddress = line.trim().parse()?;
		self.client
			.dial_peer(target.peer_id, target.address.clone())
			.await
			.wrap_err_with(|| format!("Failed to connect to {target}"))?;
		println!("Connected to peer: {}", target.peer_id);
		self.target = Some(target);
		Ok(())
	}

	/// Prompts for message lines until the exit sentinel is read or standard
	/// input is closed. A failed send is reported and the loop continues, so
	/// the next line may retry.
	pub async fn run(mut self) -> Result<()> {
		loop {
			prompt("Enter message (or 'exit'): ")?;
			let Some(line) = self.read_line().await? else {
				break;
			};
			match Command::parse(&line) {
				Command::Exit => break,
				Command::Message(text) => match &self.target {
					Some(target) => {
						if let Err(error) = self.client.send_message(target.peer_id, text).await {
							println!("Failed to send message: {error:#}");
						}
					},
					None => println!("No peer connected, message not sent"),
				},
			}
		}
		println!("Exiting chat, inbound messages are received until the process is interrupted");
		Ok(())
	}

	async fn read_line(&mut self) -> Result<Option<String>> {
		self.input
			.next_line()
			.await
			.wrap_err("Failed to read from standard input")
	}
}

fn prompt(text: &str) -> Result<()> {
	print!("{text}");
	std::io::stdout()
		.flush()
		.map_err(|error| eyre!("Failed to flush stdout: {error}"))
}

#[cfg(test)]
mod tests {
	use super::Command;
	use test_case::test_case;

	#[test_case("exit" => Command::Exit ; "bare sentinel")]
	#[test_case("  exit  " => Command::Exit ; "sentinel with surrounding whitespace")]
	#[test_case("exit\t" => Command::Exit ; "sentinel with trailing tab")]
	#[test_case("Exit" => Command::Message("Exit") ; "sentinel is case sensitive")]
	#[test_case("exit now" => Command::Message("exit now") ; "sentinel must stand alone")]
	#[test_case("" => Command::Message("") ; "empty line is a message")]
	#[test_case("hello" => Command::Message("hello") ; "plain message")]
	fn parse_classifies_input(line: &str) -> Command<'_> {
		Command::parse(line)
	}
}
