use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use futures::{io::BufReader, AsyncBufReadExt, AsyncRead, AsyncWriteExt, StreamExt};
use libp2p::{PeerId, Stream, StreamProtocol};
use libp2p_stream::{Control, IncomingStreams};
use tracing::{debug, info};

use crate::utils::spawn_in_span;

/// Protocol identifier of the line-oriented chat protocol.
/// Any wire-incompatible change requires a version bump.
pub const PROTOCOL: StreamProtocol = StreamProtocol::new("/chat/1.0.0");

/// Opens a dedicated outbound stream to the peer, writes a single
/// newline-terminated message and closes the stream. Each message is
/// self-delimited by its own stream boundary in addition to the newline.
pub async fn send_line(mut control: Control, peer_id: PeerId, text: &str) -> Result<()> {
	let mut stream = control
		.open_stream(peer_id, PROTOCOL)
		.await
		.map_err(|error| eyre!("Failed to open chat stream to {peer_id}: {error}"))?;
	stream
		.write_all(text.as_bytes())
		.await
		.wrap_err("Failed to write chat message")?;
	stream
		.write_all(b"\n")
		.await
		.wrap_err("Failed to write chat message delimiter")?;
	stream.close().await.wrap_err("Failed to close chat stream")?;
	Ok(())
}

/// Inbound side of the chat protocol. Registered before the host accepts any
/// connection; accepted streams get one reader task each.
pub struct Inbound {
	streams: IncomingStreams,
}

impl Inbound {
	pub(crate) fn new(streams: IncomingStreams) -> Self {
		Inbound { streams }
	}

	/// Next inbound chat stream, or `None` once the protocol is deregistered.
	pub async fn next(&mut self) -> Option<(PeerId, Stream)> {
		self.streams.next().await
	}

	/// Accepts inbound chat streams for the lifetime of the host, printing
	/// received lines to stdout. Reader tasks share no state with each other
	/// or with the chat loop, so their output may interleave at line
	/// granularity.
	pub async fn run(mut self) {
		while let Some((peer_id, stream)) = self.next().await {
			info!("Incoming chat stream from {peer_id}");
			spawn_in_span(async move {
				for_each_line(stream, |line| println!("[{peer_id}] {line}")).await;
				println!("Chat stream from {peer_id} closed");
			});
		}
	}
}

/// Reads newline-terminated lines until end-of-stream, invoking the callback
/// for each complete line with the delimiter stripped.
///
/// Read errors collapse into end-of-stream; only the debug log keeps the
/// distinction between a clean close and an abnormal disconnect.
pub async fn for_each_line<R, F>(reader: R, mut f: F)
where
	R: AsyncRead + Unpin,
	F: FnMut(&str),
{
	let mut reader = BufReader::new(reader);
	let mut line = String::new();
	loop {
		line.clear();
		match reader.read_line(&mut line).await {
			Ok(0) => return,
			Ok(_) => f(line.trim_end_matches('\n')),
			Err(error) => {
				debug!("Chat stream read failed: {error}");
				return;
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use futures::io::Cursor;

	async fn collect_lines(bytes: &[u8]) -> Vec<String> {
		let mut lines = vec![];
		for_each_line(Cursor::new(bytes.to_vec()), |line| {
			lines.push(line.to_string())
		})
		.await;
		lines
	}

	#[tokio::test]
	async fn single_line_is_delivered_without_delimiter() {
		assert_eq!(collect_lines(b"hello\n").await, vec!["hello"]);
	}

	#[tokio::test]
	async fn empty_stream_yields_end_of_stream_immediately() {
		assert!(collect_lines(b"").await.is_empty());
	}

	#[tokio::test]
	async fn lines_are_delivered_in_stream_order() {
		assert_eq!(
			collect_lines(b"first\nsecond\nthird\n").await,
			vec!["first", "second", "third"]
		);
	}

	#[tokio::test]
	async fn trailing_bytes_without_delimiter_still_form_a_line() {
		assert_eq!(collect_lines(b"hello\nstray").await, vec!["hello", "stray"]);
	}

	#[tokio::test]
	async fn empty_lines_are_preserved() {
		assert_eq!(collect_lines(b"\n\n").await, vec!["", ""]);
	}
}
