use color_eyre::{eyre::eyre, Result};
use std::{
	future::Future,
	sync::{Arc, Mutex},
	task::Waker,
};

mod completed;
mod triggered;
mod utils;

pub use completed::Completed;
pub use triggered::Triggered;

/// Shared state behind a [`Controller`] and all of its tokens and futures.
pub struct ControllerInner<T: Clone> {
	/// Number of live [`DelayToken`]s still delaying shutdown completion.
	delay_tokens: u32,
	/// The reason the shutdown was triggered with, if it was.
	reason: Option<T>,
	/// Wakers interested in the shutdown being triggered.
	on_shutdown_trigger: Vec<Waker>,
	/// Wakers interested in the shutdown being completed.
	pub(crate) on_shutdown_complete: Vec<Waker>,
}

impl<T: Clone> ControllerInner<T> {
	fn new() -> Self {
		Self {
			delay_tokens: 0,
			reason: None,
			on_shutdown_trigger: vec![],
			on_shutdown_complete: vec![],
		}
	}

	pub(crate) fn poll_completed(&mut self) -> Option<T> {
		// shutdown is complete only when all tokens have been dropped
		// and a reason for the shutdown has been provided
		if let (0, Some(reason)) = (self.delay_tokens, self.reason.as_ref()) {
			return Some(reason.clone());
		}
		None
	}

	pub(crate) fn poll_triggered(&mut self) -> Option<T> {
		self.reason.clone()
	}

	pub(crate) fn register_trigger_waker(&mut self, waker: Waker) {
		self.on_shutdown_trigger.push(waker);
	}
}

/// Coordinates the shutdown of a set of concurrent tasks.
///
/// Tasks observe [`Controller::triggered_shutdown`] to learn that a shutdown
/// has begun and hold a [`DelayToken`] while they still have cleanup to do.
/// [`Controller::completed_shutdown`] resolves once the shutdown has been
/// triggered and every token has been dropped.
pub struct Controller<T: Clone> {
	inner: Arc<Mutex<ControllerInner<T>>>,
}

impl<T: Clone> Clone for Controller<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Clone> Default for Controller<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Clone> Controller<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Mutex::new(ControllerInner::new())),
		}
	}

	/// Begins the shutdown with the given reason, waking every interested
	/// party. Fails if a shutdown has already been triggered.
	pub fn trigger_shutdown(&self, reason: T) -> Result<()> {
		let mut inner = self.inner.lock().unwrap();
		if inner.reason.is_some() {
			return Err(eyre!("Shutdown has already been triggered"));
		}
		inner.reason = Some(reason);
		for waker in inner.on_shutdown_trigger.drain(..) {
			waker.wake();
		}
		for waker in inner.on_shutdown_complete.drain(..) {
			waker.wake();
		}
		Ok(())
	}

	pub fn is_triggered(&self) -> bool {
		self.inner.lock().unwrap().reason.is_some()
	}

	/// Hands out a token that delays shutdown completion until it is dropped.
	/// Fails if the shutdown has already been triggered.
	pub fn delay_token(&self) -> Result<DelayToken<T>> {
		let mut inner = self.inner.lock().unwrap();
		if inner.reason.is_some() {
			return Err(eyre!("Shutdown has already been triggered"));
		}
		inner.delay_tokens += 1;
		Ok(DelayToken {
			inner: self.inner.clone(),
		})
	}

	/// A future that resolves with the shutdown reason as soon as the
	/// shutdown is triggered.
	pub fn triggered_shutdown(&self) -> Triggered<T> {
		Triggered {
			inner: self.inner.clone(),
		}
	}

	/// A future that resolves with the shutdown reason once the shutdown is
	/// triggered and all delay tokens have been dropped.
	pub fn completed_shutdown(&self) -> Completed<T> {
		Completed {
			inner: self.inner.clone(),
		}
	}

	/// Races the given future against the shutdown trigger. Returns
	/// `Err(reason)` if the shutdown wins.
	pub fn with_cancel<F: Future>(&self, future: F) -> impl Future<Output = Result<F::Output, T>> {
		let triggered = self.triggered_shutdown();
		async move {
			tokio::select! {
				reason = triggered => Err(reason),
				output = future => Ok(output),
			}
		}
	}

	/// A future that waits for a user termination signal (Ctrl-C or SIGTERM)
	/// and then triggers the shutdown with the given reason.
	pub fn on_user_signal(&self, reason: T) -> impl Future<Output = ()> {
		let controller = self.clone();
		async move {
			utils::user_signal().await;
			let _ = controller.trigger_shutdown(reason);
		}
	}
}

/// Delays shutdown completion for as long as it is alive.
pub struct DelayToken<T: Clone> {
	inner: Arc<Mutex<ControllerInner<T>>>,
}

impl<T: Clone> Clone for DelayToken<T> {
	fn clone(&self) -> Self {
		self.inner.lock().unwrap().delay_tokens += 1;
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: Clone> Drop for DelayToken<T> {
	fn drop(&mut self) {
		let mut inner = self.inner.lock().unwrap();
		inner.delay_tokens -= 1;
		if inner.delay_tokens == 0 && inner.reason.is_some() {
			for waker in inner.on_shutdown_complete.drain(..) {
				waker.wake();
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::Controller;
	use std::time::Duration;
	use tokio::time::{sleep, timeout};

	#[tokio::test]
	async fn completed_returns_the_trigger_reason() {
		let shutdown = Controller::new();
		shutdown.trigger_shutdown("done".to_string()).unwrap();
		let reason = shutdown.completed_shutdown().await;
		assert_eq!(reason, "done");
	}

	#[tokio::test]
	async fn trigger_twice_fails() {
		let shutdown = Controller::new();
		assert!(shutdown.trigger_shutdown("first".to_string()).is_ok());
		assert!(shutdown.trigger_shutdown("second".to_string()).is_err());
		assert_eq!(shutdown.completed_shutdown().await, "first");
	}

	#[tokio::test]
	async fn delay_token_defers_completion() {
		let shutdown = Controller::new();
		let token = shutdown.delay_token().unwrap();
		shutdown.trigger_shutdown("done".to_string()).unwrap();

		let completed = timeout(Duration::from_millis(50), shutdown.completed_shutdown()).await;
		assert!(completed.is_err());

		let waiter = tokio::spawn({
			let shutdown = shutdown.clone();
			async move { shutdown.completed_shutdown().await }
		});
		sleep(Duration::from_millis(50)).await;
		drop(token);
		assert_eq!(waiter.await.unwrap(), "done");
	}

	#[tokio::test]
	async fn delay_token_is_rejected_after_trigger() {
		let shutdown = Controller::new();
		shutdown.trigger_shutdown("done".to_string()).unwrap();
		assert!(shutdown.delay_token().is_err());
	}

	#[tokio::test]
	async fn with_cancel_returns_reason_on_shutdown() {
		let shutdown = Controller::new();
		let cancelled = tokio::spawn(shutdown.with_cancel(std::future::pending::<()>()));
		shutdown.trigger_shutdown("done".to_string()).unwrap();
		assert_eq!(cancelled.await.unwrap(), Err("done".to_string()));
	}

	#[tokio::test]
	async fn with_cancel_passes_output_through() {
		let shutdown: Controller<String> = Controller::new();
		let output = shutdown.with_cancel(async { 42 }).await;
		assert_eq!(output, Ok(42));
	}
}
