use std::future::Future;
use std::pin::Pin;
use std::{
	sync::{Arc, Mutex},
	task::{Context, Poll},
};

use super::ControllerInner;

/// A future that resolves with the shutdown reason as soon as a shutdown has
/// been triggered, regardless of any outstanding delay tokens.
pub struct Triggered<T: Clone> {
	pub(crate) inner: Arc<Mutex<ControllerInner<T>>>,
}

impl<T: Clone> Future for Triggered<T> {
	type Output = T;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mutex_inner = &self.as_ref().inner;
		let mut inner = mutex_inner.lock().unwrap();
		if let Some(reason) = inner.poll_triggered() {
			return Poll::Ready(reason);
		}

		inner.register_trigger_waker(cx.waker().clone());
		Poll::Pending
	}
}
