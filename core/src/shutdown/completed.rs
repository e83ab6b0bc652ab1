use std::future::Future;
use std::pin::Pin;
use std::{
	sync::{Arc, Mutex},
	task::{Context, Poll},
};

use super::ControllerInner;

/// A future representing completion of a triggered shutdown.
///
/// This future completes when all delay tokens have been dropped and a reason
/// for shutdown has been provided. Otherwise, the future remains pending,
/// registering the context's waker for later notification upon shutdown
/// completion.
pub struct Completed<T: Clone> {
	pub(crate) inner: Arc<Mutex<ControllerInner<T>>>,
}

impl<T: Clone> Future for Completed<T> {
	type Output = T;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		let mutex_inner = &self.as_ref().inner;
		let mut inner = mutex_inner.lock().unwrap();
		if let Some(reason) = inner.poll_completed() {
			return Poll::Ready(reason);
		}

		// always clone waker, so we don't end-up with staled ones
		inner.on_shutdown_complete.push(cx.waker().clone());
		Poll::Pending
	}
}
