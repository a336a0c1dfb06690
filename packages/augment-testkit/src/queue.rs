use std::sync::{
	Mutex,
	atomic::{AtomicBool, Ordering},
};

use augment_domain::message::RecordChangedMessages;

use crate::{Error, Result};

/// Records every message handed to a work queue.
#[derive(Default)]
pub struct MessageLog {
	messages: Mutex<Vec<RecordChangedMessages>>,
	rejecting: AtomicBool,
}
impl MessageLog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&self, message: &RecordChangedMessages) -> Result<()> {
		if self.rejecting.load(Ordering::SeqCst) {
			return Err(Error::Message("Queue is rejecting messages.".to_string()));
		}

		self.lock().push(message.clone());

		Ok(())
	}

	pub fn reject(&self, rejecting: bool) {
		self.rejecting.store(rejecting, Ordering::SeqCst);
	}

	pub fn messages(&self) -> Vec<RecordChangedMessages> {
		self.lock().clone()
	}

	/// Removes and returns every recorded message.
	pub fn drain(&self) -> Vec<RecordChangedMessages> {
		std::mem::take(&mut *self.lock())
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RecordChangedMessages>> {
		self.messages.lock().unwrap_or_else(|err| err.into_inner())
	}
}
