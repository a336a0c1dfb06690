use color_eyre::eyre;

use augment_domain::message::{RecordChangedMessages, RequestContext};
use augment_storage::{db::Db, models::NewReindexJob, outbox};

use crate::{BoxFuture, WorkQueue};

/// Work queue backed by the Postgres reindex outbox.
pub struct OutboxQueue {
	db: Db,
}
impl OutboxQueue {
	pub fn new(db: Db) -> Self {
		Self { db }
	}

	async fn enqueue_message(
		&self,
		ctx: &RequestContext,
		message: &RecordChangedMessages,
		delay_ms: u64,
	) -> color_eyre::Result<()> {
		let mut message = message.clone();

		for (key, value) in ctx.attributes(&message.ancestry()) {
			message.attributes.entry(key).or_insert(value);
		}

		let job = NewReindexJob {
			tenant_id: ctx.tenant.clone(),
			correlation_id: (!ctx.correlation_id.is_empty()).then(|| ctx.correlation_id.clone()),
			headers: serde_json::to_value(&message.attributes)?,
			payload: serde_json::to_value(&message)?,
			delay_ms: i64::try_from(delay_ms)
				.map_err(|_| eyre::eyre!("Reindex delay of {delay_ms} ms is out of range."))?,
		};
		let outbox_id = outbox::enqueue(&self.db, &job).await?;

		tracing::debug!(%outbox_id, tenant = %ctx.tenant, records = message.data.len(), "Reindex job enqueued.");

		Ok(())
	}
}
impl WorkQueue for OutboxQueue {
	fn enqueue<'a>(
		&'a self,
		ctx: &'a RequestContext,
		message: &'a RecordChangedMessages,
		delay_ms: u64,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(self.enqueue_message(ctx, message, delay_ms))
	}
}
