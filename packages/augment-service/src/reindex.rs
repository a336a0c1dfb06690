use serde::Serialize;
use serde_json::{Map, Value};

use augment_domain::{
	kind,
	message::{RecordChangedMessages, RequestContext},
	query::SearchRecord,
};

use crate::{AugmentService, Error, PropagationReport, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AugmentedRecord {
	pub id: String,
	pub kind: String,
	pub data: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReindexOutput {
	pub records: Vec<AugmentedRecord>,
	pub propagation: PropagationReport,
}

impl AugmentService {
	/// Runs one change event through augmentation and propagation.
	///
	/// Only a failed record lookup fails the event. Every other upstream failure degrades the
	/// output.
	pub async fn reindex(
		&self,
		ctx: &RequestContext,
		message: &RecordChangedMessages,
	) -> Result<ReindexOutput> {
		let (upserted, deleted) = message.kind_ids();
		let ids = upserted.values().flatten().cloned().collect::<Vec<_>>();
		let mut output = ReindexOutput::default();

		if !ids.is_empty() {
			let fetched = self
				.providers
				.records
				.fetch_records(&self.cfg.providers.records, ctx, &ids)
				.await
				.map_err(|err| Error::Lookup {
					message: format!("Failed to read {} records: {err}.", ids.len()),
				})?;

			if fetched.len() < ids.len() {
				tracing::warn!(
					tenant = %ctx.tenant,
					requested = ids.len(),
					found = fetched.len(),
					"Some changed records were not found."
				);
			}

			for record in fetched {
				output.records.push(self.augment_record(ctx, record).await);
			}
		}

		if self.cfg.augmentation.enabled {
			output.propagation =
				self.plan_propagation(ctx, &upserted, &deleted, &message.ancestry()).await;
		}

		for id in deleted.values().flatten() {
			let key = ctx.key(kind::strip_id_postfix(id));

			self.caches.related_data.delete(&key);
			self.caches.change_info.delete(&key);
		}

		Ok(output)
	}

	async fn augment_record(&self, ctx: &RequestContext, record: SearchRecord) -> AugmentedRecord {
		if !self.cfg.augmentation.enabled {
			return AugmentedRecord { id: record.id, kind: record.kind, data: record.data };
		}

		let extended = self.extended_properties(ctx, &record).await;
		let SearchRecord { id, kind, mut data } = record;

		for (name, value) in extended {
			data.entry(name).or_insert(value);
		}

		self.cache_data_record(ctx, &id, &kind, &data).await;

		AugmentedRecord { id, kind, data }
	}
}
