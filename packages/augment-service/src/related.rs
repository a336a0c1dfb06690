use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use serde_json::{Map, Value};

use augment_domain::{
	kind,
	message::{RecordChangeInfo, RequestContext},
	query::{QueryFilter, SearchRecord, SearchRequest},
};

use crate::{AugmentService, Result};

impl AugmentService {
	/// Data of the record `id`, looked up among the records of `kind`.
	pub async fn fetch_related_by_id(
		&self,
		ctx: &RequestContext,
		kind: &str,
		id: &str,
	) -> Result<Option<Map<String, Value>>> {
		let id = kind::strip_id_postfix(id.trim());

		if id.is_empty() {
			return Ok(None);
		}

		let key = ctx.key(id);

		if let Some(data) = self.caches.related_data.get(&key) {
			return Ok(Some(data));
		}

		tracing::debug!(tenant = %ctx.tenant, %id, "Related record cache miss.");

		let request =
			SearchRequest::for_kind(kind::search_kind(kind), QueryFilter::Ids(vec![id.to_string()]));
		let Some(record) = self.search_first(ctx, request).await? else {
			return Ok(None);
		};

		self.caches.related_data.put(key, record.data.clone());

		Ok(Some(record.data))
	}

	/// Records of `child_kind` whose `id_field` holds `parent_id`, across every result page.
	pub async fn fetch_related_by_field(
		&self,
		ctx: &RequestContext,
		child_kind: &str,
		id_field: &str,
		parent_id: &str,
	) -> Result<Vec<SearchRecord>> {
		let request = SearchRequest::for_kind(
			kind::search_kind(child_kind),
			QueryFilter::FieldEquals {
				field: id_field.to_string(),
				value: kind::strip_id_postfix(parent_id).to_string(),
			},
		);

		self.search_all(ctx, request).await
	}

	/// Loads every uncached id of `kind_ids` with one search and caches the hits.
	pub async fn prefetch_related(
		&self,
		ctx: &RequestContext,
		kind_ids: &BTreeMap<String, BTreeSet<String>>,
	) -> Result<()> {
		let mut kinds = Vec::new();
		let mut ids = Vec::new();

		for (related_kind, related_ids) in kind_ids {
			let misses = related_ids
				.iter()
				.map(|id| kind::strip_id_postfix(id))
				.filter(|id| !id.is_empty() && self.caches.related_data.get(&ctx.key(id)).is_none())
				.map(ToString::to_string)
				.collect::<Vec<_>>();

			if misses.is_empty() {
				continue;
			}

			kinds.push(kind::search_kind(related_kind));
			ids.extend(misses);
		}

		if ids.is_empty() {
			return Ok(());
		}

		kinds.sort();
		kinds.dedup();
		ids.sort();
		ids.dedup();

		let records = self.search_all(ctx, SearchRequest::new(kinds, Some(QueryFilter::Ids(ids)))).await?;

		for record in records {
			self.caches.related_data.put(ctx.key(&record.id), record.data);
		}

		Ok(())
	}

	/// Stores the newest data of a record and returns what changed since the data last seen.
	pub async fn cache_data_record(
		&self,
		ctx: &RequestContext,
		id: &str,
		record_kind: &str,
		data: &Map<String, Value>,
	) -> RecordChangeInfo {
		let key = ctx.key(kind::strip_id_postfix(id));
		let previous = match self.caches.related_data.get(&key) {
			Some(previous) => Some(previous),
			None => match self.fetch_related_by_id(ctx, record_kind, id).await {
				Ok(previous) => previous,
				Err(err) => {
					tracing::warn!(
						tenant = %ctx.tenant,
						%id,
						error = %err,
						"Previous record data is unavailable. The record is treated as created."
					);

					None
				},
			},
		};
		let pending = self.caches.change_info.get(&key);
		let info = RecordChangeInfo::observe(record_kind, id, previous.as_ref(), data, pending.as_ref());

		self.caches.change_info.put(key.clone(), info.clone());
		self.caches.related_data.put(key, data.clone());

		info
	}

	/// Change info of every id in a change event. Upserts without recorded changes count as
	/// creates.
	pub fn change_infos(
		&self,
		ctx: &RequestContext,
		upserted: &BTreeMap<String, Vec<String>>,
		deleted: &BTreeMap<String, Vec<String>>,
	) -> AHashMap<String, RecordChangeInfo> {
		let mut infos = AHashMap::new();

		for (record_kind, ids) in upserted {
			for id in ids {
				let info = self
					.caches
					.change_info
					.get(&ctx.key(kind::strip_id_postfix(id)))
					.unwrap_or_else(|| RecordChangeInfo::created(record_kind, id));

				infos.insert(id.clone(), info);
			}
		}
		for (record_kind, ids) in deleted {
			for id in ids {
				infos.insert(id.clone(), RecordChangeInfo::deleted(record_kind, id));
			}
		}

		infos
	}
}
