use std::collections::{BTreeMap, BTreeSet};

use ahash::AHashMap;
use serde::Serialize;
use serde_json::Value;

use augment_domain::{
	ASSOCIATED_IDENTITIES,
	configuration::ParentChildRelationshipSpec,
	kind,
	message::{
		AncestryTrail, OperationType, RecordChangeInfo, RecordChangedMessages, RecordInfo,
		RequestContext,
	},
	path,
	query::{QueryFilter, SearchRecord, SearchRequest},
};

use crate::{AugmentService, Result};

const ID_FIELD: &str = "id";
const KIND_FIELD: &str = "kind";

/// Outcome of one propagation pass.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct PropagationReport {
	/// Work messages handed to the queue.
	pub messages: usize,
	/// Records listed across those messages.
	pub records: usize,
	/// Messages the queue rejected.
	pub failed_messages: usize,
	/// Branches that were cut because their kind was already on the ancestry trail.
	pub cyclic_skips: usize,
}

impl AugmentService {
	/// Finds the records whose extended properties may be stale after the given changes and
	/// queues them for reindexing.
	///
	/// A failed lookup skips only the branch it belongs to.
	pub async fn plan_propagation(
		&self,
		ctx: &RequestContext,
		upserted: &BTreeMap<String, Vec<String>>,
		deleted: &BTreeMap<String, Vec<String>>,
		ancestry: &AncestryTrail,
	) -> PropagationReport {
		let mut report = PropagationReport::default();

		if !self.cfg.augmentation.enabled {
			return report;
		}

		let infos = self.change_infos(ctx, upserted, deleted);
		let kinds = upserted.keys().chain(deleted.keys()).collect::<BTreeSet<_>>();

		for changed_kind in kinds {
			let ids = upserted
				.get(changed_kind)
				.into_iter()
				.chain(deleted.get(changed_kind))
				.flatten()
				.collect::<BTreeSet<_>>();

			if ids.is_empty() {
				continue;
			}

			match self.has_configurations(ctx, changed_kind).await {
				Ok(true) => {},
				Ok(false) => continue,
				Err(err) => {
					tracing::warn!(
						tenant = %ctx.tenant,
						kind = %changed_kind,
						error = %err,
						"Configuration probe failed. Propagation for the kind is skipped."
					);

					continue;
				},
			}

			let changes = ids.iter().filter_map(|id| infos.get(*id)).cloned().collect::<Vec<_>>();
			let trail = ancestry.with(changed_kind);
			let parents = self.parent_items(ctx, changed_kind, &changes, &trail, &mut report).await;

			self.emit(ctx, parents, &trail, &mut report).await;

			let children =
				self.children_items(ctx, changed_kind, &changes, &trail, &mut report).await;

			self.emit(ctx, children, &trail, &mut report).await;
		}

		report
	}

	/// Parents whose ParentToChildren values read from the changed child records.
	async fn parent_items(
		&self,
		ctx: &RequestContext,
		child_kind: &str,
		changes: &[RecordChangeInfo],
		trail: &AncestryTrail,
		report: &mut PropagationReport,
	) -> Vec<RecordInfo> {
		let specs = match self.parent_child_specs(ctx, child_kind).await {
			Ok(specs) => specs,
			Err(err) => {
				tracing::warn!(
					tenant = %ctx.tenant,
					kind = %child_kind,
					error = %err,
					"Parent relationship lookup failed. Parent propagation is skipped."
				);

				return Vec::new();
			},
		};
		let mut items = Vec::new();

		for spec in specs {
			let child_ids = changes
				.iter()
				.filter(|change| !change.is_update() || spec.is_affected_by(&change.updated_properties))
				.map(|change| change.record.id.clone())
				.collect::<Vec<_>>();

			if child_ids.is_empty() {
				continue;
			}

			let parent_records = match self.parent_records(ctx, child_kind, &child_ids, &spec).await {
				Ok(parent_records) => parent_records,
				Err(err) => {
					tracing::warn!(
						tenant = %ctx.tenant,
						parent_kind = %spec.parent_kind,
						error = %err,
						"Parent record search failed. The relationship is skipped."
					);

					continue;
				},
			};

			for record in parent_records {
				if trail.contains(&record.kind) {
					report.cyclic_skips += 1;

					tracing::debug!(kind = %record.kind, %trail, "Parent kind is already on the ancestry trail.");

					continue;
				}

				items.push(RecordInfo::new(record.kind, record.id, OperationType::Update));
			}
		}

		items
	}

	async fn parent_records(
		&self,
		ctx: &RequestContext,
		child_kind: &str,
		child_ids: &[String],
		spec: &ParentChildRelationshipSpec,
	) -> Result<Vec<SearchRecord>> {
		let mut parent_ids = BTreeSet::new();
		let mut unresolved = Vec::new();

		for id in child_ids {
			match self.caches.related_data.get(&ctx.key(kind::strip_id_postfix(id))) {
				Some(data) => parent_ids.extend(referenced_ids(&data, &spec.parent_object_id_path)),
				None => unresolved.push(id.clone()),
			}
		}

		if !unresolved.is_empty() {
			let id_field = spec.parent_id_field();
			let request =
				SearchRequest::for_kind(kind::search_kind(child_kind), QueryFilter::Ids(unresolved))
				.returning(&[id_field.as_str()]);

			for record in self.search_all(ctx, request).await? {
				parent_ids.extend(referenced_ids(&record.data, &spec.parent_object_id_path));
			}
		}

		if parent_ids.is_empty() {
			return Ok(Vec::new());
		}

		let request = SearchRequest::for_kind(
			kind::search_kind(&spec.parent_kind),
			QueryFilter::Ids(parent_ids.into_iter().collect()),
		)
		.returning(&[ID_FIELD, KIND_FIELD]);

		self.search_all(ctx, request).await
	}

	/// Records that extend properties of the changed parent records through ChildToParent paths.
	async fn children_items(
		&self,
		ctx: &RequestContext,
		parent_kind: &str,
		changes: &[RecordChangeInfo],
		trail: &AncestryTrail,
		report: &mut PropagationReport,
	) -> Vec<RecordInfo> {
		let codes = match self.children_kinds(ctx, parent_kind).await {
			Ok(codes) => codes,
			Err(err) => {
				tracing::warn!(
					tenant = %ctx.tenant,
					kind = %parent_kind,
					error = %err,
					"Children kind lookup failed. Children propagation is skipped."
				);

				return Vec::new();
			},
		};
		let mut search_kinds = Vec::new();

		for code in codes {
			if trail.covers_major(&code) {
				report.cyclic_skips += 1;

				tracing::debug!(kind = %code, %trail, "Child kind is already on the ancestry trail.");

				continue;
			}

			match self.resolve_concrete_kind(ctx, &code).await {
				Ok(Some(_)) => search_kinds.push(kind::search_kind(&code)),
				Ok(None) => {
					tracing::debug!(kind = %code, "Child kind has no indexed records.");
				},
				Err(err) => {
					tracing::warn!(
						tenant = %ctx.tenant,
						kind = %code,
						error = %err,
						"Child kind resolution failed. The kind is skipped."
					);
				},
			}
		}

		if search_kinds.is_empty() {
			return Vec::new();
		}

		let by_id = changes
			.iter()
			.map(|change| (kind::strip_id_postfix(&change.record.id).to_string(), change))
			.collect::<AHashMap<_, _>>();
		let mut parent_ids = by_id.keys().cloned().collect::<Vec<_>>();

		parent_ids.sort();

		let identities_field = format!("data.{ASSOCIATED_IDENTITIES}");
		let request = SearchRequest::new(
			search_kinds,
			Some(QueryFilter::FieldAnyOf { field: identities_field.clone(), values: parent_ids }),
		)
		.returning(&[ID_FIELD, KIND_FIELD, identities_field.as_str()]);
		let children = match self.search_all(ctx, request).await {
			Ok(children) => children,
			Err(err) => {
				tracing::warn!(
					tenant = %ctx.tenant,
					kind = %parent_kind,
					error = %err,
					"Children search failed. Children propagation is skipped."
				);

				return Vec::new();
			},
		};
		let mut items = Vec::new();

		for child in children {
			if self.extended_properties_changed(ctx, &child, parent_kind, &by_id).await {
				items.push(RecordInfo::new(child.kind, child.id, OperationType::Update));
			}
		}

		items
	}

	async fn extended_properties_changed(
		&self,
		ctx: &RequestContext,
		child: &SearchRecord,
		parent_kind: &str,
		changes: &AHashMap<String, &RecordChangeInfo>,
	) -> bool {
		let parents = path::extract(&child.data, ASSOCIATED_IDENTITIES, None, false)
			.iter()
			.filter_map(|id| changes.get(kind::strip_id_postfix(&path::value_string(id))).copied())
			.collect::<Vec<_>>();

		if parents.iter().any(|change| !change.is_update()) {
			return true;
		}

		let updated = parents
			.iter()
			.flat_map(|change| change.updated_properties.iter().cloned())
			.collect::<Vec<_>>();

		if updated.is_empty() {
			return false;
		}

		match self.resolve_configurations(ctx, &child.kind).await {
			Ok(Some(configurations)) => configurations.extends_changed_parent(parent_kind, &updated),
			Ok(None) => false,
			Err(err) => {
				tracing::warn!(
					tenant = %ctx.tenant,
					kind = %child.kind,
					error = %err,
					"Child configuration lookup failed. The child is reindexed."
				);

				true
			},
		}
	}

	async fn emit(
		&self,
		ctx: &RequestContext,
		items: Vec<RecordInfo>,
		trail: &AncestryTrail,
		report: &mut PropagationReport,
	) {
		let mut seen = BTreeSet::new();
		let items = items
			.into_iter()
			.filter(|item| seen.insert((item.kind.clone(), item.id.clone())))
			.collect::<Vec<_>>();
		let batch_size = self.cfg.augmentation.propagation_batch_size.max(1) as usize;

		for batch in items.chunks(batch_size) {
			let message = RecordChangedMessages {
				data: batch.to_vec(),
				attributes: ctx.attributes(trail),
			};

			let kinds = batch.iter().map(|item| item.kind.as_str()).collect::<BTreeSet<_>>();

			match self.queue.enqueue(ctx, &message, 0).await {
				Ok(()) => {
					report.messages += 1;
					report.records += batch.len();

					tracing::info!(
						tenant = %ctx.tenant,
						kinds = kinds.len(),
						records = batch.len(),
						ancestry_kinds = %trail,
						"Propagation batch queued."
					);
				},
				Err(err) => {
					report.failed_messages += 1;

					tracing::warn!(
						tenant = %ctx.tenant,
						records = batch.len(),
						error = %err,
						"Propagation batch could not be queued."
					);
				},
			}
		}
	}
}

fn referenced_ids(data: &serde_json::Map<String, Value>, id_path: &str) -> Vec<String> {
	path::extract(data, id_path, None, false)
		.iter()
		.map(path::value_string)
		.map(|id| kind::strip_id_postfix(id.trim()).to_string())
		.filter(|id| !id.is_empty())
		.collect()
}
