use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use augment_domain::{
	ASSOCIATED_IDENTITIES,
	configuration::{
		Direction, PropertyConfiguration, PropertyConfigurations, PropertyPath, RelatedObjectsSpec,
	},
	kind,
	message::RequestContext,
	path,
	query::SearchRecord,
};

use crate::AugmentService;

impl AugmentService {
	/// Extended properties of `record`, or an empty map when its kind is not augmented.
	pub async fn extended_properties(
		&self,
		ctx: &RequestContext,
		record: &SearchRecord,
	) -> Map<String, Value> {
		if !self.cfg.augmentation.enabled {
			return Map::new();
		}

		match self.resolve_configurations(ctx, &record.kind).await {
			Ok(Some(configurations)) =>
				self.compute_extended_properties(ctx, &record.id, &record.data, &configurations).await,
			Ok(None) => Map::new(),
			Err(err) => {
				tracing::warn!(
					tenant = %ctx.tenant,
					kind = %record.kind,
					error = %err,
					"Configuration lookup failed. The record is indexed without extended properties."
				);

				Map::new()
			},
		}
	}

	/// Evaluates `configurations` against one record. Properties the record already holds are
	/// never overridden.
	pub async fn compute_extended_properties(
		&self,
		ctx: &RequestContext,
		object_id: &str,
		original: &Map<String, Value>,
		configurations: &PropertyConfigurations,
	) -> Map<String, Value> {
		let pending = configurations
			.configurations
			.iter()
			.filter(|configuration| !has_value(original, &configuration.name))
			.collect::<Vec<_>>();
		let mut extended = Map::new();
		let mut associated = BTreeSet::new();

		self.prefetch_parents(ctx, original, &pending).await;

		for configuration in pending {
			let mut property = Map::new();

			for property_path in &configuration.paths {
				let values = match &property_path.related {
					None => extract_renamed(original, configuration, property_path),
					Some(related) => match related.direction {
						Direction::ChildToParent =>
							self.parent_values(
								ctx,
								original,
								configuration,
								property_path,
								related,
								&mut associated,
							)
							.await,
						Direction::ParentToChildren =>
							self.children_values(ctx, object_id, configuration, property_path, related)
								.await,
					},
				};

				if values.is_empty() {
					continue;
				}

				path::combine(&mut property, values);

				if configuration.policy.is_first_match() {
					break;
				}
			}

			path::combine(&mut extended, property);
		}

		if !associated.is_empty() {
			extended.insert(
				ASSOCIATED_IDENTITIES.to_string(),
				Value::Array(associated.into_iter().map(Value::String).collect()),
			);
		}

		extended
	}

	/// Loads the parents of every pending ChildToParent path with one search per call, including
	/// paths a first-match policy may not reach.
	async fn prefetch_parents(
		&self,
		ctx: &RequestContext,
		original: &Map<String, Value>,
		configurations: &[&PropertyConfiguration],
	) {
		let mut kind_ids = BTreeMap::<String, BTreeSet<String>>::new();

		for configuration in configurations {
			for related in configuration.paths.iter().filter_map(|property_path| {
				property_path
					.related
					.as_ref()
					.filter(|related| related.direction == Direction::ChildToParent)
			}) {
				kind_ids.entry(related.kind.clone()).or_default().extend(related_ids(original, related));
			}
		}

		if let Err(err) = self.prefetch_related(ctx, &kind_ids).await {
			tracing::warn!(tenant = %ctx.tenant, error = %err, "Related record prefetch failed.");
		}
	}

	async fn parent_values(
		&self,
		ctx: &RequestContext,
		original: &Map<String, Value>,
		configuration: &PropertyConfiguration,
		property_path: &PropertyPath,
		related: &RelatedObjectsSpec,
		associated: &mut BTreeSet<String>,
	) -> Map<String, Value> {
		let ids = related_ids(original, related);
		let mut values = Map::new();

		associated.extend(ids.iter().cloned());

		for id in ids {
			let data = match self.fetch_related_by_id(ctx, &related.kind, &id).await {
				Ok(Some(data)) => data,
				Ok(None) => continue,
				Err(err) => {
					tracing::warn!(
						tenant = %ctx.tenant,
						%id,
						error = %err,
						"Parent record lookup failed. The path is skipped for this parent."
					);

					continue;
				},
			};
			let extracted = extract_renamed(&data, configuration, property_path);

			if extracted.is_empty() {
				continue;
			}

			path::combine(&mut values, extracted);

			if configuration.policy.is_first_match() {
				break;
			}
		}

		values
	}

	async fn children_values(
		&self,
		ctx: &RequestContext,
		object_id: &str,
		configuration: &PropertyConfiguration,
		property_path: &PropertyPath,
		related: &RelatedObjectsSpec,
	) -> Map<String, Value> {
		let children = match self
			.fetch_related_by_field(ctx, &related.kind, &related.id_field(), object_id)
			.await
		{
			Ok(children) => children,
			Err(err) => {
				tracing::warn!(
					tenant = %ctx.tenant,
					%object_id,
					error = %err,
					"Child record search failed. The path is skipped."
				);

				return Map::new();
			},
		};
		let mut values = Map::new();

		for child in children {
			// Recently indexed children may be newer than their search hit.
			let data = self.caches.related_data.get(&ctx.key(&child.id)).unwrap_or(child.data);
			let extracted = extract_renamed(&data, configuration, property_path);

			if extracted.is_empty() {
				continue;
			}

			path::combine(&mut values, extracted);

			if configuration.policy.is_first_match() {
				break;
			}
		}

		values
	}
}

fn has_value(original: &Map<String, Value>, name: &str) -> bool {
	original.get(path::strip_data_prefix(name)).is_some_and(|value| !value.is_null())
}

fn related_ids(original: &Map<String, Value>, related: &RelatedObjectsSpec) -> Vec<String> {
	let mut ids = path::extract(original, &related.id_path, related.condition.as_ref(), false)
		.iter()
		.map(path::value_string)
		.map(|id| kind::strip_id_postfix(id.trim()).to_string())
		.filter(|id| !id.is_empty())
		.collect::<Vec<_>>();

	ids.sort();
	ids.dedup();

	ids
}

fn extract_renamed(
	data: &Map<String, Value>,
	configuration: &PropertyConfiguration,
	property_path: &PropertyPath,
) -> Map<String, Value> {
	let value_path = &property_path.value.value_path;
	let extracted = path::extract_properties(
		data,
		value_path,
		property_path.value.condition.as_ref(),
		configuration.policy.is_first_match(),
	);

	path::rename_properties(&configuration.name, value_path, extracted)
}
