use std::collections::HashMap;

use augment_domain::{
	message::RequestContext,
	schema::{self, Schema, SchemaItem},
};

use crate::AugmentService;

impl AugmentService {
	/// Schema items declaring the extended properties of `original`'s kind.
	///
	/// Related kinds without data or without a registered schema are left out of the projection.
	pub async fn extended_schema(&self, ctx: &RequestContext, original: &Schema) -> Vec<SchemaItem> {
		if !self.cfg.augmentation.enabled {
			return Vec::new();
		}

		let configurations = match self.resolve_configurations(ctx, &original.kind).await {
			Ok(Some(configurations)) => configurations,
			Ok(None) => return Vec::new(),
			Err(err) => {
				tracing::warn!(
					tenant = %ctx.tenant,
					kind = %original.kind,
					error = %err,
					"Configuration lookup failed. The schema is not extended."
				);

				return Vec::new();
			},
		};
		let mut related = HashMap::new();

		for related_kind in configurations.related_kinds() {
			let concrete = match self.resolve_concrete_kind(ctx, &related_kind).await {
				Ok(Some(concrete)) => concrete,
				Ok(None) => {
					tracing::debug!(kind = %related_kind, "Related kind has no indexed records.");

					continue;
				},
				Err(err) => {
					tracing::warn!(
						tenant = %ctx.tenant,
						kind = %related_kind,
						error = %err,
						"Related kind resolution failed. The kind is left out of the schema."
					);

					continue;
				},
			};

			match self.providers.schema.fetch_schema(&self.cfg.providers.schema, ctx, &concrete).await {
				Ok(Some(related_schema)) => {
					related.insert(related_kind, related_schema);
				},
				Ok(None) => {
					tracing::debug!(kind = %concrete, "Related kind has no registered schema.");
				},
				Err(err) => {
					tracing::warn!(
						tenant = %ctx.tenant,
						kind = %concrete,
						error = %err,
						"Schema lookup failed. The kind is left out of the schema."
					);
				},
			}
		}

		schema::extend(original, &related, &configurations)
	}
}
