use augment_domain::{
	configuration::{
		Direction, ParentChildRelationshipSpec, PropertyConfigurations,
		PropertyConfigurationsDocument,
	},
	kind,
	message::RequestContext,
	query::{QueryFilter, SearchRecord, SearchRequest, SortOrder},
};

use crate::{AugmentService, Result};

const CODE_FIELD: &str = "data.Code";
const VERSION_FIELD: &str = "version";

impl AugmentService {
	/// Configuration of the kind-with-major of `kind`, or `None` when the kind is not augmented.
	///
	/// Both outcomes are cached. Search failures are returned and never cached.
	pub async fn resolve_configurations(
		&self,
		ctx: &RequestContext,
		kind: &str,
	) -> Result<Option<PropertyConfigurations>> {
		let Some(code) = kind::kind_with_major(kind) else {
			return Ok(None);
		};
		let key = ctx.key(&code);

		if let Some(cached) = self.caches.configurations.get(&key) {
			return Ok(cached);
		}

		tracing::debug!(tenant = %ctx.tenant, %code, "Configuration cache miss.");

		let mut request = self
			.configuration_request(QueryFilter::FieldEquals {
				field: CODE_FIELD.to_string(),
				value: code.clone(),
			})
			.sorted_by(VERSION_FIELD, SortOrder::Desc);

		request.limit = 2;

		let records = self.search_page(ctx, request).await?;

		if records.len() > 1 {
			tracing::warn!(
				tenant = %ctx.tenant,
				%code,
				"More than one configuration exists for the code. The latest version is used."
			);
		}

		let configurations = records.first().and_then(parse_configurations);

		self.caches.configurations.put(key, configurations.clone());

		Ok(configurations)
	}

	/// Relationships in which `child_kind` is the child of a ParentToChildren path.
	pub async fn parent_child_specs(
		&self,
		ctx: &RequestContext,
		child_kind: &str,
	) -> Result<Vec<ParentChildRelationshipSpec>> {
		let Some(child_kind_with_major) = kind::kind_with_major(child_kind) else {
			return Ok(Vec::new());
		};
		let key = ctx.key(&child_kind_with_major);

		if let Some(cached) = self.caches.parent_child_specs.get(&key) {
			return Ok(cached);
		}

		let request = self.configuration_request(QueryFilter::RelatedKind {
			direction: Some(Direction::ParentToChildren),
			kind: child_kind_with_major.clone(),
		});
		let mut specs = Vec::new();

		for record in self.search_pages(ctx, request).await? {
			if let Some(configurations) = parse_configurations(&record) {
				specs = ParentChildRelationshipSpec::merge(
					specs,
					configurations.parent_child_specs(&child_kind_with_major),
				);
			}
		}

		self.caches.parent_child_specs.put(key, specs.clone());

		Ok(specs)
	}

	/// Codes of the configurations that pull values from `parent_kind` through a ChildToParent path.
	pub async fn children_kinds(
		&self,
		ctx: &RequestContext,
		parent_kind: &str,
	) -> Result<Vec<String>> {
		let Some(parent_kind_with_major) = kind::kind_with_major(parent_kind) else {
			return Ok(Vec::new());
		};
		let key = ctx.key(&parent_kind_with_major);

		if let Some(cached) = self.caches.children_kinds.get(&key) {
			return Ok(cached);
		}

		let request = self.configuration_request(QueryFilter::RelatedKind {
			direction: Some(Direction::ChildToParent),
			kind: parent_kind_with_major.clone(),
		});
		let mut codes = self
			.search_pages(ctx, request)
			.await?
			.iter()
			.filter_map(parse_configurations)
			.filter(|configurations| configurations.references_parent(&parent_kind_with_major))
			.map(|configurations| configurations.code)
			.collect::<Vec<_>>();

		codes.sort();
		codes.dedup();

		self.caches.children_kinds.put(key, codes.clone());

		Ok(codes)
	}

	/// True when `kind` is augmented or referenced as a related kind by any configuration.
	pub async fn has_configurations(&self, ctx: &RequestContext, kind: &str) -> Result<bool> {
		let Some(kind_with_major) = kind::kind_with_major(kind) else {
			return Ok(false);
		};
		let key = ctx.key(&kind_with_major);

		if let Some(cached) = self.caches.has_configurations.get(&key) {
			return Ok(cached);
		}

		let request = self.configuration_request(QueryFilter::Or(vec![
			QueryFilter::FieldEquals { field: CODE_FIELD.to_string(), value: kind_with_major.clone() },
			QueryFilter::RelatedKind { direction: None, kind: kind_with_major },
		]));
		let found = self.search_first(ctx, request).await?.is_some();

		self.caches.has_configurations.put(key, found);

		Ok(found)
	}

	fn configuration_request(&self, query: QueryFilter) -> SearchRequest {
		SearchRequest::for_kind(self.cfg.augmentation.configuration_kind.clone(), query)
	}
}

fn parse_configurations(record: &SearchRecord) -> Option<PropertyConfigurations> {
	let document = match PropertyConfigurationsDocument::from_data(&record.data) {
		Ok(document) => document,
		Err(err) => {
			tracing::warn!(id = %record.id, error = %err, "Configuration document failed to parse.");

			return None;
		},
	};

	match document.validate() {
		Ok(validated) => {
			if validated.skipped > 0 {
				tracing::warn!(
					id = %record.id,
					code = %validated.configurations.code,
					skipped = validated.skipped,
					"Configuration document has invalid entries."
				);
			}

			Some(validated.configurations)
		},
		Err(rejections) => {
			let reasons = rejections.iter().map(ToString::to_string).collect::<Vec<_>>();

			tracing::warn!(id = %record.id, reasons = %reasons.join(" "), "Configuration document is invalid.");

			None
		},
	}
}
