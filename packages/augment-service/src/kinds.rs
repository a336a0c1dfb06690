use augment_domain::{kind, message::RequestContext, query::SearchRequest};

use crate::{AugmentService, Result};

const KIND_FIELD: &str = "kind";

impl AugmentService {
	/// Latest concrete kind with data for a kind-with-major or kind pattern.
	///
	/// Every page of records is scanned, since the newest version may sit behind older records.
	/// `None` is a legitimate answer when no record of the kind is indexed yet, and is not cached.
	pub async fn resolve_concrete_kind(
		&self,
		ctx: &RequestContext,
		kind: &str,
	) -> Result<Option<String>> {
		if kind::is_concrete_kind(kind) {
			return Ok(Some(kind.to_string()));
		}

		let Some(kind_with_major) = kind::kind_with_major(kind) else {
			return Ok(None);
		};
		let key = ctx.key(&kind_with_major);

		if let Some(cached) = self.caches.kinds.get(&key) {
			return Ok(Some(cached));
		}

		tracing::debug!(tenant = %ctx.tenant, kind = %kind_with_major, "Kind cache miss.");

		let request = SearchRequest::new(vec![kind::search_kind(&kind_with_major)], None)
			.returning(&[KIND_FIELD]);
		let concrete = self
			.search_all(ctx, request)
			.await?
			.into_iter()
			.map(|record| record.kind)
			.filter(|candidate| {
				kind::is_concrete_kind(candidate)
					&& kind::has_same_major_kind(candidate, &kind_with_major)
			})
			.max_by(|left, right| kind::compare_versions(left, right));

		if let Some(concrete) = &concrete {
			self.caches.kinds.put(key, concrete.clone());
		}

		Ok(concrete)
	}
}
