use augment_domain::{
	message::RequestContext,
	query::{SearchRecord, SearchRequest},
};

use crate::{AugmentService, Error, Result};

impl AugmentService {
	pub(crate) async fn search_first(
		&self,
		ctx: &RequestContext,
		mut request: SearchRequest,
	) -> Result<Option<SearchRecord>> {
		request.limit = 1;

		Ok(self.search_page(ctx, request).await?.into_iter().next())
	}

	/// One page of `request.limit` hits, or of the configured page size when unset.
	pub(crate) async fn search_page(
		&self,
		ctx: &RequestContext,
		mut request: SearchRequest,
	) -> Result<Vec<SearchRecord>> {
		if request.limit == 0 {
			request.limit = self.cfg.augmentation.search_page_size;
		}

		request.offset = 0;

		let response = self
			.providers
			.search
			.query(&self.cfg.providers.search, ctx, &request)
			.await
			.map_err(|err| search_error(&request, err))?;

		Ok(response.results)
	}

	/// Offset pagination. Stops at the first page shorter than the page size.
	pub(crate) async fn search_pages(
		&self,
		ctx: &RequestContext,
		mut request: SearchRequest,
	) -> Result<Vec<SearchRecord>> {
		let page_size = self.cfg.augmentation.search_page_size;
		let mut records = Vec::new();

		request.limit = page_size;
		request.offset = 0;

		loop {
			let response = self
				.providers
				.search
				.query(&self.cfg.providers.search, ctx, &request)
				.await
				.map_err(|err| search_error(&request, err))?;
			let count = response.results.len();

			records.extend(response.results);

			if count < page_size as usize {
				break;
			}

			request.offset = request.offset.saturating_add(page_size);
		}

		Ok(records)
	}

	/// Cursor pagination, run until the search service reports no further page.
	pub(crate) async fn search_all(
		&self,
		ctx: &RequestContext,
		mut request: SearchRequest,
	) -> Result<Vec<SearchRecord>> {
		let mut records = Vec::new();

		request.limit = self.cfg.augmentation.search_page_size;
		request.offset = 0;
		request.cursor = None;

		loop {
			let response = self
				.providers
				.search
				.query_with_cursor(&self.cfg.providers.search, ctx, &request)
				.await
				.map_err(|err| search_error(&request, err))?;

			if response.results.is_empty() {
				break;
			}

			records.extend(response.results);

			match response.cursor {
				Some(cursor) if !cursor.is_empty() => request.cursor = Some(cursor),
				_ => break,
			}
		}

		Ok(records)
	}
}

fn search_error(request: &SearchRequest, err: color_eyre::Report) -> Error {
	Error::Search {
		message: format!(
			"Search over {} failed: {err}.",
			if request.kinds.is_empty() { "no kinds".to_string() } else { request.kinds.join(",") }
		),
	}
}
