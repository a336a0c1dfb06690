pub mod cache;
pub mod compute;
pub mod configurations;
pub mod kinds;
pub mod propagation;
pub mod queue;
pub mod reindex;
pub mod related;
pub mod schema;

mod error;
mod search;

pub use cache::{Cache, Caches, MemoryCache};
pub use error::{Error, Result};
pub use propagation::PropagationReport;
pub use queue::OutboxQueue;
pub use reindex::{AugmentedRecord, ReindexOutput};

use std::{future::Future, pin::Pin, sync::Arc};

use augment_config::{Config, ProviderConfig};
use augment_domain::{
	message::{RecordChangedMessages, RequestContext},
	query::{SearchRecord, SearchRequest, SearchResponse},
	schema::Schema,
};
use augment_providers::{records, schema as schema_provider, search as search_provider};
use augment_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait SearchQuery
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		request: &'a SearchRequest,
	) -> BoxFuture<'a, color_eyre::Result<SearchResponse>>;

	fn query_with_cursor<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		request: &'a SearchRequest,
	) -> BoxFuture<'a, color_eyre::Result<SearchResponse>>;
}

pub trait RecordLookup
where
	Self: Send + Sync,
{
	fn fetch_records<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		ids: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<SearchRecord>>>;
}

pub trait SchemaLookup
where
	Self: Send + Sync,
{
	fn fetch_schema<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		kind: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Schema>>>;
}

/// Fire-and-forget submission of reindex work. Delivery guarantees belong to the implementation.
pub trait WorkQueue
where
	Self: Send + Sync,
{
	fn enqueue<'a>(
		&'a self,
		ctx: &'a RequestContext,
		message: &'a RecordChangedMessages,
		delay_ms: u64,
	) -> BoxFuture<'a, color_eyre::Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub search: Arc<dyn SearchQuery>,
	pub records: Arc<dyn RecordLookup>,
	pub schema: Arc<dyn SchemaLookup>,
}
impl Providers {
	pub fn new(
		search: Arc<dyn SearchQuery>,
		records: Arc<dyn RecordLookup>,
		schema: Arc<dyn SchemaLookup>,
	) -> Self {
		Self { search, records, schema }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { search: provider.clone(), records: provider.clone(), schema: provider }
	}
}

struct DefaultProviders;
impl SearchQuery for DefaultProviders {
	fn query<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		request: &'a SearchRequest,
	) -> BoxFuture<'a, color_eyre::Result<SearchResponse>> {
		Box::pin(search_provider::query(cfg, ctx, request))
	}

	fn query_with_cursor<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		request: &'a SearchRequest,
	) -> BoxFuture<'a, color_eyre::Result<SearchResponse>> {
		Box::pin(search_provider::query_with_cursor(cfg, ctx, request))
	}
}
impl RecordLookup for DefaultProviders {
	fn fetch_records<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		ids: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<SearchRecord>>> {
		Box::pin(records::fetch_records(cfg, ctx, ids))
	}
}
impl SchemaLookup for DefaultProviders {
	fn fetch_schema<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		ctx: &'a RequestContext,
		kind: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Option<Schema>>> {
		Box::pin(schema_provider::fetch_schema(cfg, ctx, kind))
	}
}

pub struct AugmentService {
	pub cfg: Config,
	pub providers: Providers,
	pub queue: Arc<dyn WorkQueue>,
	pub caches: Caches,
}
impl AugmentService {
	pub fn new(cfg: Config, db: Db) -> Self {
		let caches = Caches::memory(&cfg.cache);

		Self { cfg, providers: Providers::default(), queue: Arc::new(OutboxQueue::new(db)), caches }
	}

	pub fn with_providers(cfg: Config, providers: Providers, queue: Arc<dyn WorkQueue>) -> Self {
		let caches = Caches::memory(&cfg.cache);

		Self { cfg, providers, queue, caches }
	}

	pub fn with_caches(mut self, caches: Caches) -> Self {
		self.caches = caches;

		self
	}

	/// Queues a change event for the reindex pipeline.
	pub async fn submit_change(
		&self,
		ctx: &RequestContext,
		message: &RecordChangedMessages,
	) -> Result<()> {
		if message.data.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Change event must list at least one record.".to_string(),
			});
		}
		if let Some(record) = message.data.iter().find(|record| {
			record.id.trim().is_empty() || !augment_domain::kind::is_concrete_kind(&record.kind)
		}) {
			return Err(Error::InvalidRequest {
				message: format!(
					"Record '{}' must have a non-empty id and a concrete kind, got '{}'.",
					record.id, record.kind
				),
			});
		}

		self.queue
			.enqueue(ctx, message, 0)
			.await
			.map_err(|err| Error::Queue { message: err.to_string() })
	}
}
