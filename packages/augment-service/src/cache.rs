use std::{
	sync::{Arc, RwLock},
	time::{Duration, Instant},
};

use ahash::AHashMap;
use serde_json::{Map, Value};

use augment_domain::{
	configuration::{ParentChildRelationshipSpec, PropertyConfigurations},
	message::RecordChangeInfo,
};

/// Memoization port. A miss must never change the result a caller computes.
pub trait Cache<V>
where
	Self: Send + Sync,
{
	fn get(&self, key: &str) -> Option<V>;

	fn put(&self, key: String, value: V);

	fn delete(&self, key: &str);
}

struct Entry<V> {
	value: V,
	inserted_at: Instant,
	expires_at: Option<Instant>,
}

/// Process-local cache with an optional TTL and an entry cap. The oldest entry is evicted first.
pub struct MemoryCache<V> {
	entries: RwLock<AHashMap<String, Entry<V>>>,
	ttl: Option<Duration>,
	max_entries: usize,
}
impl<V> MemoryCache<V> {
	/// A zero `ttl` keeps entries until they are evicted or deleted.
	pub fn new(ttl: Duration, max_entries: usize) -> Self {
		Self {
			entries: RwLock::new(AHashMap::new()),
			ttl: (!ttl.is_zero()).then_some(ttl),
			max_entries: max_entries.max(1),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.read().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl<V> Cache<V> for MemoryCache<V>
where
	V: Clone + Send + Sync,
{
	fn get(&self, key: &str) -> Option<V> {
		let entries = self.entries.read().unwrap_or_else(|err| err.into_inner());
		let entry = entries.get(key)?;

		if entry.expires_at.is_some_and(|expires_at| expires_at <= Instant::now()) {
			return None;
		}

		Some(entry.value.clone())
	}

	fn put(&self, key: String, value: V) {
		let now = Instant::now();
		let mut entries = self.entries.write().unwrap_or_else(|err| err.into_inner());

		if !entries.contains_key(&key) && entries.len() >= self.max_entries {
			entries.retain(|_, entry| entry.expires_at.is_none_or(|expires_at| expires_at > now));

			if entries.len() >= self.max_entries
				&& let Some(oldest) = entries
					.iter()
					.min_by_key(|(_, entry)| entry.inserted_at)
					.map(|(key, _)| key.clone())
			{
				entries.remove(&oldest);
			}
		}

		entries.insert(
			key,
			Entry { value, inserted_at: now, expires_at: self.ttl.map(|ttl| now + ttl) },
		);
	}

	fn delete(&self, key: &str) {
		self.entries.write().unwrap_or_else(|err| err.into_inner()).remove(key);
	}
}

/// Every cache the engine reads through. Keys are tenant scoped.
#[derive(Clone)]
pub struct Caches {
	/// `None` marks a kind known to have no usable configuration.
	pub configurations: Arc<dyn Cache<Option<PropertyConfigurations>>>,
	pub parent_child_specs: Arc<dyn Cache<Vec<ParentChildRelationshipSpec>>>,
	pub children_kinds: Arc<dyn Cache<Vec<String>>>,
	pub has_configurations: Arc<dyn Cache<bool>>,
	pub kinds: Arc<dyn Cache<String>>,
	pub related_data: Arc<dyn Cache<Map<String, Value>>>,
	pub change_info: Arc<dyn Cache<RecordChangeInfo>>,
}
impl Caches {
	pub fn memory(cfg: &augment_config::Cache) -> Self {
		let spec_ttl = Duration::from_secs(cfg.spec_ttl_seconds);
		let data_ttl = Duration::from_secs(cfg.data_ttl_seconds);

		Self {
			configurations: Arc::new(MemoryCache::new(spec_ttl, cfg.max_entries)),
			parent_child_specs: Arc::new(MemoryCache::new(spec_ttl, cfg.max_entries)),
			children_kinds: Arc::new(MemoryCache::new(spec_ttl, cfg.max_entries)),
			has_configurations: Arc::new(MemoryCache::new(spec_ttl, cfg.max_entries)),
			kinds: Arc::new(MemoryCache::new(spec_ttl, cfg.max_entries)),
			related_data: Arc::new(MemoryCache::new(data_ttl, cfg.max_entries)),
			change_info: Arc::new(MemoryCache::new(data_ttl, cfg.max_entries)),
		}
	}
}
