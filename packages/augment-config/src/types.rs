use serde::Deserialize;
use serde_json::{Map, Value};

pub const DEFAULT_CONFIGURATION_KIND: &str =
	"osdu:wks:reference-data--IndexPropertyPathConfiguration:*";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub augmentation: Augmentation,
	pub cache: Cache,
	pub worker: Worker,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	/// Search query service used for configurations, kinds, related records and propagation.
	pub search: ProviderConfig,
	/// Record storage service used to read a record's stored data by id.
	pub records: ProviderConfig,
	/// Schema service used to load the schemas of related kinds.
	pub schema: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Augmentation {
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub propagation_batch_size: u32,
	#[serde(default = "default_search_page_size")]
	pub search_page_size: u32,
	#[serde(default = "default_configuration_kind")]
	pub configuration_kind: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Cache {
	/// Zero keeps configuration, kind and relationship entries for the process lifetime.
	pub spec_ttl_seconds: u64,
	pub data_ttl_seconds: u64,
	pub max_entries: usize,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub claim_lease_seconds: i64,
	pub max_attempts: i32,
}

fn default_true() -> bool {
	true
}

fn default_search_page_size() -> u32 {
	1_000
}

fn default_configuration_kind() -> String {
	DEFAULT_CONFIGURATION_KIND.to_string()
}
