mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Augmentation, Cache, Config, DEFAULT_CONFIGURATION_KIND, Postgres, ProviderConfig, Providers,
	Service, Storage, Worker,
};

use std::{fs, path::Path};

const MAX_SEARCH_PAGE_SIZE: u32 = 1_000;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	for (label, provider) in [
		("search", &cfg.providers.search),
		("records", &cfg.providers.records),
		("schema", &cfg.providers.schema),
	] {
		if provider.api_base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.api_base must be non-empty."),
			});
		}
		if provider.api_key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("providers.{label}.api_key must be non-empty."),
			});
		}
		if provider.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
		if provider.default_headers.values().any(|value| !value.is_string()) {
			return Err(Error::Validation {
				message: format!("providers.{label}.default_headers values must be strings."),
			});
		}
	}

	if cfg.augmentation.propagation_batch_size == 0 {
		return Err(Error::Validation {
			message: "augmentation.propagation_batch_size must be greater than zero.".to_string(),
		});
	}
	if cfg.augmentation.search_page_size == 0
		|| cfg.augmentation.search_page_size > MAX_SEARCH_PAGE_SIZE
	{
		return Err(Error::Validation {
			message: format!(
				"augmentation.search_page_size must be in the range 1-{MAX_SEARCH_PAGE_SIZE}."
			),
		});
	}
	if !cfg.augmentation.configuration_kind.ends_with('*')
		&& cfg.augmentation.configuration_kind.matches(':').count() != 3
	{
		return Err(Error::Validation {
			message: "augmentation.configuration_kind must be a kind or a kind pattern ending with '*'."
				.to_string(),
		});
	}
	if cfg.cache.max_entries == 0 {
		return Err(Error::Validation {
			message: "cache.max_entries must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.data_ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "cache.data_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.max_attempts <= 0 {
		return Err(Error::Validation {
			message: "worker.max_attempts must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for provider in
		[&mut cfg.providers.search, &mut cfg.providers.records, &mut cfg.providers.schema]
	{
		let trimmed = provider.api_base.trim().trim_end_matches('/');

		if trimmed.len() != provider.api_base.len() {
			provider.api_base = trimmed.to_string();
		}
	}

	if cfg.augmentation.configuration_kind.trim().is_empty() {
		cfg.augmentation.configuration_kind = DEFAULT_CONFIGURATION_KIND.to_string();
	}
}
