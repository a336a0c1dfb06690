use std::sync::Arc;

use augment_service::AugmentService;
use augment_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AugmentService>,
}
impl AppState {
	pub async fn new(config: augment_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(AugmentService::new(config, db)))
	}

	pub fn from_service(service: AugmentService) -> Self {
		Self { service: Arc::new(service) }
	}
}
