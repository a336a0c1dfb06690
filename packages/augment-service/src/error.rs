pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Search error: {message}")]
	Search { message: String },
	#[error("Lookup error: {message}")]
	Lookup { message: String },
	#[error("Queue error: {message}")]
	Queue { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Serialization error: {message}")]
	Serialization { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<augment_storage::Error> for Error {
	fn from(err: augment_storage::Error) -> Self {
		match err {
			augment_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			augment_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			augment_storage::Error::NotFound(message) => Self::Storage { message },
			augment_storage::Error::SerdeJson(inner) =>
				Self::Serialization { message: inner.to_string() },
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization { message: err.to_string() }
	}
}
