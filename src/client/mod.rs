//! API client used by front-end tooling and integration tests.
//!
//! ```ignore
//! let storage = Arc::new(FileStorage::new(".session"));
//! let tokens = Arc::new(TokenStore::new(storage));
//! tokens.load_token_from_storage();
//!
//! let client = ApiClient::new(ReqwestTransport::new(base_url)?, tokens);
//! let jobs = client.send(ApiRequest::get("/api/jobs")).await?;
//! ```

mod api_client;
mod coordinator;
mod error;
mod storage;
mod token_store;
mod transport;

pub use api_client::{ApiClient, DEFAULT_REFRESH_TIMEOUT};
pub use coordinator::{Acquired, RefreshCoordinator, RefreshLeader};
pub use error::{ClientError, RefreshError};
pub use storage::{FileStorage, MemoryStorage, TokenStorage};
pub use token_store::{ACCESS_TOKEN_SLOT, TokenStore};
pub use transport::{
    ApiRequest, ApiResponse, REFRESH_PATH, ReqwestTransport, Transport, TransportError,
};
