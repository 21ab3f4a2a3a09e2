//! Backend contract and transports for DocLink metadata
//!
//! Every transport implements [`Backend`]: entity retrieval, whitelist and
//! existence queries, plus administrative operations that only some
//! transports support (the rest return [`BackendError::Unsupported`]).
//!
//! ## Features
//!
//! - `api` - HTTP transport over `reqwest`
//! - `mssql` - SQL Server transport over `tiberius`
//!
//! Without a feature the matching constructor returns a configuration error;
//! the in-memory fakes in [`mock`] are always available.
//!
//! ## Example
//!
//! ```rust,ignore
//! use doclink_backend::{ApiBackend, ApiCredentials, Backend};
//!
//! let backend = ApiBackend::from_settings(&settings, Duration::from_secs(300))?;
//! backend.connect(&ApiCredentials::from_settings(&settings, password)).await?;
//! let properties = backend.get_properties().await?;
//! ```

pub mod api;
pub mod backend;
pub mod cache;
pub mod error;
pub mod journal;
pub mod mock;
pub mod queries;
pub mod sql;

pub use api::{ApiBackend, ApiCredentials, ApiSession, HttpMethod, HttpRequest, HttpTransport};
pub use backend::{optional_table, AccessibleItems, Backend, Delivery, RiSchedule, TableColumn, TableData};
pub use cache::{AccessibleItemsCache, RefetchReason};
pub use error::BackendError;
pub use journal::TransactionJournal;
pub use mock::{MemoryConnection, MockBackend, MockBackendBuilder, MockTransport};
pub use sql::{SqlBackend, SqlConnection};

#[cfg(feature = "api")]
pub use api::ReqwestTransport;
#[cfg(feature = "mssql")]
pub use sql::TiberiusConnection;
