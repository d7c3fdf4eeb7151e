//! Record provider for acme-dns, plus an HTTP relay exposing it to ACME clients.
//!
//! acme-dns accepts a single authenticated `POST /update` that overwrites the
//! TXT value of one registered subdomain. [`AcmeDnsProvider`] maps the generic
//! record capabilities in [`record`] onto that endpoint.

pub mod api;
pub mod config;
pub mod error;
pub mod provider;
pub mod record;

pub use error::{ProviderError, Result};
pub use provider::AcmeDnsProvider;
pub use record::{Record, RecordAppender, RecordDeleter, RecordGetter, RecordSetter};
