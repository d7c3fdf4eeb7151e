use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors returned by record providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The upstream service has no endpoint for this operation.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    /// The request was rejected locally, before any network call.
    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("failed to encode update body: {0}")]
    Encode(#[from] serde_json::Error),

    /// Connection, timeout or request building failure.
    #[error("acme-dns request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with something other than 200 OK.
    #[error("acme-dns update failed: POST {uri}, subdomain: {subdomain}, value: {value}  {status}")]
    RemoteRejected {
        uri: String,
        subdomain: String,
        value: String,
        status: String,
    },
}
