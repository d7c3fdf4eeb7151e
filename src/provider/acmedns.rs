use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::config::AcmeDnsConfig;
use crate::error::{ProviderError, Result};
use crate::record::{Record, RecordAppender, RecordDeleter, RecordGetter, RecordSetter};

const CHALLENGE_PREFIX: &str = "_acme_challenge";

// Current Let's Encrypt key authorization digest size, base64url without padding.
const TOKEN_LENGTH: usize = 43;

/// Record provider backed by an acme-dns account.
///
/// acme-dns only knows how to overwrite the TXT value of one subdomain, so
/// appending and setting both end up as the same `POST /update`, listing
/// always fails and deleting is a no-op.
#[derive(Debug, Clone)]
pub struct AcmeDnsProvider {
    config: AcmeDnsConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    subdomain: &'a str,
    txt: &'a str,
}

impl AcmeDnsProvider {
    pub fn new(config: AcmeDnsConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Uses the given HTTP client for every request, e.g. one with a timeout.
    pub fn with_client(config: AcmeDnsConfig, client: Client) -> Self {
        Self { config, client }
    }

    async fn update_one(&self, zone: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        if records.len() != 1 {
            return Err(ProviderError::Unsupported(format!(
                "acme-dns accepts exactly one record per call, got {}",
                records.len()
            )));
        }

        let record = &records[0];
        validate_record(record)?;

        let url = update_url(&self.config.endpoint)?;
        let body = serde_json::to_vec(&UpdateBody {
            subdomain: &self.config.subdomain,
            txt: &record.value,
        })?;

        debug!(
            "POST {} for {} in zone {} (subdomain {})",
            url, record.name, zone, self.config.subdomain
        );

        let response = self
            .client
            .post(url.clone())
            .header("content-type", "application/json")
            .header("x-api-user", &self.config.username)
            .header("x-api-key", &self.config.password)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                "acme-dns rejected update for subdomain {}: {}",
                self.config.subdomain, status
            );
            return Err(ProviderError::RemoteRejected {
                uri: url.to_string(),
                subdomain: self.config.subdomain.clone(),
                value: record.value.clone(),
                status: status.to_string(),
            });
        }

        info!(
            "acme-dns accepted TXT value for {} (subdomain {})",
            record.name, self.config.subdomain
        );

        Ok(records)
    }
}

#[async_trait]
impl RecordGetter for AcmeDnsProvider {
    async fn get_records(&self, _zone: &str) -> Result<Vec<Record>> {
        Err(ProviderError::Unimplemented("acme-dns cannot list records"))
    }
}

#[async_trait]
impl RecordAppender for AcmeDnsProvider {
    async fn append_records(&self, zone: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        self.update_one(zone, records).await
    }
}

#[async_trait]
impl RecordSetter for AcmeDnsProvider {
    async fn set_records(&self, zone: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        self.update_one(zone, records).await
    }
}

#[async_trait]
impl RecordDeleter for AcmeDnsProvider {
    async fn delete_records(&self, zone: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        // acme-dns has no delete endpoint; the next update overwrites the value anyway.
        debug!(
            "Ignoring delete of {} record(s) in zone {}",
            records.len(),
            zone
        );
        Ok(Vec::new())
    }
}

fn validate_record(record: &Record) -> Result<()> {
    if record.record_type != "TXT" {
        return Err(ProviderError::Unsupported(format!(
            "record type {} is not TXT",
            record.record_type
        )));
    }

    if !record.name.starts_with(CHALLENGE_PREFIX) {
        return Err(ProviderError::Unsupported(format!(
            "record name {} does not start with {}",
            record.name, CHALLENGE_PREFIX
        )));
    }

    if !is_valid_token(&record.value) {
        return Err(ProviderError::Unsupported(format!(
            "TXT value {:?} is not a {}-character base64url token",
            record.value, TOKEN_LENGTH
        )));
    }

    Ok(())
}

/// Strips everything outside the URL-safe base64 alphabet.
fn sanitize_token(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

fn is_valid_token(value: &str) -> bool {
    value.chars().count() == TOKEN_LENGTH && sanitize_token(value).chars().count() == TOKEN_LENGTH
}

fn update_url(endpoint: &str) -> Result<Url> {
    let joined = join_path(endpoint, "update");
    Url::parse(&joined).map_err(|e| ProviderError::InvalidEndpoint(format!("{}: {}", endpoint, e)))
}

/// Appends `segment` to the path of `base`, leaving scheme, authority, query
/// and fragment alone.
fn join_path(base: &str, segment: &str) -> String {
    let (base, suffix) = match base.find(['?', '#']) {
        Some(idx) => base.split_at(idx),
        None => (base, ""),
    };

    let (origin, path) = match base.split_once("://") {
        Some((scheme, rest)) => {
            let (authority, path) = match rest.find('/') {
                Some(idx) => rest.split_at(idx),
                None => (rest, ""),
            };
            (format!("{}://{}", scheme, authority), path)
        }
        None => (String::new(), base),
    };

    format!(
        "{}{}{}",
        origin,
        clean_path(&format!("{}/{}", path, segment)),
        suffix
    )
}

/// Lexical cleanup of an absolute path: collapses slashes, resolves `.` and `..`.
fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    format!("/{}", segments.join("/"))
}
