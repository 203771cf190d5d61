//! HTTP client for the status server: status snapshots, commands, screenshots.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use reqwest::{Certificate, Client, StatusCode};
use thiserror::Error;
use url::Url;

use crate::types::{CommandAction, StatusDocument};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
/// Whole-request budget: a server that accepts and never answers fails the
/// poll within a few poll periods instead of hanging it.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(6);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid server url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status: {0}")]
    UnexpectedStatus(StatusCode),
    #[error("cannot read CA certificate {path}: {source}")]
    CertificateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid CA certificate {path}: {source}")]
    CertificateParse {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// `base` is the server root, e.g. `http://127.0.0.1:5051`.
    pub fn new(base: &str, tls_ca: Option<&Path>) -> Result<Self, ApiError> {
        Self::with_timeout(base, tls_ca, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(
        base: &str,
        tls_ca: Option<&Path>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base = Url::parse(base).map_err(|source| ApiError::InvalidUrl {
            url: base.to_string(),
            source,
        })?;
        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout);
        if let Some(path) = tls_ca {
            let pem = std::fs::read(path).map_err(|source| ApiError::CertificateRead {
                path: path.to_path_buf(),
                source,
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|source| {
                ApiError::CertificateParse { path: path.to_path_buf(), source }
            })?;
            builder = builder.add_root_certificate(cert);
        }
        Ok(Self { http: builder.build()?, base })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|source| ApiError::InvalidUrl {
            url: format!("{}{path}", self.base),
            source,
        })
    }

    pub async fn fetch_status(&self) -> Result<StatusDocument, ApiError> {
        let res = self.http.get(self.endpoint("/api/status")?).send().await?;
        if !res.status().is_success() {
            return Err(ApiError::UnexpectedStatus(res.status()));
        }
        Ok(res.json::<StatusDocument>().await?)
    }

    /// Only the HTTP status matters; any body is ignored.
    pub async fn send_command(&self, client_id: &str, action: CommandAction) -> Result<(), ApiError> {
        let res = self
            .http
            .post(self.endpoint("/api/command")?)
            .query(&[("clientId", client_id), ("action", action.as_str())])
            .send()
            .await?;
        if res.status().is_success() {
            Ok(())
        } else {
            Err(ApiError::UnexpectedStatus(res.status()))
        }
    }

    /// `Ok(None)` for any non-success status: the artifact is not there yet.
    pub async fn fetch_screenshot(&self, client_id: &str) -> Result<Option<Bytes>, ApiError> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
            .to_string();
        let res = self
            .http
            .get(self.endpoint("/api/screenshot")?)
            .query(&[("clientId", client_id), ("ts", ts.as_str())])
            .send()
            .await?;
        if !res.status().is_success() {
            return Ok(None);
        }
        Ok(Some(res.bytes().await?))
    }
}
