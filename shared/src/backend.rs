//! Request construction and response decoding for the hosted backend's REST
//! surface (row API under `/rest/v1`, object storage under `/storage/v1`).
//!
//! The actual I/O goes through `crux_http`; this module only knows how URLs,
//! headers and bodies look and how to turn responses into domain values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{BackendConfig, ConfigError};
use crate::model::Session;
use crate::storage::MediaUrlResolver;
use crate::{AppError, AppResult, ErrorKind};

pub type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

/// A row query against one table, rendered as PostgREST query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowQuery {
    table: &'static str,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
}

impl RowQuery {
    #[must_use]
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = columns.into();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filters.push((column.into(), format!("eq.{value}")));
        self
    }

    #[must_use]
    pub fn order_asc(mut self, column: &str) -> Self {
        self.order = Some(format!("{column}.asc"));
        self
    }
}

#[derive(Serialize)]
struct RemoveObjects<'a> {
    prefixes: &'a [String],
}

#[derive(Clone)]
pub struct Backend {
    project_url: Url,
    anon_key: String,
    map_base_url: Url,
    resolver: MediaUrlResolver,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("project_url", &self.project_url.as_str())
            .field("bucket", &self.resolver.bucket())
            .finish_non_exhaustive()
    }
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let project_url = config.project_url()?;
        Ok(Self {
            resolver: MediaUrlResolver::new(project_url.clone(), config.storage_bucket.trim()),
            project_url,
            anon_key: config.anon_key.clone(),
            map_base_url: config.map_base_url()?,
        })
    }

    #[must_use]
    pub fn resolver(&self) -> &MediaUrlResolver {
        &self.resolver
    }

    #[must_use]
    pub fn map_base_url(&self) -> &Url {
        &self.map_base_url
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.project_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    #[instrument(level = "debug", skip(self), fields(table = query.table))]
    #[must_use]
    pub fn rows_url(&self, query: &RowQuery) -> String {
        let mut url = self.endpoint(["rest", "v1", query.table]);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", &query.select);
            for (column, filter) in &query.filters {
                pairs.append_pair(column, filter);
            }
            if let Some(order) = &query.order {
                pairs.append_pair("order", order);
            }
        }
        debug!(url = %url, "built row query");
        url.to_string()
    }

    #[must_use]
    pub fn bucket_url(&self) -> String {
        self.endpoint(["storage", "v1", "object", self.resolver.bucket()])
            .to_string()
    }

    /// `apikey` plus a bearer token: the viewer's access token when signed in,
    /// the anon key otherwise.
    #[must_use]
    pub fn auth_headers(&self, session: &Session) -> [(&'static str, String); 2] {
        let bearer = session.access_token.as_deref().unwrap_or(&self.anon_key);
        [
            ("apikey", self.anon_key.clone()),
            ("Authorization", format!("Bearer {bearer}")),
        ]
    }

    pub fn remove_objects_body(keys: &[String]) -> AppResult<Vec<u8>> {
        serde_json::to_vec(&RemoveObjects { prefixes: keys }).map_err(|e| {
            AppError::new(ErrorKind::Internal, "Could not encode storage request")
                .with_internal(e.to_string())
        })
    }
}

fn transport_error(error: &impl fmt::Display) -> AppError {
    AppError::new(ErrorKind::Network, "Network error").with_internal(error.to_string())
}

/// Unwraps a transport result into the raw body of a 2xx response.
pub fn success_body(result: HttpResult) -> AppResult<Vec<u8>> {
    let mut response = result.map_err(|e| transport_error(&e))?;
    let status = u16::from(response.status());
    let body = response.take_body().unwrap_or_default();

    if (200..300).contains(&status) {
        Ok(body)
    } else {
        warn!(status, "backend request failed");
        Err(AppError::from_http_status(status, Some(&body)))
    }
}

pub fn expect_success(result: HttpResult) -> AppResult<()> {
    success_body(result).map(|_| ())
}

pub fn decode_rows<T: DeserializeOwned>(result: HttpResult) -> AppResult<Vec<T>> {
    let body = success_body(result)?;
    parse_rows(&body)
}

pub fn decode_first<T: DeserializeOwned>(result: HttpResult) -> AppResult<Option<T>> {
    decode_rows(result).map(|rows| rows.into_iter().next())
}

/// Like [`decode_first`], but an empty result is a `NotFound` error.
pub fn decode_single<T: DeserializeOwned>(result: HttpResult, what: &str) -> AppResult<T> {
    decode_first(result)?
        .ok_or_else(|| AppError::new(ErrorKind::NotFound, format!("{what} not found")))
}

pub fn parse_rows<T: DeserializeOwned>(body: &[u8]) -> AppResult<Vec<T>> {
    serde_json::from_slice(body).map_err(|e| {
        AppError::new(ErrorKind::Deserialization, "Unexpected response from server")
            .with_internal(e.to_string())
    })
}
