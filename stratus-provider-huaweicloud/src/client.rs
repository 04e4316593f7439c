//! HTTP request executor for Huawei Cloud service APIs
//!
//! A [`ServiceClient`] knows the service endpoint, the project and the
//! credentials, and performs one request/response cycle per call.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use stratus_core::waiter::StatusCheckError;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::response::flatten_response;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder pattern is valid"));

/// Errors from a single API call
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Resource not found: {method} {url}")]
    NotFound { method: Method, url: String },

    #[error(
        "{method} {url} returned {status}: {}",
        error_msg.as_deref().unwrap_or(body.as_str())
    )]
    Status {
        method: Method,
        url: String,
        status: u16,
        error_code: Option<String>,
        error_msg: Option<String>,
        body: String,
    },

    #[error("{method} {url} failed: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unable to find '{field}' in the response from {url}")]
    MissingField { field: String, url: String },

    #[error("Unresolved parameter '{name}' in URL template '{template}'")]
    UnresolvedParameter { name: String, template: String },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

impl StatusCheckError for ClientError {
    fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound { .. })
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

/// HTTP methods used by the service APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Options of one request
#[derive(Debug, Clone, Default)]
pub struct RequestOpts {
    pub body: Option<serde_json::Value>,
    pub query: Vec<(String, String)>,
    /// Accepted status codes; any 2xx when empty
    pub ok_codes: Vec<u16>,
}

impl RequestOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_ok_codes(mut self, codes: &[u16]) -> Self {
        self.ok_codes = codes.to_vec();
        self
    }

    fn accepts(&self, status: StatusCode) -> bool {
        if self.ok_codes.is_empty() {
            status.is_success()
        } else {
            self.ok_codes.contains(&status.as_u16())
        }
    }
}

/// Client for one service endpoint within one project
#[derive(Clone)]
pub struct ServiceClient {
    http: Client,
    endpoint: String,
    project_id: String,
    auth_token: String,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ServiceClient {
    /// Create a client for the SWR endpoint of `config`
    pub fn new(config: &ProviderConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            http,
            endpoint: config.swr_endpoint.clone(),
            project_id: config.project_id.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Build a full URL from a path template such as `v2/{project_id}/jobs/{job_id}`
    ///
    /// `{project_id}` is always filled in; every other placeholder must be
    /// supplied in `params`. Values are percent-encoded as single path
    /// segments and are never scanned for placeholders themselves.
    pub fn url(&self, template: &str, params: &[(&str, &str)]) -> ClientResult<String> {
        let mut unresolved: Option<String> = None;
        let path = PLACEHOLDER.replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            let value = if name == "project_id" {
                Some(self.project_id.as_str())
            } else {
                params.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
            };
            match value {
                Some(value) => urlencoding::encode(value).into_owned(),
                None => {
                    unresolved.get_or_insert_with(|| name.to_string());
                    caps[0].to_string()
                }
            }
        });

        if let Some(name) = unresolved {
            return Err(ClientError::UnresolvedParameter {
                name,
                template: template.to_string(),
            });
        }

        Ok(format!("{}{}", self.endpoint, path))
    }

    /// Perform a request and return the flattened JSON body
    ///
    /// An empty body is returned as `Value::Null`. A 404 becomes
    /// [`ClientError::NotFound`] unless 404 is listed in `ok_codes`.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        opts: RequestOpts,
    ) -> ClientResult<serde_json::Value> {
        log::debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method.into(), url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header("X-Auth-Token", &self.auth_token);
        if !opts.query.is_empty() {
            builder = builder.query(&opts.query);
        }
        if let Some(body) = &opts.body {
            builder = builder.json(body);
        }

        let transport = |source| ClientError::Transport {
            method,
            url: url.to_string(),
            source,
        };
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !opts.accepts(status) {
            if status == StatusCode::NOT_FOUND {
                log::debug!("{} {} returned 404", method, url);
                return Err(ClientError::NotFound {
                    method,
                    url: url.to_string(),
                });
            }
            log::warn!("{} {} returned {}", method, url, status);
            let (error_code, error_msg) = extract_error(&text);
            return Err(ClientError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                error_code,
                error_msg,
                body: text,
            });
        }

        flatten_response(url, &text)
    }

    pub async fn get(&self, url: &str) -> ClientResult<serde_json::Value> {
        self.request(Method::Get, url, RequestOpts::new()).await
    }
}

/// Pull the vendor error code and message out of an error body
///
/// Services disagree on the casing of these fields.
fn extract_error(body: &str) -> (Option<String>, Option<String>) {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return (None, None);
    };
    let field = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| json.get(*name).and_then(|v| v.as_str()))
            .map(str::to_string)
    };
    (
        field(&["error_code", "errorCode", "code"]),
        field(&["error_msg", "errorMessage", "message"]),
    )
}
