use crate::transport::{CouchRequest, CouchResponse, CouchTransport, TransportError};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Url};
use std::time::Duration;
use tracing::{debug, trace};

/// `CouchTransport` over real HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base: Url,
    http_client: HttpClient,
    credentials: Option<(String, Option<String>)>,
}

impl HttpTransport {
    /// `base_url` is the server root, e.g. `http://localhost:5984`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidRequest(format!("{}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(TransportError::InvalidRequest(format!(
                "{} cannot be used as a base URL",
                base_url
            )));
        }
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            base,
            http_client,
            credentials: None,
        })
    }

    /// Basic auth on every request.
    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Some((user.into(), password));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Full URL for a request: escaped segments below the base, then the
    /// query string.
    pub fn url_for(&self, request: &CouchRequest) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                TransportError::InvalidRequest("base URL cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            path.extend(request.segments());
        }
        if !request.query_pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query_pairs());
        }
        Ok(url)
    }
}

#[async_trait]
impl CouchTransport for HttpTransport {
    async fn send(&self, request: CouchRequest) -> Result<CouchResponse, TransportError> {
        let url = self.url_for(&request)?;
        debug!("{} {}", request.method(), url);

        let mut builder = self
            .http_client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, password.as_ref());
        }
        if let Some(body) = request.body() {
            trace!("Request body:\n{}", String::from_utf8_lossy(body));
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_connect() {
                TransportError::Connection(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!("Response status: {} ({} bytes)", status, body.len());
        trace!("Response body:\n{}", String::from_utf8_lossy(&body));

        Ok(CouchResponse::new(status, headers, body))
    }
}
