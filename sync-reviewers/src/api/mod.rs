mod read;
pub(crate) mod url;
mod write;

use crate::config::ServerConfig;
use crate::errors::Failure;
use crate::utils::ResponseExt;
use anyhow::Context;
use log::{debug, trace};
use reqwest::{
    Method, StatusCode, Url,
    blocking::{Client, ClientBuilder, RequestBuilder},
    header::{self, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use read::{BitbucketApiRead, BitbucketRead};
pub use url::{ApiPrefix, ApiUrl};
pub use write::{BitbucketApiWrite, BitbucketWrite};

/// Page size asked for on every read. Nothing is paginated past it.
pub(crate) const PAGE_LIMIT: &str = "1000";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Anti-CSRF header, writes are refused without it.
const ATLASSIAN_TOKEN: &str = "x-atlassian-token";

/// Authenticated access to the REST API of one server.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    username: String,
    password: SecretString,
}

impl HttpClient {
    pub fn new(config: &ServerConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::default();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static(crate::USER_AGENT),
        );

        let client = ClientBuilder::default()
            .default_headers(headers)
            .timeout(None)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn req(&self, method: Method, url: &ApiUrl) -> RequestBuilder {
        trace!("http request: {} {}", method, url);
        self.client
            .request(method, url.as_str())
            .header(ATLASSIAN_TOKEN, "no-check")
            .basic_auth(&self.username, Some(self.password.expose_secret()))
    }

    fn get_request(&self, url: &ApiUrl, query: &[(&str, &str)]) -> RequestBuilder {
        self.req(Method::GET, url)
            .query(query)
            .query(&[("limit", PAGE_LIMIT)])
    }

    pub(crate) fn get<T: DeserializeOwned>(
        &self,
        url: &ApiUrl,
        query: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        self.get_request(url, query)
            .send()
            .with_context(|| format!("failed to send GET request to '{url}'"))?
            .custom_error_for_status()
            .with_context(|| format!("GET request to '{url}' failed"))?
            .json_annotated()
            .with_context(|| format!("Failed to decode response body on GET request to '{url}'"))
    }

    pub(crate) fn put<T: serde::Serialize + std::fmt::Debug>(
        &self,
        url: &ApiUrl,
        body: &T,
    ) -> anyhow::Result<()> {
        trace!("http body: {:?}", body);
        self.put_request(url, body)
            .send()
            .with_context(|| format!("failed to send PUT request to '{url}'"))?
            .custom_error_for_status()
            .with_context(|| format!("PUT request to '{url}' failed"))?;
        Ok(())
    }

    fn put_request<T: serde::Serialize>(&self, url: &ApiUrl, body: &T) -> RequestBuilder {
        self.req(Method::PUT, url).json(body)
    }
}

/// Check that the server answers a plain HEAD request with a 200.
pub fn ping(base_url: &Url) -> Result<(), Failure> {
    let display_url = base_url.as_str().trim_end_matches('/').to_string();
    let unreachable = |status| Failure::ServerUnreachable {
        url: display_url.clone(),
        status,
    };

    let client = ClientBuilder::default()
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(crate::USER_AGENT)
        .build()
        .map_err(|e| {
            debug!("failed to build the http client: {e}");
            unreachable(None)
        })?;

    trace!("http request: HEAD {}", base_url);
    match client.head(base_url.as_str()).send() {
        Ok(resp) if resp.status() == StatusCode::OK => Ok(()),
        Ok(resp) => Err(unreachable(Some(resp.status().as_u16()))),
        Err(e) => {
            debug!("HEAD {} failed: {}", base_url, e);
            Err(unreachable(None))
        }
    }
}
