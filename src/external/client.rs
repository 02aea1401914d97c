//! Throttled HTTP client for upstream sources.
//!
//! Every outbound request goes through the shared [`Throttler`]: the target
//! host is checked before the request is sent, and every response is
//! inspected for throttling signals. Redirects are never followed — the
//! throttler has to see Douban's 302-to-challenge responses.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Proxy, Response, Url, redirect};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};
use crate::external::throttler::Throttler;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.3";

pub struct SourceClient {
    client: Client,
    base_url: Option<Url>,
    throttler: Arc<Throttler>,
}

pub struct SourceClientBuilder {
    throttler: Arc<Throttler>,
    base_url: Option<String>,
    timeout: Duration,
    proxy: Option<String>,
    dbcl2_cookie: Option<String>,
    headers: HeaderMap,
}

impl SourceClient {
    pub fn builder(throttler: Arc<Throttler>) -> SourceClientBuilder {
        SourceClientBuilder {
            throttler,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
            dbcl2_cookie: None,
            headers: HeaderMap::new(),
        }
    }

    /// Performs a throttled GET and returns the raw response. The status is
    /// not checked; callers that care about specific statuses (e.g. the
    /// idatabase 404-means-not-found rule) inspect it themselves.
    pub async fn get(&self, path_or_url: &str) -> AppResult<Response> {
        let url = self.resolve(path_or_url)?;
        let host = url.host_str().unwrap_or_default().to_string();
        self.throttler.before_request(&host)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AppError::UpstreamTransport {
                url: url.to_string(),
                source: e,
            })?;
        self.throttler
            .on_response(&host, response.status(), response.headers())?;
        Ok(response)
    }

    /// Throttled GET, decoded as JSON. Any non-2xx status is an error.
    pub async fn get_json<T: DeserializeOwned>(&self, path_or_url: &str) -> AppResult<T> {
        let response = self.get_success(path_or_url).await?;
        let url = response.url().to_string();
        response
            .json()
            .await
            .map_err(|e| AppError::UpstreamTransport { url, source: e })
    }

    /// Throttled GET, returned as text. Any non-2xx status is an error.
    pub async fn get_text(&self, path_or_url: &str) -> AppResult<String> {
        let response = self.get_success(path_or_url).await?;
        let url = response.url().to_string();
        response
            .text()
            .await
            .map_err(|e| AppError::UpstreamTransport { url, source: e })
    }

    /// Throttled POST with a JSON body; only success statuses are accepted.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path_or_url: &str,
        body: &B,
    ) -> AppResult<()> {
        let url = self.resolve(path_or_url)?;
        let host = url.host_str().unwrap_or_default().to_string();
        self.throttler.before_request(&host)?;
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::UpstreamTransport {
                url: url.to_string(),
                source: e,
            })?;
        self.throttler
            .on_response(&host, response.status(), response.headers())?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn get_success(&self, path_or_url: &str) -> AppResult<Response> {
        let response = self.get(path_or_url).await?;
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let headers = format!("{:?}", response.headers());
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%url, %headers, %body, "Upstream returned an error status");
            return Err(AppError::UpstreamStatus {
                url,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn resolve(&self, path_or_url: &str) -> AppResult<Url> {
        let result = match &self.base_url {
            Some(base) => base.join(path_or_url.trim_start_matches('/')),
            None => Url::parse(path_or_url),
        };
        result.map_err(|e| AppError::UpstreamPayload {
            url: path_or_url.to_string(),
            message: format!("invalid request URL: {e}"),
        })
    }
}

impl SourceClientBuilder {
    /// Base URL that relative request paths are joined onto.
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> AppResult<Self> {
        let value = HeaderValue::from_str(value).map_err(|e| AppError::Configuration {
            key: name.to_string(),
            message: e.to_string(),
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub fn proxy(mut self, proxy: Option<&str>) -> Self {
        self.proxy = proxy.map(str::to_string);
        self
    }

    /// Douban `dbcl2` session cookie, applied to all `.douban.com` hosts.
    pub fn douban_cookie(mut self, dbcl2: Option<&str>) -> Self {
        self.dbcl2_cookie = dbcl2.map(str::to_string);
        self
    }

    pub fn build(self) -> AppResult<SourceClient> {
        let base_url = match self.base_url {
            // A trailing slash keeps Url::join from replacing the last path
            // segment of the base.
            Some(raw) => {
                let normalized = if raw.ends_with('/') {
                    raw
                } else {
                    format!("{raw}/")
                };
                Some(
                    Url::parse(&normalized).map_err(|e| AppError::Configuration {
                        key: "base_url".to_string(),
                        message: format!("{normalized}: {e}"),
                    })?,
                )
            }
            None => None,
        };

        let mut builder = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(redirect::Policy::none())
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .zstd(true)
            .use_rustls_tls()
            .user_agent(USER_AGENT)
            .default_headers(self.headers);

        if let Some(ref proxy) = self.proxy {
            let proxy = Proxy::all(proxy).map_err(|e| AppError::Configuration {
                key: "proxy_address".to_string(),
                message: format!("{proxy}: {e}"),
            })?;
            builder = builder.proxy(proxy);
        }

        if let Some(ref dbcl2) = self.dbcl2_cookie {
            let jar = Jar::default();
            let anchor: Url =
                "https://www.douban.com/"
                    .parse()
                    .map_err(|e| AppError::Configuration {
                        key: "cookie_dbcl2".to_string(),
                        message: format!("{e}"),
                    })?;
            jar.add_cookie_str(&format!("dbcl2={dbcl2}; Domain=.douban.com; Path=/"), &anchor);
            builder = builder.cookie_provider(Arc::new(jar));
        }

        let client = builder.build().map_err(|e| AppError::Configuration {
            key: "http_client".to_string(),
            message: e.to_string(),
        })?;

        Ok(SourceClient {
            client,
            base_url,
            throttler: self.throttler,
        })
    }
}
