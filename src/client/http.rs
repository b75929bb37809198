//! HTTP transport: one pooled `reqwest` client per chain

use crate::client::{RetransmissionObserver, Security, Transport, TransportBuilder};
use crate::common::ClientId;
use crate::config::{Config, HttpMethod};
use crate::errors::{ErrorContext, Result};
use crate::message::{Outcome, Request, Response};

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

/// Request id header, lets the target correlate retransmitted attempts
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Settings shared by every HTTP transport of a run
#[derive(Debug)]
struct HttpSettings {
    url: Url,
    method: reqwest::Method,
    has_body: bool,
    headers: HeaderMap,
    ack_timeout: Duration,
    max_retransmit: u32,
    insecure: bool,
}

/// Builds plain (`http`) or secure (`https`) transports
pub struct HttpTransportBuilder {
    security: Security,
    settings: Arc<HttpSettings>,
}

impl HttpTransportBuilder {
    pub fn new(config: &Config, security: Security) -> Result<Self> {
        let url = Url::parse(&config.target.url)?;

        let mut headers = HeaderMap::new();
        for (key, value) in config.custom_headers()? {
            let header_name: HeaderName = key
                .parse()
                .with_config_context(&format!("Invalid header name: {}", key))?;
            let header_value: HeaderValue = value
                .parse()
                .with_config_context(&format!("Invalid header value: {}", value))?;
            headers.insert(header_name, header_value);
        }

        let method = match config.transport.http_method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        Ok(Self {
            security,
            settings: Arc::new(HttpSettings {
                url,
                method,
                has_body: config.transport.http_method.has_body(),
                headers,
                ack_timeout: config.transport.ack_timeout,
                max_retransmit: config.transport.max_retransmit,
                insecure: config.target.insecure,
            }),
        })
    }
}

impl TransportBuilder for HttpTransportBuilder {
    fn build(&self, client_id: ClientId) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(HttpTransport {
            client_id,
            security: self.security,
            settings: Arc::clone(&self.settings),
            client: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }))
    }

    fn security(&self) -> Security {
        self.security
    }
}

/// HTTP connection of a single chain
pub struct HttpTransport {
    client_id: ClientId,
    security: Security,
    settings: Arc<HttpSettings>,
    client: Mutex<Option<reqwest::Client>>,
    stopped: AtomicBool,
}

impl HttpTransport {
    fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(1)
            .default_headers(self.settings.headers.clone());

        if self.security == Security::Secure {
            builder = builder
                .https_only(true)
                .danger_accept_invalid_certs(self.settings.insecure);
        }

        builder
            .build()
            .with_transport_context("Failed to create HTTP client")
    }

    async fn attempt(
        &self,
        client: &reqwest::Client,
        request: &Request,
        timeout: Duration,
    ) -> std::result::Result<Response, reqwest::Error> {
        let mut builder = client
            .request(self.settings.method.clone(), self.settings.url.clone())
            .timeout(timeout)
            .header(REQUEST_ID_HEADER, request.id.as_ref());

        if self.settings.has_body {
            builder = builder
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(request.payload.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(Response::new(status, body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn start(&self) -> Result<()> {
        let client = self.build_client()?;
        *self.client.lock().await = Some(client);
        debug!("Client {} bound HTTP transport", self.client_id);
        Ok(())
    }

    async fn exchange(&self, request: Request, observer: &dyn RetransmissionObserver) -> Outcome {
        if self.stopped.load(Ordering::Acquire) {
            return Outcome::NoResponse;
        }
        let Some(client) = self.client.lock().await.clone() else {
            return Outcome::NoResponse;
        };

        let mut timeout = self.settings.ack_timeout;
        for attempt in 0..=self.settings.max_retransmit {
            if attempt > 0 {
                observer.on_retransmission();
            }

            match self.attempt(&client, &request, timeout).await {
                Ok(response) => return Outcome::Response(response),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    debug!(
                        "Client {} request {} attempt {} unanswered: {}",
                        self.client_id,
                        request.id,
                        attempt + 1,
                        e
                    );
                    if e.is_connect() && attempt < self.settings.max_retransmit {
                        // Refused connections fail at once; wait out the attempt window
                        tokio::time::sleep(timeout).await;
                    }
                    timeout = timeout.saturating_mul(2);
                }
                Err(e) => {
                    warn!("Client {} HTTP request failed: {}", self.client_id, e);
                    return Outcome::NoResponse;
                }
            }
        }

        Outcome::NoResponse
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    async fn destroy(&self) {
        if self.client.lock().await.take().is_some() {
            debug!("Client {} released HTTP transport", self.client_id);
        }
    }
}
