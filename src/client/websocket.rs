//! WebSocket transport: requests are JSON text frames answered by an echo carrying
//! the same id

use crate::client::{RetransmissionObserver, Security, Transport, TransportBuilder};
use crate::common::ClientId;
use crate::config::Config;
use crate::errors::{ErrorContext, Result, VolleyError};
use crate::message::{MessageId, Outcome, Request, Response};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use http::{HeaderName, HeaderValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async_with_config, tungstenite::Message,
    tungstenite::client::IntoClientRequest, tungstenite::protocol::WebSocketConfig,
};
use tracing::{debug, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Status reported for a matching echo
const ECHO_STATUS: u16 = 200;

#[derive(Debug)]
struct WsSettings {
    url: Url,
    headers: Vec<(HeaderName, HeaderValue)>,
    ack_timeout: Duration,
    max_retransmit: u32,
}

/// Builds plain (`ws`) or secure (`wss`) transports
pub struct WebSocketTransportBuilder {
    security: Security,
    settings: Arc<WsSettings>,
}

impl WebSocketTransportBuilder {
    pub fn new(config: &Config, security: Security) -> Result<Self> {
        let url = Url::parse(&config.target.url)?;

        let mut headers = Vec::new();
        for (key, value) in config.custom_headers()? {
            let header_name: HeaderName = key
                .parse()
                .with_config_context(&format!("Invalid header name: {}", key))?;
            let header_value: HeaderValue = value
                .parse()
                .with_config_context(&format!("Invalid header value: {}", value))?;
            headers.push((header_name, header_value));
        }

        if security == Security::Secure && config.target.insecure {
            warn!("--insecure is not applied to wss targets, certificates are verified");
        }

        Ok(Self {
            security,
            settings: Arc::new(WsSettings {
                url,
                headers,
                ack_timeout: config.transport.ack_timeout,
                max_retransmit: config.transport.max_retransmit,
            }),
        })
    }
}

impl TransportBuilder for WebSocketTransportBuilder {
    fn build(&self, client_id: ClientId) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(WebSocketTransport {
            client_id,
            settings: Arc::clone(&self.settings),
            stream: Mutex::new(None),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }))
    }

    fn security(&self) -> Security {
        self.security
    }
}

/// WebSocket connection of a single chain, opened on the first exchange
pub struct WebSocketTransport {
    client_id: ClientId,
    settings: Arc<WsSettings>,
    stream: Mutex<Option<WsStream>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl WebSocketTransport {
    async fn connect(&self) -> Result<WsStream> {
        let url = &self.settings.url;
        let mut request = url
            .as_str()
            .into_client_request()
            .with_transport_context(&format!("Failed to create WebSocket request for {}", url))?;
        for (name, value) in &self.settings.headers {
            request.headers_mut().insert(name.clone(), value.clone());
        }

        let connecting =
            connect_async_with_config(request, Some(WebSocketConfig::default()), true);
        let (ws_stream, _response) = tokio::time::timeout(self.settings.ack_timeout, connecting)
            .await
            .with_transport_context(&format!("Connecting to {}", url))??;

        debug!("Client {} connected to {}", self.client_id, url);
        Ok(ws_stream)
    }

    /// Read frames until the echo of `id` arrives
    async fn await_echo(stream: &mut WsStream, id: &MessageId) -> Result<String> {
        while let Some(message) = stream.next().await {
            match message? {
                Message::Text(text) => {
                    if MessageId::extract(text.as_str()).is_ok_and(|echo| &echo == id) {
                        return Ok(text.to_string());
                    }
                }
                Message::Close(_) => {
                    return Err(VolleyError::transport("Connection closed by peer"));
                }
                _ => {
                    // Binary, ping and pong frames carry no echo
                }
            }
        }
        Err(VolleyError::transport("WebSocket stream ended"))
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    async fn exchange(&self, request: Request, observer: &dyn RetransmissionObserver) -> Outcome {
        if !self.started.load(Ordering::Acquire) || self.stopped.load(Ordering::Acquire) {
            return Outcome::NoResponse;
        }

        let frame = match request.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Client {} could not encode request: {}", self.client_id, e);
                return Outcome::NoResponse;
            }
        };

        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            match self.connect().await {
                Ok(ws_stream) => *guard = Some(ws_stream),
                Err(e) => {
                    warn!("Client {} {}", self.client_id, e);
                    return Outcome::NoResponse;
                }
            }
        }
        let Some(stream) = guard.as_mut() else {
            return Outcome::NoResponse;
        };

        let mut timeout = self.settings.ack_timeout;
        for attempt in 0..=self.settings.max_retransmit {
            if attempt > 0 {
                observer.on_retransmission();
            }

            if let Err(e) = stream.send(Message::Text(frame.clone().into())).await {
                warn!("Client {} failed to send frame: {}", self.client_id, e);
                *guard = None;
                return Outcome::NoResponse;
            }

            match tokio::time::timeout(timeout, Self::await_echo(stream, &request.id)).await {
                Ok(Ok(body)) => return Outcome::Response(Response::new(ECHO_STATUS, body)),
                Ok(Err(e)) => {
                    warn!("Client {} lost connection: {}", self.client_id, e);
                    *guard = None;
                    return Outcome::NoResponse;
                }
                Err(_) => {
                    debug!(
                        "Client {} request {} attempt {} unanswered",
                        self.client_id,
                        request.id,
                        attempt + 1
                    );
                    timeout = timeout.saturating_mul(2);
                }
            }
        }

        Outcome::NoResponse
    }

    async fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    async fn destroy(&self) {
        let taken = self.stream.lock().await.take();
        if let Some(mut ws_stream) = taken {
            let _ = ws_stream.close(None).await;
            debug!("Client {} closed WebSocket transport", self.client_id);
        }
    }
}
