//! Websocket connector used by the terminal client.

use super::connection::{ClientError, Connector, Link};
use crate::protocol::PLAYER_COOKIE;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, instrument, warn};

/// Connects to the game server's websocket endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    /// Creates a connector for `url` (e.g. `ws://127.0.0.1:8080/ws`).
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Link = WsLink;

    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self, identity: &str) -> Result<WsLink, ClientError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| ClientError::new(format!("Invalid server URL: {}", e)))?;
        let cookie = HeaderValue::from_str(&format!("{}={}", PLAYER_COOKIE, identity))
            .map_err(|e| ClientError::new(format!("Invalid identity token: {}", e)))?;
        request.headers_mut().insert(header::COOKIE, cookie);

        let (stream, response) = connect_async(request)
            .await
            .map_err(|e| ClientError::new(format!("Websocket connect failed: {}", e)))?;
        info!(status = %response.status(), "Websocket established");

        Ok(WsLink { stream })
    }
}

/// An open websocket.
pub struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_string())),
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(frame) => warn!(
                            code = u16::from(frame.code),
                            reason = frame.reason.as_str(),
                            "Server closed connection"
                        ),
                        None => info!("Server closed connection"),
                    }
                    return None;
                }
                Ok(other) => debug!(?other, "Ignoring non-text frame"),
                Err(e) => {
                    return Some(Err(ClientError::new(format!("Websocket read failed: {}", e))));
                }
            }
        }
    }

    async fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| ClientError::new(format!("Websocket write failed: {}", e)))
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "Close handshake failed");
        }
    }
}
