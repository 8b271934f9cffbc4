//! Control channel transports

use crate::protocol::{ClientMessage, ServerMessage};
use aiyview_core::{AiyViewError, AiyViewResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

/// Bidirectional channel carrying signaling messages
#[async_trait]
pub trait ControlChannel: Send {
    /// Send one message
    async fn send(&mut self, message: &ClientMessage) -> AiyViewResult<()>;

    /// Wait for the next message.
    ///
    /// `None` means the channel is closed. A frame that cannot be parsed is
    /// returned as an error and the channel stays usable.
    async fn recv(&mut self) -> Option<AiyViewResult<ServerMessage>>;

    /// Close the channel
    async fn close(&mut self) -> AiyViewResult<()>;

    /// Whether messages can still be sent
    fn is_open(&self) -> bool;
}

type WebSocketConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Control channel over a WebSocket connection to the uv4l server
pub struct WebSocketChannel {
    url: String,
    stream: WebSocketConnection,
    open: bool,
}

impl WebSocketChannel {
    /// Connect to a signaling endpoint such as `ws://raspberrypi.local:9080/stream/webrtc`
    pub async fn connect(url: &str) -> AiyViewResult<Self> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| AiyViewError::Transport {
                reason: format!("failed to connect to {}: {}", url, e),
            })?;

        info!(
            "Control channel open to {} (HTTP {})",
            url,
            response.status()
        );

        Ok(Self {
            url: url.to_string(),
            stream,
            open: true,
        })
    }

    /// Endpoint this channel is connected to
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ControlChannel for WebSocketChannel {
    async fn send(&mut self, message: &ClientMessage) -> AiyViewResult<()> {
        if !self.open {
            return Err(AiyViewError::ControlChannelClosed);
        }

        let json = message.to_json()?;
        debug!("Sending {} message: {}", message.what(), json);
        self.stream
            .send(Message::Text(json))
            .await
            .map_err(|e| AiyViewError::Transport {
                reason: format!("failed to send {} message: {}", message.what(), e),
            })
    }

    async fn recv(&mut self) -> Option<AiyViewResult<ServerMessage>> {
        if !self.open {
            return None;
        }

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    debug!("Incoming message: {}", text);
                    return Some(ServerMessage::parse(&text));
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("Control channel closed by server: {:?}", frame);
                    self.open = false;
                    return None;
                }
                Some(Ok(Message::Binary(data))) => {
                    warn!("Ignoring {} byte binary frame", data.len());
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    self.open = false;
                    return Some(Err(AiyViewError::Transport {
                        reason: format!("control channel error: {}", e),
                    }));
                }
                None => {
                    self.open = false;
                    return None;
                }
            }
        }
    }

    async fn close(&mut self) -> AiyViewResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.stream
            .close(None)
            .await
            .map_err(|e| AiyViewError::Transport {
                reason: format!("failed to close control channel: {}", e),
            })
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
