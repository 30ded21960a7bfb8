use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{DeskError, Result};

/// Text frames of one open realtime connection. The stream ends when the
/// server closes the socket.
pub type FrameStream = BoxStream<'static, Result<String>>;

/// Opens a realtime connection to a fully built URL (ticket included).
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<FrameStream>;
}

/// [`RealtimeConnector`] over `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl RealtimeConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| DeskError::Network(format!("websocket connect failed: {}", e)))?;

        // Only inbound text matters; tungstenite answers pings itself.
        let (_sink, stream) = socket.split();
        let frames = stream
            .take_while(|message| futures::future::ready(!matches!(message, Ok(Message::Close(_)))))
            .filter_map(|message| async move {
                match message {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(DeskError::Network(e.to_string()))),
                }
            });
        Ok(frames.boxed())
    }
}
