use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::{AudioConfig, StreamConfig};
use crate::protocol::{StartMessage, StreamingResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("recognizer API key not set (expected in ${0})")]
    MissingApiKey(String),

    #[error("invalid recognizer credentials or endpoint: {0}")]
    InvalidRequest(String),

    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed response from recognizer: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("recognizer closed the stream abnormally: {0}")]
    Closed(String),
}

/// Opens the bidirectional stream to the recognition service
///
/// The wire protocol is one JSON start frame carrying the recognition
/// config, binary LINEAR16 frames upstream after that, and JSON result
/// frames downstream until the service closes.
pub struct RecognizerClient;

impl RecognizerClient {
    /// Connects, authenticates, and sends the stream start message
    ///
    /// Returns the two halves of the stream so the send and receive loops
    /// can run as independent tasks.
    pub async fn connect(
        stream_config: &StreamConfig,
        audio_config: &AudioConfig,
    ) -> Result<(AudioSink, ResponseStream), StreamError> {
        let api_key = std::env::var(&stream_config.api_key_env)
            .map_err(|_| StreamError::MissingApiKey(stream_config.api_key_env.clone()))?;

        let mut request = stream_config.endpoint.as_str().into_client_request()?;
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| StreamError::InvalidRequest(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        tracing::debug!("Connecting to recognizer at {}", stream_config.endpoint);
        let (ws_stream, _response) = connect_async(request).await?;
        let (mut writer, reader) = ws_stream.split();

        let start = StartMessage::new(stream_config, audio_config);
        let json = serde_json::to_string(&start)?;
        writer.send(Message::Text(json.into())).await?;

        Ok((AudioSink { writer }, ResponseStream { reader }))
    }
}

/// Write half of the stream; carries only binary audio frames
#[derive(Debug)]
pub struct AudioSink {
    writer: SplitSink<WsStream, Message>,
}

impl AudioSink {
    pub async fn send_audio(&mut self, pcm: &[u8]) -> Result<(), StreamError> {
        self.writer
            .send(Message::Binary(pcm.to_vec().into()))
            .await?;
        Ok(())
    }

    /// Tells the service no more audio is coming
    pub async fn finish(mut self) -> Result<(), StreamError> {
        self.writer
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "end of audio".into(),
            })))
            .await?;
        Ok(())
    }
}

/// Read half of the stream; yields parsed responses until end-of-stream
#[derive(Debug)]
pub struct ResponseStream {
    reader: SplitStream<WsStream>,
}

impl ResponseStream {
    /// Reads the next response frame
    ///
    /// Returns `Ok(None)` when the service ends the stream normally. Any
    /// transport error, abnormal close, or unparseable frame is an error;
    /// the caller treats all of them as fatal.
    pub async fn next_response(&mut self) -> Result<Option<StreamingResponse>, StreamError> {
        while let Some(message) = self.reader.next().await {
            match message? {
                Message::Text(text) => {
                    let response: StreamingResponse = serde_json::from_str(text.as_str())?;
                    return Ok(Some(response));
                }
                Message::Close(frame) => {
                    return match frame {
                        Some(frame) if frame.code != CloseCode::Normal => Err(
                            StreamError::Closed(format!("{} ({})", frame.reason, frame.code)),
                        ),
                        _ => Ok(None),
                    };
                }
                Message::Ping(_) | Message::Pong(_) => continue,
                Message::Binary(_) => {
                    tracing::debug!("Ignoring unexpected binary frame from recognizer");
                    continue;
                }
                _ => continue,
            }
        }
        Ok(None)
    }
}
