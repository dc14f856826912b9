use fastwebsockets::{FragmentCollector, Frame, OpCode, Payload};
use http_body_util::Empty;
use hyper::body::Bytes;
use hyper::upgrade::Upgraded;
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, rustls::ClientConfig};
use url::Url;

/// One live WebSocket connection: TLS-wrapped TCP with the HTTP upgrade
/// already performed. Owned by exactly one task; all sends and receives go
/// through `&mut self`.
pub struct WsStream {
    ws: FragmentCollector<TokioIo<Upgraded>>,
}

/// Dials `url`, runs the TLS and WebSocket handshakes, and returns the open
/// stream. No frames have been exchanged beyond the upgrade.
pub async fn connect(url: &str) -> Result<WsStream, WsError> {
    let url_parsed = Url::parse(url)?;
    let host = url_parsed.host_str().ok_or(WsError::MissingHost)?;

    let port = url_parsed.port_or_known_default().unwrap_or(443);
    let addr = format!("{}:{}", host, port);

    let tcp_stream = TcpStream::connect(&addr).await?;

    let root_store = tokio_rustls::rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let connector = TlsConnector::from(Arc::new(config));
    let domain = tokio_rustls::rustls::pki_types::ServerName::try_from(host.to_string())
        .map_err(|e| WsError::InvalidDns(e.to_string()))?;

    let tls_stream = connector.connect(domain, tcp_stream).await?;

    let req = hyper::Request::builder()
        .uri(url)
        .header("Host", host)
        .header("Upgrade", "websocket")
        .header("Connection", "Upgrade")
        .header(
            "Sec-WebSocket-Key",
            fastwebsockets::handshake::generate_key(),
        )
        .header("Sec-WebSocket-Version", "13")
        .body(Empty::<Bytes>::new())?;

    let executor = TokioExecutor::new();
    let (ws, _) = fastwebsockets::handshake::client(&executor, req, tls_stream)
        .await
        .map_err(|e| WsError::Handshake(format!("{:?}", e)))?;

    Ok(WsStream {
        ws: FragmentCollector::new(ws),
    })
}

impl WsStream {
    /// Sends one JSON text frame.
    pub async fn send_json(&mut self, value: &serde_json::Value) -> Result<(), WsError> {
        let payload = serde_json::to_vec(value)?;
        self.ws
            .write_frame(Frame::text(Payload::Owned(payload)))
            .await?;
        Ok(())
    }

    /// Liveness ping for idle connections.
    pub async fn send_ping(&mut self) -> Result<(), WsError> {
        self.ws
            .write_frame(Frame::new(
                true,
                OpCode::Ping,
                None,
                Payload::Borrowed(b"keepalive"),
            ))
            .await?;
        Ok(())
    }

    /// One blocking receive. `Ok(Some(bytes))` is a complete text or binary
    /// frame; `Ok(None)` means the peer sent a close frame. Control frames
    /// are consumed here and never surface.
    pub async fn receive(&mut self) -> Result<Option<Vec<u8>>, WsError> {
        loop {
            let frame = self.ws.read_frame().await?;
            match frame.opcode {
                OpCode::Text | OpCode::Binary => {
                    let payload = match frame.payload {
                        Payload::Owned(data) => data,
                        Payload::Borrowed(data) => data.to_vec(),
                        Payload::BorrowedMut(data) => data.to_vec(),
                        Payload::Bytes(data) => data.into(),
                    };
                    return Ok(Some(payload));
                }
                OpCode::Close => return Ok(None),
                _ => {}
            }
        }
    }

    /// Best-effort close handshake; an already-closed connection is not an
    /// error here.
    pub async fn close(&mut self) {
        let _ = self.ws.write_frame(Frame::close(1000, b"")).await;
    }
}

#[derive(Debug, Error)]
pub enum WsError {
    #[error("invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] tokio_rustls::rustls::Error),
    #[error("invalid DNS name: {0}")]
    InvalidDns(String),
    #[error("HTTP error: {0}")]
    Http(#[from] http::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] fastwebsockets::WebSocketError),
    #[error("frame encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no host in URL")]
    MissingHost,
    #[error("handshake failed: {0}")]
    Handshake(String),
}
