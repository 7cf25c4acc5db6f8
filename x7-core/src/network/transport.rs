use std::time::Duration;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::codec::{CameraCodec, MAX_READ_SIZE, ReplyBatch};
use crate::error::X7Error;
use crate::message::Request;

/// Address of the camera's TCP API and its HTTP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraEndpoint {
    pub host: String,
    pub control_port: u16,
    pub http_port: u16,
}

impl Default for CameraEndpoint {
    fn default() -> Self {
        Self {
            host: "192.168.42.1".into(),
            control_port: 7878,
            http_port: 80,
        }
    }
}

impl CameraEndpoint {
    pub fn new(host: impl Into<String>, control_port: u16, http_port: u16) -> Self {
        Self {
            host: host.into(),
            control_port,
            http_port,
        }
    }

    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.host, self.control_port)
    }

    /// Base URL for the camera's HTTP endpoints, without trailing slash.
    pub fn http_base(&self) -> String {
        if self.http_port == 80 {
            format!("http://{}", self.host)
        } else {
            format!("http://{}:{}", self.host, self.http_port)
        }
    }
}

/// The single TCP socket to the camera.
///
/// Knows nothing about sessions: it writes one request and reads raw
/// reply batches. Serializing exchanges is the session's job.
#[derive(Debug)]
pub struct Transport {
    stream: Option<TcpStream>,
    codec: CameraCodec,
    read_timeout: Option<Duration>,
}

impl Transport {
    /// Open the socket, failing with [`X7Error::Connection`] after `timeout`.
    pub async fn connect(endpoint: &CameraEndpoint, timeout: Duration) -> Result<Self, X7Error> {
        let addr = endpoint.control_addr();
        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| X7Error::Connection(format!("connect to {addr} timed out after {timeout:?}")))?
            .map_err(|e| X7Error::Connection(format!("connect to {addr} failed: {e}")))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream: Some(stream),
            codec: CameraCodec,
            read_timeout: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Bound every following read. `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    pub async fn write(&mut self, bytes: &[u8]) -> Result<(), X7Error> {
        let stream = self.stream_mut()?;
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Read whatever the camera has sent, at most `max_bytes`.
    pub async fn read(&mut self, max_bytes: usize) -> Result<BytesMut, X7Error> {
        let timeout = self.read_timeout;
        let stream = self.stream_mut()?;

        let mut buf = BytesMut::zeroed(max_bytes);
        let n = match timeout {
            Some(limit) => tokio::time::timeout(limit, stream.read(&mut buf))
                .await
                .map_err(|_| X7Error::Timeout(limit))??,
            None => stream.read(&mut buf).await?,
        };
        if n == 0 {
            return Err(X7Error::Transport("connection closed by camera".into()));
        }
        buf.truncate(n);
        Ok(buf)
    }

    /// Encode and write one request.
    pub async fn send(&mut self, request: &Request) -> Result<(), X7Error> {
        let mut frame = BytesMut::new();
        self.codec.encode(request, &mut frame)?;
        debug!(target: "x7::net", "TCP RQ: {}", String::from_utf8_lossy(&frame));
        self.write(&frame).await
    }

    /// Read one chunk from the socket and split it into replies.
    pub async fn receive(&mut self) -> Result<ReplyBatch, X7Error> {
        let mut chunk = self.read(MAX_READ_SIZE).await?;
        debug!(target: "x7::net", "TCP RP: {}", String::from_utf8_lossy(&chunk));
        Ok(self.codec.decode(&mut chunk)?.unwrap_or_default())
    }

    /// Close the socket. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    fn stream_mut(&mut self) -> Result<&mut TcpStream, X7Error> {
        self.stream
            .as_mut()
            .ok_or_else(|| X7Error::Transport("socket does not exist".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use tokio::net::TcpListener;

    async fn pair() -> (Transport, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let endpoint = CameraEndpoint::new("127.0.0.1", port, 0);
        let (transport, accepted) = tokio::join!(
            Transport::connect(&endpoint, Duration::from_secs(2)),
            listener.accept()
        );
        (transport.unwrap(), accepted.unwrap().0)
    }

    #[test]
    fn default_endpoint() {
        let ep = CameraEndpoint::default();
        assert_eq!(ep.control_addr(), "192.168.42.1:7878");
        assert_eq!(ep.http_base(), "http://192.168.42.1");
        assert_eq!(
            CameraEndpoint::new("127.0.0.1", 1, 8080).http_base(),
            "http://127.0.0.1:8080"
        );
    }

    #[tokio::test]
    async fn send_and_receive() {
        let (mut transport, mut camera) = pair().await;

        transport
            .send(&Request::command(0, Command::SessionInit))
            .await
            .unwrap();
        let mut buf = [0u8; 128];
        let n = camera.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], br#"{"token":0,"msg_id":1,"param_size":0}"#);

        camera.write_all(b"{\"rval\":0,\"param\":[\"5\"]}\0").await.unwrap();
        let reply = transport.receive().await.unwrap().resolve().unwrap().unwrap();
        assert_eq!(reply.session_token().unwrap(), 5);
    }

    #[tokio::test]
    async fn read_timeout_is_honoured() {
        let (mut transport, _camera) = pair().await;
        transport.set_read_timeout(Some(Duration::from_millis(50)));
        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, X7Error::Timeout(_)));
    }

    #[tokio::test]
    async fn closed_by_peer() {
        let (mut transport, camera) = pair().await;
        drop(camera);
        assert!(transport.receive().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (mut transport, _camera) = pair().await;
        transport.close().await;
        transport.close().await;
        assert!(!transport.is_open());
        let err = transport.write(b"x").await.unwrap_err();
        assert!(err.to_string().contains("socket does not exist"));
    }

    #[tokio::test]
    async fn refused_connect_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = CameraEndpoint::new("127.0.0.1", port, 0);
        let err = Transport::connect(&endpoint, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, X7Error::Connection(_)));
    }
}
