//! Client side of the HTTP Upgrade handshake (RFC 6455 Section 4).

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::BytesMut;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::config::Limits;
use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use ws_resilience::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// assert_eq!(compute_accept_key(key), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Fresh base64-encoded 16-byte nonce for Sec-WebSocket-Key.
pub fn generate_key() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| Error::InvalidHandshake(format!("no entropy for key: {}", e)))?;
    Ok(BASE64.encode(nonce))
}

/// Upgrade request for one WebSocket URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHandshake {
    /// `host[:port]` as sent in the Host header.
    pub host: String,
    /// Path and query.
    pub resource: String,
    /// Sec-WebSocket-Key sent with the request.
    pub key: String,
}

impl ClientHandshake {
    /// Build a request for a `ws://` URL with a random key.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` for non-`ws` schemes or URLs without a host.
    pub fn new(url: &Url) -> Result<Self> {
        Self::with_key(url, generate_key()?)
    }

    /// Build a request with a caller-chosen key.
    pub fn with_key(url: &Url, key: String) -> Result<Self> {
        if url.scheme() != "ws" {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                url
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("missing host in {}", url)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        let resource = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        Ok(Self {
            host,
            resource,
            key,
        })
    }

    /// Serialize the HTTP/1.1 upgrade request.
    #[must_use]
    pub fn request_bytes(&self) -> Vec<u8> {
        format!(
            "GET {} HTTP/1.1\r\n\
             Host: {}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n",
            self.resource, self.host, self.key
        )
        .into_bytes()
    }

    /// Send the request and read the response from `io`.
    ///
    /// Returns the parsed response plus any bytes the server sent after the
    /// header block, which belong to the first frames.
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeTooLarge` if headers exceed `limits.max_handshake_size`
    /// - `Error::ConnectionClosed` if the peer hangs up mid-response
    /// - `Error::InvalidHandshake` for a non-101 status or wrong accept key
    pub async fn perform<T>(&self, io: &mut T, limits: &Limits) -> Result<(HandshakeResponse, BytesMut)>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        io.write_all(&self.request_bytes()).await?;
        io.flush().await?;

        let mut buf = BytesMut::with_capacity(1024);
        let header_end = loop {
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
            limits.check_handshake_size(buf.len())?;
            if io.read_buf(&mut buf).await? == 0 {
                return Err(Error::ConnectionClosed(None));
            }
        };
        limits.check_handshake_size(header_end)?;

        let leftover = buf.split_off(header_end);
        let response = HandshakeResponse::parse(&buf)?;
        response.verify(&self.key)?;
        Ok((response, leftover))
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

/// Lower-cased header name to trimmed value; the first blank line ends the block.
fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
    lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
        .collect()
}

/// WebSocket handshake response from server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
    /// The selected Sec-WebSocket-Protocol (optional).
    pub protocol: Option<String>,
}

impl HandshakeResponse {
    /// Parse a WebSocket handshake response from raw HTTP data.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if:
    /// - The data is not valid UTF-8.
    /// - The status is not `101`.
    /// - `Upgrade`, `Connection` or `Sec-WebSocket-Accept` is missing or wrong.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;
        let mut lines = text.lines();

        let status_line = lines
            .next()
            .ok_or_else(|| Error::InvalidHandshake("Empty response".into()))?;
        let mut status = status_line.split_whitespace();
        let version = status.next().unwrap_or_default();
        let code = status.next().unwrap_or_default();
        if !version.starts_with("HTTP/1.") || code != "101" {
            return Err(Error::InvalidHandshake(format!(
                "Expected 101 status, got: {}",
                status_line
            )));
        }

        let headers = parse_headers(lines);

        let upgrade = headers
            .get("upgrade")
            .ok_or_else(|| Error::InvalidHandshake("Missing Upgrade header in response".into()))?;
        if !upgrade.eq_ignore_ascii_case("websocket") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Upgrade header: {}",
                upgrade
            )));
        }

        let connection = headers.get("connection").ok_or_else(|| {
            Error::InvalidHandshake("Missing Connection header in response".into())
        })?;
        if !connection.to_lowercase().contains("upgrade") {
            return Err(Error::InvalidHandshake(format!(
                "Invalid Connection header: {}",
                connection
            )));
        }

        let accept = headers
            .get("sec-websocket-accept")
            .ok_or_else(|| Error::InvalidHandshake("Missing Sec-WebSocket-Accept header".into()))?
            .clone();

        Ok(Self {
            accept,
            protocol: headers.get("sec-websocket-protocol").cloned(),
        })
    }

    /// Check the accept value against the key that was sent.
    pub fn verify(&self, key: &str) -> Result<()> {
        if self.accept != compute_accept_key(key) {
            return Err(Error::InvalidHandshake(
                "Invalid Sec-WebSocket-Accept".into(),
            ));
        }
        Ok(())
    }
}
