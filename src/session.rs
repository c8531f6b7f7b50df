//! One WebSocket session against the target, including the dirty shutdown path.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::AuthToken;
use crate::config::{Limits, Timeouts};
use crate::connection::{Connection, Role, SessionState};
use crate::error::{Error, Result};
use crate::message::{ClientMessage, Message};
use crate::protocol::ClientHandshake;

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

/// Owns exactly one WebSocket connection over a raw `TcpStream`.
///
/// The session walks [`SessionState`] forward only. The one way out is
/// [`SessionClient::abrupt_terminate`], which resets the TCP connection
/// without a close frame. Dropping a session that still holds a socket
/// does the same.
pub struct SessionClient {
    url: Url,
    timeouts: Timeouts,
    limits: Limits,
    conn: Option<Connection<TcpStream>>,
    state: SessionState,
}

impl SessionClient {
    pub fn new(url: Url, timeouts: Timeouts, limits: Limits) -> Self {
        Self {
            url,
            timeouts,
            limits,
            conn: None,
            state: SessionState::Disconnected,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn require(&self, operation: &'static str, allowed: fn(&SessionState) -> bool) -> Result<()> {
        match self.state {
            SessionState::Terminated => Err(Error::Terminated),
            state if allowed(&state) => Ok(()),
            state => Err(Error::InvalidState { operation, state }),
        }
    }

    fn conn(&mut self) -> Result<&mut Connection<TcpStream>> {
        self.conn.as_mut().ok_or(Error::Terminated)
    }

    /// TCP connect plus upgrade handshake, each under its own deadline.
    ///
    /// # Errors
    ///
    /// - `Error::Timeout` if either step exceeds its deadline
    /// - `Error::Connect` if the endpoint refuses or the handshake is invalid
    pub async fn connect(&mut self) -> Result<()> {
        self.require("connect", |s| *s == SessionState::Disconnected)?;

        let endpoint = self.url.to_string();
        let host = self
            .url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl(format!("missing host in {}", endpoint)))?
            .to_string();
        let port = self.url.port_or_known_default().unwrap_or(80);
        let handshake = ClientHandshake::new(&self.url)?;

        let mut stream = timeout(self.timeouts.connect, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| Error::Timeout {
                operation: "connect",
                millis: millis(self.timeouts.connect),
            })?
            .map_err(|e| Error::Connect {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;

        let (_, leftover) = timeout(self.timeouts.handshake, handshake.perform(&mut stream, &self.limits))
            .await
            .map_err(|_| Error::Timeout {
                operation: "handshake",
                millis: millis(self.timeouts.handshake),
            })?
            .map_err(|e| Error::Connect {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        self.conn = Some(Connection::with_read_buf(
            stream,
            Role::Client,
            self.limits.clone(),
            leftover,
        ));
        self.state = SessionState::Connected;
        debug!(%endpoint, "connected");
        Ok(())
    }

    /// Send the auth envelope and wait for one reply.
    ///
    /// Any reply counts as success except the target's error envelope,
    /// which it sends for a bad token while keeping the socket open.
    ///
    /// # Errors
    ///
    /// `Error::Auth` on timeout, transport failure, a close frame in place
    /// of the reply, or an `{"type":"error"}` reply.
    pub async fn authenticate(&mut self, token: &AuthToken) -> Result<()> {
        self.require("authenticate", |s| *s == SessionState::Connected)?;

        let payload = ClientMessage::auth(token.as_str()).to_json()?;
        let deadline = self.timeouts.auth;
        let conn = self.conn()?;
        conn.send(Message::Text(payload))
            .await
            .map_err(|e| Error::Auth(format!("sending auth: {}", e)))?;

        let reply = timeout(deadline, next_data(conn))
            .await
            .map_err(|_| Error::Auth(format!("no reply within {} ms", millis(deadline))))?
            .map_err(|e| Error::Auth(e.to_string()))?;
        if let Some(reason) = rejection(&reply) {
            return Err(Error::Auth(reason));
        }

        debug!(reply = %reply.preview(100), "authenticated");
        self.state = SessionState::Authenticated;
        Ok(())
    }

    /// Send a subscribe envelope without waiting for an acknowledgment.
    pub async fn subscribe(&mut self, message: &ClientMessage) -> Result<()> {
        self.require("subscribe", |s| *s == SessionState::Authenticated)?;
        let payload = message.to_json()?;
        self.conn()?.send(Message::Text(payload)).await?;
        self.state = SessionState::Subscribed;
        debug!(url = %self.url, "subscribed");
        Ok(())
    }

    /// Serialize and send a client envelope.
    pub async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        self.send_raw(&message.to_json()?).await
    }

    /// Send an already-serialized text payload. No acknowledgment is expected.
    pub async fn send_raw(&mut self, payload: &str) -> Result<()> {
        self.require("send", SessionState::can_send)?;
        debug!(bytes = payload.len(), "send");
        self.conn()?.send(Message::text(payload)).await
    }

    /// Lazily receive up to `count` messages, each within `per_message`.
    ///
    /// # Errors
    ///
    /// Fails up front if the session holds no transport.
    pub fn drain(&mut self, count: usize, per_message: Duration) -> Result<Drain<'_>> {
        self.require("receive", SessionState::has_transport)?;
        Ok(Drain {
            session: self,
            remaining: count,
            per_message,
            finished: false,
        })
    }

    /// Collect everything [`SessionClient::drain`] yields.
    pub async fn drain_messages(&mut self, count: usize, per_message: Duration) -> Result<Vec<Message>> {
        let mut drain = self.drain(count, per_message)?;
        let mut messages = Vec::with_capacity(count);
        while let Some(message) = drain.next().await? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Reset the TCP connection without a close frame.
    ///
    /// `SO_LINGER` is set to zero so dropping the socket makes the kernel
    /// send RST instead of FIN. Never fails; calling it again or before
    /// `connect` just leaves the session `Terminated`.
    pub fn abrupt_terminate(&mut self) {
        if let Some(conn) = self.conn.take() {
            let stream = conn.into_inner();
            #[allow(deprecated)]
            let linger = stream.set_linger(Some(Duration::ZERO));
            if let Err(err) = linger {
                warn!(url = %self.url, error = %err, "could not zero SO_LINGER; socket will close with FIN");
            }
            drop(stream);
            info!(url = %self.url, from = %self.state, "connection forcefully terminated");
        }
        self.state = SessionState::Terminated;
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if self.conn.is_some() {
            self.abrupt_terminate();
        }
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("url", &self.url.as_str())
            .field("state", &self.state)
            .finish()
    }
}

/// Next text or binary message; pings and pongs are skipped.
async fn next_data(conn: &mut Connection<TcpStream>) -> Result<Message> {
    loop {
        match conn.recv().await? {
            Message::Ping(_) | Message::Pong(_) => continue,
            Message::Close(code) => return Err(Error::ConnectionClosed(code)),
            message => return Ok(message),
        }
    }
}

/// The reason in an `{"type":"error","error":...}` reply, if `reply` is one.
fn rejection(reply: &Message) -> Option<String> {
    let Message::Text(text) = reply else {
        return None;
    };
    let envelope: serde_json::Value = serde_json::from_str(text).ok()?;
    if envelope["type"] != "error" {
        return None;
    }
    let reason = envelope["error"].as_str().unwrap_or("authentication rejected");
    Some(reason.to_string())
}

/// Cursor over a bounded receive loop.
///
/// Ends after `count` messages, at the first per-message timeout, or at the
/// first error. It cannot be restarted.
pub struct Drain<'a> {
    session: &'a mut SessionClient,
    remaining: usize,
    per_message: Duration,
    finished: bool,
}

impl Drain<'_> {
    /// The next message, or `None` once the drain is over.
    ///
    /// # Errors
    ///
    /// Transport errors, including `Error::ConnectionClosed` for a close
    /// frame. The drain is finished after an error.
    pub async fn next(&mut self) -> Result<Option<Message>> {
        if self.finished || self.remaining == 0 {
            return Ok(None);
        }
        let conn = match self.session.conn() {
            Ok(conn) => conn,
            Err(err) => {
                self.finished = true;
                return Err(err);
            }
        };
        match timeout(self.per_message, next_data(conn)).await {
            Err(_) => {
                debug!(remaining = self.remaining, "receive timed out, drain ends");
                self.finished = true;
                Ok(None)
            }
            Ok(Ok(message)) => {
                self.remaining -= 1;
                Ok(Some(message))
            }
            Ok(Err(err)) => {
                self.finished = true;
                Err(err)
            }
        }
    }

    /// Receives still allowed.
    pub fn remaining(&self) -> usize {
        if self.finished { 0 } else { self.remaining }
    }
}
