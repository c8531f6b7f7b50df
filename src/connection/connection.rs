use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::WebSocketCodec;
use crate::config::Limits;
use crate::connection::Role;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::protocol::{Frame, OpCode};

/// Message-level view of an upgraded WebSocket stream.
///
/// `Connection` reassembles fragmented messages, answers pings, and surfaces
/// close frames as [`Message::Close`] without replying to them. It never
/// closes the stream on its own: dropping it, or taking the stream back with
/// [`Connection::into_inner`], is up to the owner.
///
/// ## Example
///
/// ```rust,ignore
/// let (_, leftover) = handshake.perform(&mut tcp, &limits).await?;
/// let mut conn = Connection::with_read_buf(tcp, Role::Client, limits, leftover);
/// conn.send(Message::text(r#"{"type":"ping"}"#)).await?;
/// let reply = conn.recv().await?;
/// ```
pub struct Connection<T> {
    codec: WebSocketCodec<T>,
    partial: Option<(OpCode, Vec<u8>)>,
    close_sent: bool,
}

impl<T> Connection<T> {
    /// Wrap a stream whose upgrade handshake has already completed.
    pub fn new(io: T, role: Role, limits: Limits) -> Self {
        Self::from_codec(WebSocketCodec::new(io, role, limits))
    }

    /// Like [`Connection::new`], seeding the read buffer with bytes that
    /// arrived alongside the handshake response.
    pub fn with_read_buf(io: T, role: Role, limits: Limits, read_buf: bytes::BytesMut) -> Self {
        Self::from_codec(WebSocketCodec::with_read_buf(io, role, limits, read_buf))
    }

    fn from_codec(codec: WebSocketCodec<T>) -> Self {
        Self {
            codec,
            partial: None,
            close_sent: false,
        }
    }

    /// The underlying stream.
    pub fn get_ref(&self) -> &T {
        self.codec.get_ref()
    }

    /// Give up the message layer and return the raw stream.
    pub fn into_inner(self) -> T {
        self.codec.into_inner()
    }

    /// Whether this side has sent a close frame.
    pub fn close_sent(&self) -> bool {
        self.close_sent
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> Connection<T> {
    /// Send a single-frame message and flush it.
    ///
    /// ## Errors
    ///
    /// - `Error::ConnectionClosed` after [`Connection::close`]
    /// - `Error::InvalidFrame` for [`Message::Close`]; use [`Connection::close`]
    /// - I/O errors from the underlying stream
    pub async fn send(&mut self, message: Message) -> Result<()> {
        if self.close_sent {
            return Err(Error::ConnectionClosed(None));
        }
        let frame = match message {
            Message::Text(text) => Frame::text(text),
            Message::Binary(data) => Frame::binary(data),
            Message::Ping(data) => Frame::ping(data),
            Message::Pong(data) => Frame::pong(data),
            Message::Close(_) => {
                return Err(Error::InvalidFrame(
                    "close frames are sent with Connection::close".into(),
                ));
            }
        };
        self.codec.write_frame(&frame).await?;
        self.codec.flush().await
    }

    /// Receive the next message.
    ///
    /// Pings are answered before being returned. A close frame is returned as
    /// [`Message::Close`] and is not answered.
    ///
    /// ## Errors
    ///
    /// - `Error::ConnectionClosed(None)` on EOF
    /// - Protocol errors (bad framing, UTF-8, oversized message)
    /// - I/O errors from the underlying stream
    pub async fn recv(&mut self) -> Result<Message> {
        loop {
            let frame = self.codec.read_frame().await?;
            match frame.opcode {
                OpCode::Ping => {
                    if !self.close_sent {
                        self.codec.write_frame(&Frame::pong(frame.payload())).await?;
                        self.codec.flush().await?;
                    }
                    return Ok(Message::Ping(frame.into_payload()));
                }
                OpCode::Pong => return Ok(Message::Pong(frame.into_payload())),
                OpCode::Close => return Ok(Message::Close(frame.close_code())),
                OpCode::Text | OpCode::Binary => {
                    if self.partial.is_some() {
                        return Err(Error::ProtocolViolation(
                            "new data frame inside a fragmented message".into(),
                        ));
                    }
                    let opcode = frame.opcode;
                    if frame.fin {
                        return into_message(opcode, frame.into_payload());
                    }
                    self.partial = Some((opcode, frame.into_payload()));
                }
                OpCode::Continuation => {
                    let fin = frame.fin;
                    let (opcode, mut data) = self.partial.take().ok_or_else(|| {
                        Error::ProtocolViolation("continuation without a started message".into())
                    })?;
                    data.extend_from_slice(frame.payload());
                    self.codec.limits().check_message_size(data.len())?;
                    if fin {
                        return into_message(opcode, data);
                    }
                    self.partial = Some((opcode, data));
                }
            }
        }
    }

    /// Start a graceful close by sending a close frame.
    ///
    /// The harness never calls this on its own sessions; it exists for the
    /// server side of test fixtures.
    pub async fn close(&mut self, code: u16, reason: &str) -> Result<()> {
        if self.close_sent {
            return Ok(());
        }
        self.close_sent = true;
        self.codec.write_frame(&Frame::close(Some(code), reason)).await?;
        self.codec.flush().await
    }
}

fn into_message(opcode: OpCode, payload: Vec<u8>) -> Result<Message> {
    match opcode {
        OpCode::Text => String::from_utf8(payload)
            .map(Message::Text)
            .map_err(|_| Error::InvalidUtf8),
        _ => Ok(Message::Binary(payload)),
    }
}
