use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Limits;
use crate::connection::Role;
use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameHeader};

const READ_CHUNK: usize = 4096;

/// Seed for the mask stream; falls back to the clock if the OS has no entropy.
fn random_mask_seed() -> u32 {
    let mut buf = [0u8; 4];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u32::from_le_bytes(buf),
        Err(_) => std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ d.as_secs() as u32)
            .unwrap_or(0x2545_F491),
    }
}

/// Frame-level reader/writer over a raw byte stream.
pub struct WebSocketCodec<T> {
    io: T,
    read_buf: BytesMut,
    write_buf: Vec<u8>,
    role: Role,
    limits: Limits,
    mask_counter: u32,
}

impl<T> WebSocketCodec<T> {
    #[must_use]
    pub fn new(io: T, role: Role, limits: Limits) -> Self {
        Self::with_read_buf(io, role, limits, BytesMut::with_capacity(READ_CHUNK))
    }

    /// Start with bytes already pulled off the stream, e.g. frames that
    /// arrived in the same read as the handshake response.
    #[must_use]
    pub fn with_read_buf(io: T, role: Role, limits: Limits, read_buf: BytesMut) -> Self {
        Self {
            io,
            read_buf,
            write_buf: Vec::with_capacity(256),
            role,
            limits,
            mask_counter: random_mask_seed(),
        }
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    #[must_use]
    pub fn get_ref(&self) -> &T {
        &self.io
    }

    #[must_use]
    pub fn into_inner(self) -> T {
        self.io
    }

    fn generate_mask(&mut self) -> [u8; 4] {
        self.mask_counter = self.mask_counter.wrapping_add(0x9E37_79B9);
        let mut x = self.mask_counter;
        x = (x ^ (x >> 16)).wrapping_mul(0x85EB_CA6B);
        x = (x ^ (x >> 13)).wrapping_mul(0xC2B2_AE35);
        (x ^ (x >> 16)).to_le_bytes()
    }

    fn check_header(&self, header: &FrameHeader) -> Result<()> {
        match (self.role.expects_masked(), header.mask.is_some()) {
            (true, false) => return Err(Error::UnmaskedClientFrame),
            (false, true) => return Err(Error::MaskedServerFrame),
            _ => {}
        }
        self.limits.check_frame_size(header.payload_len)
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin> WebSocketCodec<T> {
    /// Read the next complete frame.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed(None)` on EOF
    /// - masking, size and structural violations from the peer
    /// - I/O errors from the underlying stream
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match FrameHeader::parse(&self.read_buf) {
                Ok(header) => {
                    self.check_header(&header)?;
                    match Frame::parse(&self.read_buf) {
                        Ok((frame, consumed)) => {
                            self.read_buf.advance(consumed);
                            frame.validate()?;
                            return Ok(frame);
                        }
                        Err(Error::IncompleteFrame { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                Err(Error::IncompleteFrame { .. }) => {}
                Err(e) => return Err(e),
            }

            self.read_buf.reserve(READ_CHUNK);
            if self.io.read_buf(&mut self.read_buf).await? == 0 {
                return Err(Error::ConnectionClosed(None));
            }
        }
    }

    /// Serialize and write one frame, masking it if this end is a client.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let mask = self.role.must_mask().then(|| self.generate_mask());
        self.write_buf.clear();
        frame.write(&mut self.write_buf, mask);
        self.io.write_all(&self.write_buf).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.io.flush().await?;
        Ok(())
    }
}
