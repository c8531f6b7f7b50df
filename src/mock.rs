//! In-memory stream for unit tests.

use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Replays `read_data` then reports EOF; records everything written.
pub(crate) struct MockStream {
    read_data: Cursor<Vec<u8>>,
    write_data: Vec<u8>,
}

impl MockStream {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            read_data: Cursor::new(data),
            write_data: Vec::new(),
        }
    }

    pub(crate) fn written(&self) -> &[u8] {
        &self.write_data
    }
}

impl AsyncRead for MockStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let pos = self.read_data.position() as usize;
        let data = self.read_data.get_ref();
        if pos >= data.len() {
            return Poll::Ready(Ok(()));
        }
        let remaining = &data[pos..];
        let to_copy = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..to_copy]);
        self.read_data.set_position((pos + to_copy) as u64);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
