use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

use cas_types::{ContentAddress, ObjectMetadata};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, ReadBuf, SeekFrom};

use crate::error::{StoreError, StoreResult};
use crate::stream::digest_stream;

/// Readable, seekable object body.
///
/// Blanket-implemented for anything that is `AsyncRead + AsyncSeek`, such as
/// `tokio::fs::File` or `std::io::Cursor<Bytes>`.
pub trait ObjectBody: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> ObjectBody for T {}

/// An opened object.
///
/// Exposes the size and modification time the boundary layer needs for
/// conditional and range requests, and reads/seeks through the underlying
/// body. Opening never re-hashes; call [`verify`](Self::verify) for that.
pub struct ObjectHandle {
    address: ContentAddress,
    len: u64,
    modified: SystemTime,
    body: Box<dyn ObjectBody>,
}

impl ObjectHandle {
    pub fn new(
        address: ContentAddress,
        len: u64,
        modified: SystemTime,
        body: impl ObjectBody + 'static,
    ) -> Self {
        Self {
            address,
            len,
            modified,
            body: Box::new(body),
        }
    }

    /// The address this handle was opened under.
    pub fn address(&self) -> ContentAddress {
        self.address
    }

    /// Object size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Last modification time of the stored object.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn metadata(&self) -> ObjectMetadata {
        ObjectMetadata::new(self.address, self.len)
    }

    /// Re-hash the whole object and compare against its address.
    ///
    /// Reads from offset 0 regardless of the current position and rewinds to
    /// offset 0 afterwards, so the verified bytes can be served from the same
    /// handle. O(object size).
    pub async fn verify(&mut self) -> StoreResult<()> {
        self.body.seek(SeekFrom::Start(0)).await?;
        let (computed, _) = digest_stream(&mut self.body).await?;
        self.body.seek(SeekFrom::Start(0)).await?;
        if computed != self.address {
            return Err(StoreError::Corrupt {
                address: self.address,
                computed,
            });
        }
        Ok(())
    }

    /// Read the remainder of the object into memory.
    pub async fn read_to_vec(&mut self) -> StoreResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.len as usize);
        self.body.read_to_end(&mut out).await?;
        Ok(out)
    }
}

impl AsyncRead for ObjectHandle {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut *self.get_mut().body).poll_read(cx, buf)
    }
}

impl AsyncSeek for ObjectHandle {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        Pin::new(&mut *self.get_mut().body).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut *self.get_mut().body).poll_complete(cx)
    }
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("address", &self.address)
            .field("len", &self.len)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}
