use std::io;

use cas_crypto::ContentHasher;
use cas_types::ContentAddress;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Chunk size for streaming copies and verification reads.
pub const COPY_CHUNK: usize = 64 * 1024;

/// Copy `reader` into `writer`, hashing every byte on the way through.
///
/// Only one chunk is held in memory at a time. Returns the address of the
/// copied content and the number of bytes written. The writer is flushed but
/// not synced.
pub async fn copy_hashed<R, W>(reader: &mut R, writer: &mut W) -> io::Result<(ContentAddress, u64)>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut hasher = ContentHasher::new();
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut written = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n]).await?;
        written += n as u64;
    }
    writer.flush().await?;
    Ok((hasher.finalize(), written))
}

/// Hash everything `reader` yields without keeping it.
pub async fn digest_stream<R>(reader: &mut R) -> io::Result<(ContentAddress, u64)>
where
    R: AsyncRead + Unpin + ?Sized,
{
    copy_hashed(reader, &mut tokio::io::sink()).await
}
