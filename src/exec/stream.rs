// src/exec/stream.rs

//! Copying child output through a [`StreamTransform`].

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::monitor::StreamTransform;

/// How long a partial line may sit in a transform before it is flushed.
pub const IDLE_FLUSH: Duration = Duration::from_millis(50);

const CHUNK: usize = 8 * 1024;

/// Statistics for one pumped stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub write_failed: bool,
}

/// Pump `reader` into `writer` until EOF.
///
/// Output is written (and flushed) as soon as the transform releases it. A
/// partial line is released after [`IDLE_FLUSH`] without new input, so
/// prompts show up even though transforms are line buffered. If the writer
/// fails, the reader is still drained to EOF so the child never blocks on a
/// full pipe.
pub async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    mut transform: Box<dyn StreamTransform>,
) -> PumpStats
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = PumpStats::default();
    let mut buf = vec![0u8; CHUNK];

    loop {
        let read = if transform.has_pending() {
            match tokio::time::timeout(IDLE_FLUSH, reader.read(&mut buf)).await {
                Ok(read) => read,
                Err(_) => {
                    let out = transform.flush();
                    write_out(&mut writer, &out, &mut stats).await;
                    continue;
                }
            }
        } else {
            reader.read(&mut buf).await
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                stats.bytes_read += n as u64;
                let out = transform.transform(&buf[..n]);
                write_out(&mut writer, &out, &mut stats).await;
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "reading child output failed");
                break;
            }
        }
    }

    let tail = transform.flush();
    write_out(&mut writer, &tail, &mut stats).await;
    if !stats.write_failed {
        let _ = writer.flush().await;
    }
    debug!(read = stats.bytes_read, written = stats.bytes_written, "stream drained");
    stats
}

async fn write_out<W>(writer: &mut W, bytes: &[u8], stats: &mut PumpStats)
where
    W: AsyncWrite + Unpin,
{
    if bytes.is_empty() || stats.write_failed {
        return;
    }
    let result = match writer.write_all(bytes).await {
        Ok(()) => writer.flush().await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => stats.bytes_written += bytes.len() as u64,
        Err(e) => {
            warn!(error = %e, "writing child output failed; discarding the rest");
            stats.write_failed = true;
        }
    }
}
