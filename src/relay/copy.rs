//! Shared copy primitives
//!
//! A directional copy loop and the race-and-join helper both relay
//! strategies are built on. Every chunk handed out by a read is forwarded
//! with a cancellation-immune write and flush before the loop honors any
//! cancel or complete flag, so bytes already accepted by a loop are never
//! dropped at a pause boundary.

use log::debug;
use tokio::task::JoinHandle;

use crate::common::{RelayError, Result};
use crate::pipe::{PipeReader, PipeWriter};

use super::CancelScope;

/// Forward chunks from `src` to `dst` until cancellation or completion.
/// Returns the number of bytes moved.
pub(crate) async fn copy_pipe(src: &PipeReader, dst: &PipeWriter, scope: &CancelScope) -> u64 {
    let immune = CancelScope::never();
    let mut total = 0u64;

    loop {
        let read = src.read(scope).await;
        if !read.data.is_empty() {
            let len = read.data.len();
            let write = dst.write(&read.data);
            src.advance(len);
            if write.is_completed {
                break;
            }
            let flush = dst.flush(&immune).await;
            total += len as u64;
            if flush.is_completed {
                break;
            }
        }
        if read.is_canceled || read.is_completed {
            break;
        }
    }

    debug!("pipe copy finished, {} bytes total", total);
    total
}

/// Race two directional loops against the composed cancellation signal.
///
/// As soon as either loop finishes or the scope fires, `cancel_reads` is
/// invoked to unblock the opposite direction's pending read, then both
/// loops are joined before the cycle is declared complete. A panicked loop
/// surfaces as an error so the orchestrator can escalate.
pub(crate) async fn race_pair<A, B>(
    mut a: JoinHandle<A>,
    mut b: JoinHandle<B>,
    scope: &CancelScope,
    cancel_reads: impl FnOnce(),
) -> Result<(A, B)>
where
    A: Send + 'static,
    B: Send + 'static,
{
    let mut first_a = None;
    let mut first_b = None;
    tokio::select! {
        result = &mut a => first_a = Some(result),
        result = &mut b => first_b = Some(result),
        _ = scope.cancelled() => {}
    }

    cancel_reads();

    let result_a = match first_a {
        Some(result) => result,
        None => a.await,
    };
    let result_b = match first_b {
        Some(result) => result,
        None => b.await,
    };

    let a = result_a.map_err(|e| RelayError::Other(format!("relay copy task failed: {e}")))?;
    let b = result_b.map_err(|e| RelayError::Other(format!("relay copy task failed: {e}")))?;
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::pipe;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_copy_pipe_moves_bytes_until_completion() {
        let (src_writer, src_reader) = pipe(1024);
        let (dst_writer, dst_reader) = pipe(1024);
        let scope = CancelScope::never();

        src_writer.write(b"one");
        src_writer.flush(&scope).await;
        src_writer.write(b"two");
        src_writer.complete();

        let moved = copy_pipe(&src_reader, &dst_writer, &scope).await;
        assert_eq!(moved, 6);

        let read = dst_reader.read(&scope).await;
        assert_eq!(&read.data[..], b"onetwo");
    }

    #[tokio::test]
    async fn test_copy_pipe_forwards_chunk_received_with_cancellation() {
        let (src_writer, src_reader) = pipe(1024);
        let (dst_writer, dst_reader) = pipe(1024);
        let token = CancellationToken::new();
        let scope = CancelScope::single(&token);

        src_writer.write(b"in-flight");
        src_writer.flush(&CancelScope::never()).await;
        src_reader.cancel_pending_read();

        let moved = copy_pipe(&src_reader, &dst_writer, &scope).await;
        assert_eq!(moved, 9, "buffered bytes must survive the cancellation");
        assert_eq!(&dst_reader.try_read().data[..], b"in-flight");
    }

    #[tokio::test]
    async fn test_race_pair_cancels_opposite_read() {
        let (_writer_a, reader_a) = pipe(1024);
        let (writer_b, reader_b) = pipe(1024);
        let (sink_writer, _sink_reader) = pipe(1024);
        let scope = CancelScope::never();

        // Direction B ends immediately; direction A would hang on its read.
        writer_b.complete();
        let a = tokio::spawn({
            let reader = reader_a.clone();
            let sink = sink_writer.clone();
            let scope = scope.clone();
            async move { copy_pipe(&reader, &sink, &scope).await }
        });
        let b = tokio::spawn({
            let reader = reader_b.clone();
            let sink = sink_writer.clone();
            let scope = scope.clone();
            async move { copy_pipe(&reader, &sink, &scope).await }
        });

        let joined = tokio::time::timeout(
            Duration::from_secs(5),
            race_pair(a, b, &scope, || {
                reader_a.cancel_pending_read();
                reader_b.cancel_pending_read();
            }),
        )
        .await
        .expect("race must not hang")
        .unwrap();
        assert_eq!(joined, (0, 0));
    }
}
