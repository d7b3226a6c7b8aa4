//! In-memory duplex pipe
//!
//! A backpressure-aware byte channel with an independent read side and write
//! side. Reads are cooperatively cancellable without consuming data: a read
//! hands out a view of the buffered bytes and nothing is consumed until
//! [`PipeReader::advance`] is called, so dropping or cancelling a pending
//! read never loses data. Each side can be marked permanently complete.
//!
//! The relay sits between two of these pipes: a socket-side pipe carrying
//! transport bytes and a connection-side pipe feeding the command processor.
//! One reader and one writer per direction; the handles are cheap clones of
//! shared state, but concurrent reads on the same side are not supported.

mod stream;

pub use stream::PipeStream;

use std::future::poll_fn;
use std::io;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::ReadBuf;

use crate::relay::CancelScope;

/// Outcome of a pipe read.
#[derive(Debug, Clone)]
pub struct PipeRead {
    /// View of the currently buffered bytes; consume with [`PipeReader::advance`].
    pub data: Bytes,
    /// The read was cancelled, either by [`PipeReader::cancel_pending_read`]
    /// or by the cancellation scope it was issued under.
    pub is_canceled: bool,
    /// The write side has completed; no further data will arrive.
    pub is_completed: bool,
}

/// Outcome of a pipe write.
#[derive(Debug, Clone, Copy)]
pub struct PipeWrite {
    /// The read side has completed; the bytes will never be observed.
    pub is_completed: bool,
}

/// Outcome of a pipe flush.
#[derive(Debug, Clone, Copy)]
pub struct PipeFlush {
    /// The flush was cancelled by its scope before backpressure cleared.
    pub is_canceled: bool,
    /// The read side has completed.
    pub is_completed: bool,
}

#[derive(Debug)]
struct State {
    /// Flushed bytes, visible to the reader.
    readable: BytesMut,
    /// Written bytes awaiting a flush.
    staged: BytesMut,
    /// Backpressure threshold on the readable backlog.
    capacity: usize,
    writer_done: bool,
    reader_done: bool,
    /// One-shot flag set by `cancel_pending_read`, consumed by the next read.
    cancel_requested: bool,
    read_waker: Option<Waker>,
    write_waker: Option<Waker>,
}

impl State {
    fn wake_reader(&mut self) {
        if let Some(waker) = self.read_waker.take() {
            waker.wake();
        }
    }

    fn wake_writer(&mut self) {
        if let Some(waker) = self.write_waker.take() {
            waker.wake();
        }
    }

    fn publish_staged(&mut self) {
        if !self.staged.is_empty() {
            let staged = self.staged.split();
            self.readable.extend_from_slice(&staged);
            self.wake_reader();
        }
    }

    fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(&self.readable)
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn poll_read(&self, cx: &mut Context<'_>) -> Poll<PipeRead> {
        let mut st = self.state.lock().unwrap();
        if st.cancel_requested {
            st.cancel_requested = false;
            return Poll::Ready(PipeRead {
                data: st.snapshot(),
                is_canceled: true,
                is_completed: st.writer_done,
            });
        }
        if !st.readable.is_empty() || st.writer_done {
            return Poll::Ready(PipeRead {
                data: st.snapshot(),
                is_canceled: false,
                is_completed: st.writer_done,
            });
        }
        st.read_waker = Some(cx.waker().clone());
        Poll::Pending
    }

    fn poll_flush(&self, cx: &mut Context<'_>) -> Poll<PipeFlush> {
        let mut st = self.state.lock().unwrap();
        st.publish_staged();
        if st.reader_done {
            return Poll::Ready(PipeFlush {
                is_canceled: false,
                is_completed: true,
            });
        }
        if st.readable.len() <= st.capacity {
            return Poll::Ready(PipeFlush {
                is_canceled: false,
                is_completed: false,
            });
        }
        st.write_waker = Some(cx.waker().clone());
        Poll::Pending
    }

    // Stream-shaped accessors used by `PipeStream`.

    fn poll_stream_read(&self, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let mut st = self.state.lock().unwrap();
        if st.cancel_requested {
            st.cancel_requested = false;
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "pipe read cancelled",
            )));
        }
        if !st.readable.is_empty() {
            let n = buf.remaining().min(st.readable.len());
            buf.put_slice(&st.readable[..n]);
            st.readable.advance(n);
            st.wake_writer();
            return Poll::Ready(Ok(()));
        }
        if st.writer_done {
            return Poll::Ready(Ok(())); // EOF
        }
        st.read_waker = Some(cx.waker().clone());
        Poll::Pending
    }

    fn poll_stream_write(&self, cx: &mut Context<'_>, data: &[u8]) -> Poll<io::Result<usize>> {
        let mut st = self.state.lock().unwrap();
        if st.reader_done || st.writer_done {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "pipe closed",
            )));
        }
        if st.readable.len() >= st.capacity {
            st.write_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        st.readable.extend_from_slice(data);
        st.wake_reader();
        Poll::Ready(Ok(data.len()))
    }
}

/// Read end of one pipe direction.
#[derive(Debug, Clone)]
pub struct PipeReader {
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Suspend until data is available, the writer completed, the pending
    /// read is cancelled, or `scope` fires. Data that is already buffered is
    /// returned even alongside a cancellation, and stays buffered until
    /// [`advance`](Self::advance) consumes it.
    pub async fn read(&self, scope: &CancelScope) -> PipeRead {
        tokio::select! {
            biased;
            read = poll_fn(|cx| self.shared.poll_read(cx)) => read,
            _ = scope.cancelled() => {
                let st = self.shared.state.lock().unwrap();
                PipeRead {
                    data: st.snapshot(),
                    is_canceled: true,
                    is_completed: st.writer_done,
                }
            }
        }
    }

    /// Non-suspending snapshot of whatever is currently buffered.
    pub fn try_read(&self) -> PipeRead {
        let st = self.shared.state.lock().unwrap();
        PipeRead {
            data: st.snapshot(),
            is_canceled: false,
            is_completed: st.writer_done,
        }
    }

    /// Consume `n` bytes from the front of the buffer, freeing capacity.
    pub fn advance(&self, n: usize) {
        let mut st = self.shared.state.lock().unwrap();
        let n = n.min(st.readable.len());
        st.readable.advance(n);
        st.wake_writer();
    }

    /// One-shot: wake the pending (or next) read with `is_canceled` set.
    pub fn cancel_pending_read(&self) {
        let mut st = self.shared.state.lock().unwrap();
        st.cancel_requested = true;
        st.wake_reader();
    }

    /// Drop an unconsumed cancel request. A cycle wind-down cancels both
    /// pipes' pending reads; whichever loop had already exited leaves the
    /// flag set, and it must not spill into the next cycle's first read.
    pub fn clear_pending_cancel(&self) {
        self.shared.state.lock().unwrap().cancel_requested = false;
    }

    /// Mark the read side permanently done. Idempotent. Writer flushes
    /// observe `is_completed` from then on.
    pub fn complete(&self) {
        let mut st = self.shared.state.lock().unwrap();
        st.reader_done = true;
        st.wake_writer();
    }

    /// Whether the opposite write side has completed.
    pub fn is_completed(&self) -> bool {
        self.shared.state.lock().unwrap().writer_done
    }

    pub(crate) fn poll_stream_read(
        &self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.shared.poll_stream_read(cx, buf)
    }
}

/// Write end of one pipe direction.
#[derive(Debug, Clone)]
pub struct PipeWriter {
    shared: Arc<Shared>,
}

impl PipeWriter {
    /// Stage bytes for the reader. Synchronous; bytes become visible on the
    /// next [`flush`](Self::flush). Staging never suspends, which is what
    /// makes a cancellation-immune forward of already-read bytes possible.
    pub fn write(&self, data: &[u8]) -> PipeWrite {
        let mut st = self.shared.state.lock().unwrap();
        if st.reader_done || st.writer_done {
            return PipeWrite { is_completed: true };
        }
        st.staged.extend_from_slice(data);
        PipeWrite { is_completed: false }
    }

    /// Publish staged bytes, then suspend while the readable backlog exceeds
    /// capacity. The publish happens even if `scope` has already fired.
    pub async fn flush(&self, scope: &CancelScope) -> PipeFlush {
        tokio::select! {
            biased;
            flush = poll_fn(|cx| self.shared.poll_flush(cx)) => flush,
            _ = scope.cancelled() => PipeFlush {
                is_canceled: true,
                is_completed: false,
            },
        }
    }

    /// Mark the write side permanently done. Staged bytes are published so
    /// the reader drains them before observing completion. Idempotent.
    pub fn complete(&self) {
        let mut st = self.shared.state.lock().unwrap();
        st.publish_staged();
        st.writer_done = true;
        st.wake_reader();
        st.wake_writer();
    }

    /// Whether the opposite read side has completed.
    pub fn is_completed(&self) -> bool {
        self.shared.state.lock().unwrap().reader_done
    }

    pub(crate) fn poll_stream_write(
        &self,
        cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.shared.poll_stream_write(cx, data)
    }
}

/// Create one pipe direction with the given backpressure capacity.
pub fn pipe(capacity: usize) -> (PipeWriter, PipeReader) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            readable: BytesMut::new(),
            staged: BytesMut::new(),
            capacity,
            writer_done: false,
            reader_done: false,
            cancel_requested: false,
            read_waker: None,
            write_waker: None,
        }),
    });
    (
        PipeWriter {
            shared: Arc::clone(&shared),
        },
        PipeReader { shared },
    )
}

/// One end of a duplex pipe: an input to read from and an output to write to.
#[derive(Debug, Clone)]
pub struct DuplexPipe {
    /// Bytes arriving at this end.
    pub input: PipeReader,
    /// Bytes leaving this end.
    pub output: PipeWriter,
}

impl DuplexPipe {
    /// Mark both the input and output of this end complete. Idempotent.
    pub fn complete(&self) {
        self.input.complete();
        self.output.complete();
    }
}

/// Create a linked pair of duplex pipe ends.
pub fn duplex(capacity: usize) -> (DuplexPipe, DuplexPipe) {
    let (a_writer, b_reader) = pipe(capacity);
    let (b_writer, a_reader) = pipe(capacity);
    (
        DuplexPipe {
            input: a_reader,
            output: a_writer,
        },
        DuplexPipe {
            input: b_reader,
            output: b_writer,
        },
    )
}
